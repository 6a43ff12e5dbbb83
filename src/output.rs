//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Upload
//!
//! ```text
//! Stored image: jpg 10x10, 631 bytes
//!     Path: wwwroot/u/d/1700000000_3f2a9c01b4de.jpg
//!     Web:  /u/d/1700000000_3f2a9c01b4de.jpg
//! ```
//!
//! ## Sniff
//!
//! ```text
//! photo.jpg: image (jpeg)
//!     Header: FF D8 FF E0 00 10
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::signature::{self, Signature};
use crate::storage::{ArtifactKind, StoredArtifact};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Space-separated uppercase hex.
fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn byte_count(len: usize) -> String {
    match len {
        1 => "1 byte".to_string(),
        n => format!("{n} bytes"),
    }
}

// ============================================================================
// upload
// ============================================================================

pub fn format_upload_output(artifact: &StoredArtifact) -> Vec<String> {
    let header = match artifact.kind {
        ArtifactKind::Image {
            codec,
            width,
            height,
        } => format!(
            "Stored image: {codec} {width}x{height}, {}",
            byte_count(artifact.len)
        ),
        ArtifactKind::Verbatim => format!("Stored verbatim: {}", byte_count(artifact.len)),
    };
    vec![
        header,
        format!("{}Path: {}", indent(1), artifact.path.display()),
        format!("{}Web:  {}", indent(1), artifact.web_path),
    ]
}

pub fn print_upload_output(artifact: &StoredArtifact) {
    for line in format_upload_output(artifact) {
        println!("{}", line);
    }
}

// ============================================================================
// sniff
// ============================================================================

/// Describe what the signature table makes of a file's header.
pub fn format_sniff_output(path: &Path, header: &[u8]) -> Vec<String> {
    let name = path.display();
    let head = &header[..header.len().min(signature::header_len())];
    let first = match signature::identify(header) {
        Some(Signature { kind, label, .. }) => {
            format!("{name}: {kind} ({label})")
        }
        None => format!("{name}: unknown"),
    };
    let mut lines = vec![first];
    if head.is_empty() {
        lines.push(format!("{}Header: (empty)", indent(1)));
    } else {
        lines.push(format!("{}Header: {}", indent(1), hex_bytes(head)));
    }
    lines
}

pub fn print_sniff_output(path: &Path, header: &[u8]) {
    for line in format_sniff_output(path, header) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Codec;
    use std::path::PathBuf;

    fn artifact(kind: ArtifactKind, len: usize) -> StoredArtifact {
        StoredArtifact {
            path: PathBuf::from("wwwroot/u/d/1_abc.jpg"),
            web_path: "/u/d/1_abc.jpg".to_string(),
            kind,
            len,
        }
    }

    #[test]
    fn hex_bytes_formats_uppercase_pairs() {
        assert_eq!(hex_bytes(&[0xff, 0xd8, 0x0a]), "FF D8 0A");
        assert_eq!(hex_bytes(&[]), "");
    }

    #[test]
    fn byte_count_singular() {
        assert_eq!(byte_count(1), "1 byte");
        assert_eq!(byte_count(0), "0 bytes");
    }

    #[test]
    fn upload_output_for_image() {
        let lines = format_upload_output(&artifact(
            ArtifactKind::Image {
                codec: Codec::Jpeg,
                width: 10,
                height: 10,
            },
            631,
        ));
        assert_eq!(
            lines,
            vec![
                "Stored image: jpg 10x10, 631 bytes",
                "    Path: wwwroot/u/d/1_abc.jpg",
                "    Web:  /u/d/1_abc.jpg",
            ]
        );
    }

    #[test]
    fn upload_output_for_verbatim() {
        let lines = format_upload_output(&artifact(ArtifactKind::Verbatim, 15));
        assert_eq!(lines[0], "Stored verbatim: 15 bytes");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn sniff_output_for_png() {
        let lines = format_sniff_output(
            Path::new("a.png"),
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        );
        assert_eq!(lines[0], "a.png: image (png)");
        assert_eq!(lines[1], "    Header: 89 50 4E 47 0D 0A");
    }

    #[test]
    fn sniff_output_for_unknown() {
        let lines = format_sniff_output(Path::new("notes.txt"), b"hello");
        assert_eq!(lines[0], "notes.txt: unknown");
        assert_eq!(lines[1], "    Header: 68 65 6C 6C 6F");
    }

    #[test]
    fn sniff_output_for_empty_file() {
        let lines = format_sniff_output(Path::new("empty"), &[]);
        assert_eq!(lines[0], "empty: unknown");
        assert_eq!(lines[1], "    Header: (empty)");
    }
}
