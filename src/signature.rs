//! Content sniffing from magic-byte prefixes.
//!
//! Uploads arrive with a filename and whatever the client claims, neither of
//! which is trusted. This module looks at the first few bytes instead and
//! matches them against a fixed table of known prefixes.
//!
//! ## Signature table
//!
//! | Label | Prefix |
//! |---|---|
//! | `jpeg` | `FF D8 FF` |
//! | `png` | `89 50 4E 47` |
//! | `gif87a` | `GIF87a` |
//! | `gif89a` | `GIF89a` |
//! | `bmp` | `BM` |
//! | `tiff-le` | `49 49 2A 00` |
//! | `tiff-be` | `4D 4D 00 2A` |
//! | `webp` | `RIFF` |
//!
//! Matching is an exact `starts_with` on each prefix in table order; the first
//! hit wins. A buffer shorter than a prefix simply cannot match it. The WebP
//! entry only checks the RIFF container magic, so other RIFF payloads (WAV,
//! AVI) classify as images and then fail at decode.

use serde::Serialize;
use std::io::Read;

/// What a matched signature says the content is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Image => f.write_str("image"),
        }
    }
}

/// One entry of the signature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub prefix: &'static [u8],
    pub kind: ContentKind,
    /// Short format name for logs and CLI output.
    pub label: &'static str,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        prefix: &[0xFF, 0xD8, 0xFF],
        kind: ContentKind::Image,
        label: "jpeg",
    },
    Signature {
        prefix: &[0x89, 0x50, 0x4E, 0x47],
        kind: ContentKind::Image,
        label: "png",
    },
    Signature {
        prefix: b"GIF87a",
        kind: ContentKind::Image,
        label: "gif87a",
    },
    Signature {
        prefix: b"GIF89a",
        kind: ContentKind::Image,
        label: "gif89a",
    },
    Signature {
        prefix: b"BM",
        kind: ContentKind::Image,
        label: "bmp",
    },
    Signature {
        prefix: &[0x49, 0x49, 0x2A, 0x00],
        kind: ContentKind::Image,
        label: "tiff-le",
    },
    Signature {
        prefix: &[0x4D, 0x4D, 0x00, 0x2A],
        kind: ContentKind::Image,
        label: "tiff-be",
    },
    Signature {
        prefix: b"RIFF",
        kind: ContentKind::Image,
        label: "webp",
    },
];

/// The full signature table, in match order.
pub fn signatures() -> &'static [Signature] {
    SIGNATURES
}

/// Number of header bytes needed to test every signature.
pub fn header_len() -> usize {
    SIGNATURES.iter().map(|s| s.prefix.len()).max().unwrap_or(0)
}

/// Find the first signature whose prefix starts `bytes`.
pub fn identify(bytes: &[u8]) -> Option<&'static Signature> {
    let header = &bytes[..bytes.len().min(header_len())];
    SIGNATURES.iter().find(|s| header.starts_with(s.prefix))
}

/// Classify a buffer by its leading bytes. `None` means unknown content.
pub fn classify(bytes: &[u8]) -> Option<ContentKind> {
    identify(bytes).map(|s| s.kind)
}

/// Read at most [`header_len`] leading bytes from a stream.
///
/// A read error yields an empty header, which classifies as unknown content,
/// so the caller falls back to generic file handling.
pub fn read_header<R: Read>(reader: R) -> Vec<u8> {
    let mut header = Vec::with_capacity(header_len());
    match reader.take(header_len() as u64).read_to_end(&mut header) {
        Ok(_) => header,
        Err(e) => {
            tracing::warn!(error = %e, "signature read failed, treating content as unknown");
            Vec::new()
        }
    }
}

/// Classify content from a stream. Read errors mean unknown content.
pub fn classify_reader<R: Read>(reader: R) -> Option<ContentKind> {
    classify(&read_header(reader))
}
