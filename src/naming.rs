//! Stored file names and web paths.
//!
//! Two naming modes exist for uploads:
//!
//! - **Random** (default): [`new_file_name`] builds
//!   `{unix_seconds}_{token}.{ext}`, where `token` is 12 lowercase hex
//!   characters from a v4 UUID. Names sort by upload time and two uploads in
//!   the same second still differ.
//! - **Preserve**: [`unique_file_name`] keeps the client's file name, replaces
//!   characters that are not allowed in file names with `-`, and appends
//!   ` (1)`, ` (2)`, … until the name is free in the target directory.
//!
//! [`to_web_path`] turns a stored path back into the externally reachable
//! address by stripping the storage root and prefixing the public host:
//! - `wwwroot/u/d/1700000000_3f2a9c01b4de.jpg` → `https://cdn.example/u/d/1700000000_3f2a9c01b4de.jpg`

use std::path::{Component, Path};

const TOKEN_LEN: usize = 12;

/// Characters replaced by `-` in preserved names.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Extension of a client file name, lowercased, with the leading dot.
///
/// Returns an empty string when there is none.
pub fn normalized_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Random lowercase hex token.
pub fn random_token() -> String {
    let mut token = uuid::Uuid::new_v4().simple().to_string();
    token.truncate(TOKEN_LEN);
    token
}

/// Fresh time-ordered name, `{unix_seconds}_{token}.{ext}`.
///
/// `extension` may be given with or without the dot. An empty extension
/// yields a name with no suffix.
pub fn new_file_name(extension: &str) -> String {
    let seconds = chrono::Utc::now().timestamp();
    let token = random_token();
    match extension.trim_start_matches('.') {
        "" => format!("{seconds}_{token}"),
        ext => format!("{seconds}_{token}.{ext}"),
    }
}

pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_CHARS.contains(&c) {
                '-'
            } else {
                c
            }
        })
        .collect()
}

/// Sanitized `file_name`, with a ` (n)` counter if it already exists in `dir`.
pub fn unique_file_name(dir: &Path, file_name: &str) -> String {
    let valid = sanitize_file_name(file_name);
    if !dir.join(&valid).exists() {
        return valid;
    }

    let (stem, ext) = match valid.rfind('.') {
        Some(dot) if dot > 0 => valid.split_at(dot),
        _ => (valid.as_str(), ""),
    };
    (1u32..)
        .map(|n| format!("{stem} ({n}){ext}"))
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or_else(|| valid.clone())
}

/// Public address of a stored file.
///
/// `full_path` outside `root` is used as is. Separators are always `/`.
pub fn to_web_path(root: &Path, public_host: &str, full_path: &Path) -> String {
    let relative = full_path.strip_prefix(root).unwrap_or(full_path);
    let mut web = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            web.push('/');
            web.push_str(&part.to_string_lossy().replace('\\', "/"));
        }
    }
    format!("{}{web}", public_host.trim_end_matches('/'))
}
