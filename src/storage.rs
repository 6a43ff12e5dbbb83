//! Where stored bytes go and how they are addressed afterwards.
//!
//! [`ByteSink`] is the outbound seam: the pipeline and the uploader hand it
//! finished bytes and a destination path, and it reports the public web path
//! for that destination. [`FsStorage`] is the filesystem implementation.
//! It writes through a temp file in the destination directory and renames
//! into place, so a reader never observes a half-written file. An existing
//! destination is never replaced; the write fails with
//! [`io::ErrorKind::AlreadyExists`] and the caller picks another name.

use crate::imaging::Codec;
use crate::naming::to_web_path;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Destination for finished uploads.
pub trait ByteSink: Sync {
    /// Write `bytes` to `path`, creating parent directories as needed.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] if `path` is taken.
    fn put(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Externally reachable address of a stored path.
    fn web_path(&self, path: &Path) -> String;
}

/// Directory layout for stored uploads.
///
/// Files live in `root/upload_dir`; web paths are relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub root: PathBuf,
    pub upload_dir: PathBuf,
    pub public_host: String,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>, upload_dir: impl Into<PathBuf>, public_host: &str) -> Self {
        Self {
            root: root.into(),
            upload_dir: upload_dir.into(),
            public_host: public_host.to_string(),
        }
    }

    /// Directory new uploads are written to.
    pub fn upload_root(&self) -> PathBuf {
        self.root.join(&self.upload_dir)
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.upload_root().join(file_name)
    }

    pub fn web_path(&self, path: &Path) -> String {
        to_web_path(&self.root, &self.public_host, path)
    }
}

/// Filesystem byte sink with atomic, no-clobber writes.
#[derive(Debug, Clone)]
pub struct FsStorage {
    layout: StorageLayout,
}

impl FsStorage {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}

impl ByteSink for FsStorage {
    fn put(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn web_path(&self, path: &Path) -> String {
        self.layout.web_path(path)
    }
}

/// What an upload was stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArtifactKind {
    Image { codec: Codec, width: u32, height: u32 },
    Verbatim,
}

/// A persisted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArtifact {
    pub path: PathBuf,
    pub web_path: String,
    pub kind: ArtifactKind,
    pub len: usize,
}
