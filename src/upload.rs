//! The inbound upload operation.
//!
//! ```text
//! bytes + file name
//!   │
//!   ├─ extension not whitelisted ──────────────► InvalidExtension
//!   │
//!   ├─ signature says image ─► ImagePipeline ──► StoredArtifact { Image }
//!   │                           (decode errors are final, no fallback)
//!   │
//!   └─ anything else ─► verbatim copy ─────────► StoredArtifact { Verbatim }
//! ```
//!
//! The destination name is chosen per [`NamingMode`]. For images with an
//! explicit target codec the stored extension follows the codec; with
//! `Original` the upload's own extension is kept and picks the encoder.

use crate::config::{IngestConfig, NamingMode};
use crate::imaging::{
    CancelToken, CodecBackend, ImagePipeline, PipelineError, RustBackend, TransformOptions,
};
use crate::naming::{new_file_name, normalized_extension, unique_file_name};
use crate::signature::{self, ContentKind};
use crate::storage::{ArtifactKind, ByteSink, FsStorage, StorageLayout, StoredArtifact};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Extension '{extension}' is not permitted (allowed: {allowed})")]
    InvalidExtension { extension: String, allowed: String },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl UploadError {
    fn is_destination_taken(&self) -> bool {
        match self {
            UploadError::Storage(e) => e.kind() == std::io::ErrorKind::AlreadyExists,
            UploadError::Pipeline(e) => e.is_destination_taken(),
            UploadError::InvalidExtension { .. } => false,
        }
    }
}

/// Names tried per upload before a taken destination is reported as an error.
const MAX_NAME_ATTEMPTS: usize = 64;

/// Accepts uploads and stores them, one independent run per call.
///
/// `Uploader` is `Sync`; one value can serve concurrent uploads.
pub struct Uploader<B: CodecBackend = RustBackend, S: ByteSink = FsStorage> {
    pipeline: ImagePipeline<B>,
    sink: S,
    layout: StorageLayout,
    config: IngestConfig,
}

impl Uploader {
    /// Production uploader: pure Rust codecs, filesystem storage.
    pub fn new(config: IngestConfig) -> Self {
        let layout = config.layout();
        Self::with_parts(RustBackend::new(), FsStorage::new(layout), config)
    }
}

impl<B: CodecBackend, S: ByteSink> Uploader<B, S> {
    pub fn with_parts(backend: B, sink: S, config: IngestConfig) -> Self {
        Self {
            pipeline: ImagePipeline::new(backend),
            sink,
            layout: config.layout(),
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &ImagePipeline<B> {
        &self.pipeline
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Upload with the configured transform options and no cancellation.
    pub fn upload(&self, bytes: &[u8], file_name: &str) -> Result<StoredArtifact, UploadError> {
        self.upload_with(bytes, file_name, &self.config.transform, &CancelToken::new())
    }

    pub fn upload_with(
        &self,
        bytes: &[u8],
        file_name: &str,
        options: &TransformOptions,
        cancel: &CancelToken,
    ) -> Result<StoredArtifact, UploadError> {
        let extension = normalized_extension(file_name);
        if !self.config.uploads.permits(&extension) {
            tracing::info!(file_name, %extension, "upload rejected: extension not permitted");
            return Err(UploadError::InvalidExtension {
                extension,
                allowed: self.config.uploads.permitted_extensions.join(", "),
            });
        }

        match signature::classify(bytes) {
            Some(ContentKind::Image) => {
                let stored_ext = match options.compress.codec.explicit() {
                    Some(codec) => format!(".{}", codec.extension()),
                    None => extension,
                };
                let destination = self.destination(file_name, &stored_ext);
                let format = signature::identify(bytes).map_or("unknown", |s| s.label);
                tracing::info!(
                    file_name,
                    format,
                    len = bytes.len(),
                    destination = %destination.display(),
                    "processing image upload"
                );
                let image = self.pipeline.transform(bytes, options, &destination, cancel)?;
                let artifact = self.store_unclaimed(file_name, &stored_ext, destination, |dest| {
                    Ok(image.store(dest, &self.sink, cancel)?)
                })?;
                tracing::info!(web_path = %artifact.web_path, len = artifact.len, "image stored");
                Ok(artifact)
            }
            None => {
                let destination = self.destination(file_name, &extension);
                tracing::info!(
                    file_name,
                    len = bytes.len(),
                    destination = %destination.display(),
                    "storing upload verbatim"
                );
                self.store_unclaimed(file_name, &extension, destination, |dest| {
                    self.sink.put(dest, bytes)?;
                    Ok(StoredArtifact {
                        web_path: self.sink.web_path(dest),
                        path: dest.to_path_buf(),
                        kind: ArtifactKind::Verbatim,
                        len: bytes.len(),
                    })
                })
            }
        }
    }

    /// Run `put` against `destination`, choosing a fresh name each time a
    /// concurrent upload has claimed the current one first.
    fn store_unclaimed(
        &self,
        file_name: &str,
        extension: &str,
        mut destination: PathBuf,
        mut put: impl FnMut(&Path) -> Result<StoredArtifact, UploadError>,
    ) -> Result<StoredArtifact, UploadError> {
        let mut attempt = 1;
        loop {
            match put(&destination) {
                Err(e) if e.is_destination_taken() && attempt < MAX_NAME_ATTEMPTS => {
                    tracing::debug!(
                        destination = %destination.display(),
                        attempt,
                        "destination taken, choosing another name"
                    );
                    attempt += 1;
                    destination = self.destination(file_name, extension);
                }
                result => return result,
            }
        }
    }

    fn destination(&self, file_name: &str, extension: &str) -> PathBuf {
        let name = match self.config.storage.naming {
            NamingMode::Random => new_file_name(extension),
            NamingMode::Preserve => {
                let stem = Path::new(file_name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("upload");
                unique_file_name(&self.layout.upload_root(), &format!("{stem}{extension}"))
            }
        };
        self.layout.path_for(&name)
    }
}
