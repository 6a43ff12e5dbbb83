//! Codec backend trait and shared types.
//!
//! The [`CodecBackend`] trait is the seam between the pipeline and whatever
//! actually parses and writes image bitstreams. It has two operations,
//! `decode` and `encode`, so the orchestrator's step logic can be tested with
//! a recording mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate with `mozjpeg` for chroma-controlled JPEG.

use super::options::{ChromaSubsampling, Codec, Quality};
use thiserror::Error;

/// Decoded image: row-major RGBA, 8 bits per channel.
pub type PixelBuffer = image::RgbaImage;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Settings handed to the encoder alongside the pixels.
///
/// `quality` and `chroma` only matter to lossy codecs; the others ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeConfig {
    pub codec: Codec,
    pub quality: Quality,
    pub chroma: ChromaSubsampling,
}

impl EncodeConfig {
    /// Config for a codec with default quality and chroma settings.
    pub fn plain(codec: Codec) -> Self {
        Self {
            codec,
            quality: Quality::default(),
            chroma: ChromaSubsampling::default(),
        }
    }
}

/// Trait for codec backends.
///
/// Implementations must be `Sync`: one backend value serves every concurrent
/// upload.
pub trait CodecBackend: Sync {
    /// Decode any supported bitstream into RGBA pixels.
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, BackendError>;

    /// Encode pixels with the given codec settings.
    fn encode(&self, pixels: &PixelBuffer, config: &EncodeConfig) -> Result<Vec<u8>, BackendError>;
}
