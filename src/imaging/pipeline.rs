//! Decode → transform → encode orchestration.
//!
//! [`ImagePipeline`] runs a fixed sequence of steps over one upload. Which
//! steps run is decided by [`TransformOptions`]; the order never changes:
//!
//! | # | Step | Runs when |
//! |---|---|---|
//! | 1 | Decode | always |
//! | 2 | Resize (+ premultiply, brightness) | `resize.enabled` |
//! | 3 | Smooth | `smooth_radius > 0` |
//! | 4 | Quantize | `quantization_level > 0` |
//! | 5 | Intermediate JPEG encode | `reencode_baseline` |
//! | 6 | Select final encoder | always |
//! | 7 | Final encode (re-decoding step 5 output) | always |
//! | 8 | Write through the [`ByteSink`] | [`run`](ImagePipeline::run) and [`ProcessedImage::store`] |
//!
//! Every transform finishes before the next one starts. The encoded bytes
//! stay in memory until step 8, so a failure anywhere leaves nothing on disk.
//!
//! A [`CancelToken`] is checked before each step. A cancelled run reports the
//! step it would have run next.

use super::backend::{BackendError, CodecBackend, EncodeConfig, PixelBuffer};
use super::color::{blur_sigma, for_each_pixel, posterize_channel};
use super::options::{Codec, TransformOptions};
use super::resample::apply_resize;
use crate::storage::{ArtifactKind, ByteSink, StoredArtifact};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Decode,
    Resize,
    Smooth,
    Quantize,
    IntermediateEncode,
    SelectEncoder,
    FinalEncode,
    Write,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::Decode => "decode",
            PipelineStep::Resize => "resize",
            PipelineStep::Smooth => "smooth",
            PipelineStep::Quantize => "quantize",
            PipelineStep::IntermediateEncode => "intermediate encode",
            PipelineStep::SelectEncoder => "select encoder",
            PipelineStep::FinalEncode => "final encode",
            PipelineStep::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[source] BackendError),
    #[error("Pipeline step '{step}' failed: {source}")]
    Step {
        step: PipelineStep,
        #[source]
        source: BackendError,
    },
    #[error("Pipeline cancelled before step '{0}'")]
    Cancelled(PipelineStep),
}

impl PipelineError {
    /// The step the error is attributed to.
    pub fn step(&self) -> PipelineStep {
        match self {
            PipelineError::Decode(_) => PipelineStep::Decode,
            PipelineError::Step { step, .. } | PipelineError::Cancelled(step) => *step,
        }
    }

    /// True when the write step found its destination already taken.
    pub fn is_destination_taken(&self) -> bool {
        matches!(
            self,
            PipelineError::Step {
                step: PipelineStep::Write,
                source: BackendError::Io(e),
            } if e.kind() == std::io::ErrorKind::AlreadyExists
        )
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Encoded output of [`ImagePipeline::transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub codec: Codec,
    pub width: u32,
    pub height: u32,
}

impl ProcessedImage {
    /// Step 8: hand the encoded bytes to `sink` under `destination`.
    pub fn store(
        &self,
        destination: &Path,
        sink: &impl ByteSink,
        cancel: &CancelToken,
    ) -> Result<StoredArtifact, PipelineError> {
        checkpoint(cancel, PipelineStep::Write)?;
        sink.put(destination, &self.bytes)
            .map_err(|e| step_failed(PipelineStep::Write)(BackendError::Io(e)))?;
        tracing::debug!(path = %destination.display(), len = self.bytes.len(), "pipeline wrote output");

        Ok(StoredArtifact {
            path: destination.to_path_buf(),
            web_path: sink.web_path(destination),
            kind: ArtifactKind::Image {
                codec: self.codec,
                width: self.width,
                height: self.height,
            },
            len: self.bytes.len(),
        })
    }
}

pub struct ImagePipeline<B: CodecBackend> {
    backend: B,
}

impl<B: CodecBackend> ImagePipeline<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run every step and write the result to `destination`.
    pub fn run(
        &self,
        raw: &[u8],
        options: &TransformOptions,
        destination: &Path,
        sink: &impl ByteSink,
        cancel: &CancelToken,
    ) -> Result<StoredArtifact, PipelineError> {
        let image = self.transform(raw, options, destination, cancel)?;
        image.store(destination, sink, cancel)
    }

    /// Steps 1 to 7: everything except the write.
    ///
    /// `destination` is only consulted for its extension when the target
    /// codec is `Original`.
    pub fn transform(
        &self,
        raw: &[u8],
        options: &TransformOptions,
        destination: &Path,
        cancel: &CancelToken,
    ) -> Result<ProcessedImage, PipelineError> {
        let advanced = &options.advanced;
        let quality = options.compress.quality;

        checkpoint(cancel, PipelineStep::Decode)?;
        let mut pixels = self.backend.decode(raw).map_err(PipelineError::Decode)?;
        tracing::debug!(width = pixels.width(), height = pixels.height(), "decoded");

        if options.resize.enabled {
            checkpoint(cancel, PipelineStep::Resize)?;
            pixels = apply_resize(&pixels, &options.resize);
            tracing::debug!(width = pixels.width(), height = pixels.height(), "resized");
        }

        if advanced.smooth_radius.is_enabled() {
            checkpoint(cancel, PipelineStep::Smooth)?;
            let sigma = blur_sigma(advanced.smooth_radius);
            pixels = image::imageops::blur(&pixels, sigma);
            tracing::debug!(sigma, "smoothed");
        }

        if advanced.quantization_level.is_enabled() {
            checkpoint(cancel, PipelineStep::Quantize)?;
            let levels = advanced.quantization_level.levels();
            for_each_pixel(&mut pixels, |px| {
                for c in &mut px.0[..3] {
                    *c = posterize_channel(*c, levels);
                }
            });
            tracing::debug!(levels, "quantized");
        }

        let intermediate = if advanced.reencode_baseline {
            checkpoint(cancel, PipelineStep::IntermediateEncode)?;
            let config = EncodeConfig {
                codec: Codec::Jpeg,
                quality,
                chroma: advanced.chroma_subsampling,
            };
            let jpeg = self
                .backend
                .encode(&pixels, &config)
                .map_err(step_failed(PipelineStep::IntermediateEncode))?;
            tracing::debug!(len = jpeg.len(), "intermediate jpeg encoded");
            Some(jpeg)
        } else {
            None
        };

        checkpoint(cancel, PipelineStep::SelectEncoder)?;
        let codec = select_codec(options, destination)?;
        tracing::debug!(%codec, "encoder selected");

        checkpoint(cancel, PipelineStep::FinalEncode)?;
        let final_pixels: PixelBuffer = match intermediate {
            Some(jpeg) => self
                .backend
                .decode(&jpeg)
                .map_err(step_failed(PipelineStep::FinalEncode))?,
            None => pixels,
        };
        let config = EncodeConfig {
            codec,
            quality,
            chroma: advanced.chroma_subsampling,
        };
        let bytes = self
            .backend
            .encode(&final_pixels, &config)
            .map_err(step_failed(PipelineStep::FinalEncode))?;
        tracing::debug!(%codec, len = bytes.len(), "final encode done");

        Ok(ProcessedImage {
            bytes,
            codec,
            width: final_pixels.width(),
            height: final_pixels.height(),
        })
    }
}

/// Explicit codec, or the one the destination extension implies.
pub fn select_codec(options: &TransformOptions, destination: &Path) -> Result<Codec, PipelineError> {
    if let Some(codec) = options.compress.codec.explicit() {
        return Ok(codec);
    }
    let ext = destination
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    Codec::from_extension(ext).ok_or_else(|| PipelineError::Step {
        step: PipelineStep::SelectEncoder,
        source: BackendError::UnsupportedFormat(format!("no encoder for extension '{ext}'")),
    })
}

fn checkpoint(cancel: &CancelToken, next: PipelineStep) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        tracing::debug!(step = %next, "pipeline cancelled");
        return Err(PipelineError::Cancelled(next));
    }
    Ok(())
}

fn step_failed(step: PipelineStep) -> impl FnOnce(BackendError) -> PipelineError {
    move |source| PipelineError::Step { step, source }
}
