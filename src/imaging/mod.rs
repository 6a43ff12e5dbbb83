//! Image processing: options, color math, resampling and the codec pipeline.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` → RGBA8 |
//! | **Resize** | `image::imageops::resize` in linear light (`Rgba32F`) |
//! | **Smooth** | `image::imageops::blur`, sigma = smooth radius |
//! | **Per-pixel steps** | [`color`] functions, row-parallel via `rayon` |
//! | **Encode → JPEG** | `mozjpeg` (quality + chroma subsampling) |
//! | **Encode → others** | `image::codecs::*` |
//!
//! The module is split into:
//! - **Options**: [`TransformOptions`] and its validated value types
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Color**: sRGB transfer functions, premultiplication, posterization
//! - **Resample**: fit modes and linear-light resizing
//! - **Backend**: [`CodecBackend`] trait + [`RustBackend`]
//! - **Pipeline**: [`ImagePipeline`], the step sequence over one upload

pub mod backend;
pub mod calculations;
pub mod color;
pub mod options;
pub mod pipeline;
pub mod resample;
pub mod rust_backend;

pub use backend::{BackendError, CodecBackend, EncodeConfig, PixelBuffer};
pub use options::{
    AdvancedOptions, BrightnessFactor, ChromaSubsampling, Codec, CompressOptions, Dimension,
    FitMode, OptionsError, Quality, QuantizationLevel, Resampler, ResizeOptions, SmoothRadius,
    TargetCodec, TransformOptions,
};
pub use pipeline::{CancelToken, ImagePipeline, PipelineError, PipelineStep, ProcessedImage};
pub use rust_backend::RustBackend;
