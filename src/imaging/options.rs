//! Transform options for the image pipeline.
//!
//! These structs describe *what* to do to an uploaded image, not *how*. The
//! [`pipeline`](super::pipeline) reads a [`TransformOptions`] once per run and
//! never mutates it.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 75). Clamped on construction.
//! - [`SmoothRadius`]: Gaussian smoothing radius (0–100). Out-of-range values are rejected.
//! - [`QuantizationLevel`]: Posterization levels per channel (0 = off, otherwise 2–255).
//! - [`ResizeOptions`]: Target size, resampler, fit mode and per-pixel post-processing.
//! - [`CompressOptions`]: Final codec and quality.
//! - [`AdvancedOptions`]: Chroma subsampling, smoothing, quantization, baseline re-encode.
//!
//! All of them deserialize from the `[transform]` section of the config file.
//! Range-checked fields go through `TryFrom`, so an invalid file fails to load
//! instead of producing an invalid value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("Invalid transform option: {0}")]
    Validation(String),
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Gaussian smoothing radius, guaranteed to lie in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SmoothRadius(u8);

impl SmoothRadius {
    pub const MAX: i64 = 100;

    pub fn new(value: i64) -> Result<Self, OptionsError> {
        if !(0..=Self::MAX).contains(&value) {
            return Err(OptionsError::Validation(format!(
                "smooth radius must be in [0, {}], got {value}",
                Self::MAX
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u32 {
        self.0 as u32
    }

    pub fn is_enabled(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<i64> for SmoothRadius {
    type Error = OptionsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SmoothRadius> for i64 {
    fn from(r: SmoothRadius) -> Self {
        r.0 as i64
    }
}

/// Requested resize edge in pixels, at most [`Dimension::MAX`].
/// 0 derives the edge from the other axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Dimension(u32);

impl Dimension {
    pub const MAX: u32 = 16_384;

    /// Derive this edge from the other one.
    pub const DERIVED: Dimension = Dimension(0);

    pub fn new(value: i64) -> Result<Self, OptionsError> {
        if !(0..=i64::from(Self::MAX)).contains(&value) {
            return Err(OptionsError::Validation(format!(
                "resize dimension must be in [0, {}], got {value}",
                Self::MAX
            )));
        }
        Ok(Self(value as u32))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Dimension {
    type Error = OptionsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Dimension> for i64 {
    fn from(d: Dimension) -> Self {
        i64::from(d.0)
    }
}

/// Number of levels each color channel is snapped to. 0 disables quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct QuantizationLevel(u8);

impl QuantizationLevel {
    pub fn new(value: i64) -> Result<Self, OptionsError> {
        match value {
            0 | 2..=255 => Ok(Self(value as u8)),
            _ => Err(OptionsError::Validation(format!(
                "quantization level must be 0 (off) or in [2, 255], got {value}"
            ))),
        }
    }

    pub fn levels(self) -> u8 {
        self.0
    }

    pub fn is_enabled(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<i64> for QuantizationLevel {
    type Error = OptionsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuantizationLevel> for i64 {
    fn from(q: QuantizationLevel) -> Self {
        q.0 as i64
    }
}

/// Brightness multiplier applied in linear light, finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BrightnessFactor(f32);

impl BrightnessFactor {
    pub fn new(value: f64) -> Result<Self, OptionsError> {
        if !value.is_finite() || value < 0.0 {
            return Err(OptionsError::Validation(format!(
                "brightness factor must be a finite value >= 0, got {value}"
            )));
        }
        Ok(Self(value as f32))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 1.0
    }
}

impl Default for BrightnessFactor {
    fn default() -> Self {
        Self(1.0)
    }
}

impl TryFrom<f64> for BrightnessFactor {
    type Error = OptionsError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BrightnessFactor> for f64 {
    fn from(b: BrightnessFactor) -> Self {
        b.0 as f64
    }
}

/// Resampling filter used when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resampler {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

/// How a requested output size is reconciled with the source aspect ratio.
///
/// - `Manual`: resize to exactly the computed size.
/// - `Stretch`: resize to exactly the computed size, distorting if needed.
/// - `Contain`: largest size that fits inside the target, aspect preserved.
/// - `Cover`: fill the target and center-crop the overflow.
/// - `Pad`: `Contain`, then center on a transparent canvas of the target size.
///
/// With `maintain_aspect_ratio`, `Manual` and `Stretch` behave like `Contain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    #[default]
    Manual,
    Stretch,
    Contain,
    Cover,
    Pad,
}

impl FitMode {
    /// The mode actually applied once `maintain_aspect_ratio` is taken into account.
    pub fn effective(self, maintain_aspect_ratio: bool) -> Self {
        match self {
            FitMode::Manual | FitMode::Stretch if maintain_aspect_ratio => FitMode::Contain,
            other => other,
        }
    }
}

/// Concrete output codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Bmp,
    Gif,
    Jpeg,
    Pbm,
    Png,
    Qoi,
    Tga,
    Tiff,
    #[serde(rename = "webp")]
    WebP,
}

impl Codec {
    pub const ALL: [Codec; 9] = [
        Codec::Bmp,
        Codec::Gif,
        Codec::Jpeg,
        Codec::Pbm,
        Codec::Png,
        Codec::Qoi,
        Codec::Tga,
        Codec::Tiff,
        Codec::WebP,
    ];

    /// Pick the encoder for a file extension (with or without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "bmp" | "dib" => Some(Codec::Bmp),
            "gif" => Some(Codec::Gif),
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(Codec::Jpeg),
            "pbm" => Some(Codec::Pbm),
            "png" => Some(Codec::Png),
            "qoi" => Some(Codec::Qoi),
            "tga" | "vda" | "icb" | "vst" => Some(Codec::Tga),
            "tif" | "tiff" => Some(Codec::Tiff),
            "webp" => Some(Codec::WebP),
            _ => None,
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Bmp => "bmp",
            Codec::Gif => "gif",
            Codec::Jpeg => "jpg",
            Codec::Pbm => "pbm",
            Codec::Png => "png",
            Codec::Qoi => "qoi",
            Codec::Tga => "tga",
            Codec::Tiff => "tiff",
            Codec::WebP => "webp",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Requested output codec. `Original` keeps whatever the destination
/// extension implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetCodec {
    Original,
    Bmp,
    Gif,
    #[default]
    Jpeg,
    Pbm,
    Png,
    Qoi,
    Tga,
    Tiff,
    #[serde(rename = "webp")]
    WebP,
}

impl TargetCodec {
    /// The explicit codec, or `None` for [`TargetCodec::Original`].
    pub fn explicit(self) -> Option<Codec> {
        match self {
            TargetCodec::Original => None,
            TargetCodec::Bmp => Some(Codec::Bmp),
            TargetCodec::Gif => Some(Codec::Gif),
            TargetCodec::Jpeg => Some(Codec::Jpeg),
            TargetCodec::Pbm => Some(Codec::Pbm),
            TargetCodec::Png => Some(Codec::Png),
            TargetCodec::Qoi => Some(Codec::Qoi),
            TargetCodec::Tga => Some(Codec::Tga),
            TargetCodec::Tiff => Some(Codec::Tiff),
            TargetCodec::WebP => Some(Codec::WebP),
        }
    }
}

impl From<Codec> for TargetCodec {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::Bmp => TargetCodec::Bmp,
            Codec::Gif => TargetCodec::Gif,
            Codec::Jpeg => TargetCodec::Jpeg,
            Codec::Pbm => TargetCodec::Pbm,
            Codec::Png => TargetCodec::Png,
            Codec::Qoi => TargetCodec::Qoi,
            Codec::Tga => TargetCodec::Tga,
            Codec::Tiff => TargetCodec::Tiff,
            Codec::WebP => TargetCodec::WebP,
        }
    }
}

/// JPEG chroma subsampling ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChromaSubsampling {
    #[default]
    #[serde(rename = "4:2:0")]
    Ratio420,
    #[serde(rename = "4:4:4")]
    Ratio444,
    #[serde(rename = "4:2:2")]
    Ratio422,
    #[serde(rename = "4:1:1")]
    Ratio411,
    #[serde(rename = "4:1:0")]
    Ratio410,
}

impl ChromaSubsampling {
    /// Size in pixels `(horizontal, vertical)` covered by one chroma sample.
    pub fn pixel_size(self) -> (u8, u8) {
        match self {
            ChromaSubsampling::Ratio444 => (1, 1),
            ChromaSubsampling::Ratio422 => (2, 1),
            ChromaSubsampling::Ratio420 => (2, 2),
            ChromaSubsampling::Ratio411 => (4, 1),
            ChromaSubsampling::Ratio410 => (4, 2),
        }
    }
}

/// Resize settings. Ignored unless `enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeOptions {
    pub enabled: bool,
    /// Target width; 0 derives it from the height and the source aspect ratio.
    pub width: Dimension,
    /// Target height; 0 derives it from the width and the source aspect ratio.
    pub height: Dimension,
    pub resampler: Resampler,
    pub fit: FitMode,
    pub maintain_aspect_ratio: bool,
    /// Premultiply color by alpha after resampling.
    pub premultiply_alpha: bool,
    /// Resample in linear light, then apply `brightness_factor` there.
    pub linear_rgb: bool,
    pub brightness_factor: BrightnessFactor,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            width: Dimension::DERIVED,
            height: Dimension::DERIVED,
            resampler: Resampler::default(),
            fit: FitMode::default(),
            maintain_aspect_ratio: false,
            premultiply_alpha: true,
            linear_rgb: true,
            brightness_factor: BrightnessFactor::default(),
        }
    }
}

/// Final codec and lossy quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressOptions {
    pub codec: TargetCodec,
    pub quality: Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdvancedOptions {
    pub chroma_subsampling: ChromaSubsampling,
    pub smooth_radius: SmoothRadius,
    pub quantization_level: QuantizationLevel,
    /// Pass the pixels through an in-memory JPEG at `quality` and
    /// `chroma_subsampling` before the final encode.
    pub reencode_baseline: bool,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            chroma_subsampling: ChromaSubsampling::default(),
            smooth_radius: SmoothRadius::default(),
            quantization_level: QuantizationLevel::default(),
            reencode_baseline: true,
        }
    }
}

/// Everything the pipeline needs to know about one run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformOptions {
    pub resize: ResizeOptions,
    pub compress: CompressOptions,
    pub advanced: AdvancedOptions,
}

impl TransformOptions {
    /// Defaults with the given final codec.
    pub fn with_codec(codec: TargetCodec) -> Self {
        Self {
            compress: CompressOptions {
                codec,
                ..CompressOptions::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_75() {
        assert_eq!(Quality::default().value(), 75);
    }

    #[test]
    fn smooth_radius_bounds() {
        assert!(SmoothRadius::new(0).is_ok());
        assert!(SmoothRadius::new(100).is_ok());
        assert!(matches!(
            SmoothRadius::new(101),
            Err(OptionsError::Validation(_))
        ));
        assert!(matches!(
            SmoothRadius::new(-1),
            Err(OptionsError::Validation(_))
        ));
    }

    #[test]
    fn smooth_radius_zero_is_disabled() {
        assert!(!SmoothRadius::default().is_enabled());
        assert!(SmoothRadius::new(3).unwrap().is_enabled());
    }

    #[test]
    fn dimension_bounds() {
        assert_eq!(Dimension::new(0).unwrap(), Dimension::DERIVED);
        assert_eq!(Dimension::new(16_384).unwrap().value(), Dimension::MAX);
        assert!(matches!(
            Dimension::new(16_385),
            Err(OptionsError::Validation(_))
        ));
        assert!(Dimension::new(-1).is_err());
    }

    #[test]
    fn parse_rejects_huge_resize_width() {
        let toml = "[resize]\nenabled = true\nwidth = 4000000000\n";
        assert!(toml::from_str::<TransformOptions>(toml).is_err());
    }

    #[test]
    fn quantization_level_rejects_one() {
        assert!(QuantizationLevel::new(0).is_ok());
        assert!(QuantizationLevel::new(1).is_err());
        assert!(QuantizationLevel::new(2).is_ok());
        assert!(QuantizationLevel::new(255).is_ok());
        assert!(QuantizationLevel::new(256).is_err());
    }

    #[test]
    fn brightness_factor_rejects_negative_and_nan() {
        assert!(BrightnessFactor::new(-0.1).is_err());
        assert!(BrightnessFactor::new(f64::NAN).is_err());
        assert!(BrightnessFactor::new(f64::INFINITY).is_err());
        assert!(BrightnessFactor::new(1.1).is_ok());
        assert!(BrightnessFactor::default().is_identity());
    }

    #[test]
    fn default_options() {
        let o = TransformOptions::default();
        assert!(!o.resize.enabled);
        assert_eq!(o.resize.width, Dimension::DERIVED);
        assert_eq!(o.resize.height.value(), 0);
        assert_eq!(o.resize.resampler, Resampler::Lanczos3);
        assert_eq!(o.resize.fit, FitMode::Manual);
        assert!(o.resize.premultiply_alpha);
        assert!(o.resize.linear_rgb);
        assert_eq!(o.compress.codec, TargetCodec::Jpeg);
        assert_eq!(o.compress.quality.value(), 75);
        assert_eq!(o.advanced.chroma_subsampling, ChromaSubsampling::Ratio420);
        assert!(!o.advanced.smooth_radius.is_enabled());
        assert!(!o.advanced.quantization_level.is_enabled());
        assert!(o.advanced.reencode_baseline);
    }

    #[test]
    fn fit_mode_maintain_aspect_ratio() {
        assert_eq!(FitMode::Manual.effective(true), FitMode::Contain);
        assert_eq!(FitMode::Stretch.effective(true), FitMode::Contain);
        assert_eq!(FitMode::Cover.effective(true), FitMode::Cover);
        assert_eq!(FitMode::Stretch.effective(false), FitMode::Stretch);
    }

    #[test]
    fn codec_from_extension() {
        assert_eq!(Codec::from_extension(".JPG"), Some(Codec::Jpeg));
        assert_eq!(Codec::from_extension("jpeg"), Some(Codec::Jpeg));
        assert_eq!(Codec::from_extension("tif"), Some(Codec::Tiff));
        assert_eq!(Codec::from_extension(".webp"), Some(Codec::WebP));
        assert_eq!(Codec::from_extension(".txt"), None);
        assert_eq!(Codec::from_extension(""), None);
    }

    #[test]
    fn codec_extension_maps_back() {
        for codec in Codec::ALL {
            assert_eq!(Codec::from_extension(codec.extension()), Some(codec));
            assert_eq!(TargetCodec::from(codec).explicit(), Some(codec));
        }
        assert_eq!(TargetCodec::Original.explicit(), None);
    }

    #[test]
    fn chroma_pixel_sizes() {
        assert_eq!(ChromaSubsampling::Ratio420.pixel_size(), (2, 2));
        assert_eq!(ChromaSubsampling::Ratio444.pixel_size(), (1, 1));
        assert_eq!(ChromaSubsampling::Ratio410.pixel_size(), (4, 2));
    }

    #[test]
    fn parse_partial_options() {
        let toml = r#"
[compress]
codec = "png"

[advanced]
smooth_radius = 4
chroma_subsampling = "4:4:4"
"#;
        let o: TransformOptions = toml::from_str(toml).unwrap();
        assert_eq!(o.compress.codec, TargetCodec::Png);
        assert_eq!(o.compress.quality.value(), 75);
        assert_eq!(o.advanced.smooth_radius.value(), 4);
        assert_eq!(o.advanced.chroma_subsampling, ChromaSubsampling::Ratio444);
        assert!(!o.resize.enabled);
    }

    #[test]
    fn parse_rejects_out_of_range_smooth_radius() {
        let toml = "[advanced]\nsmooth_radius = 101\n";
        assert!(toml::from_str::<TransformOptions>(toml).is_err());
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let toml = "[resize]\nwidht = 100\n";
        assert!(toml::from_str::<TransformOptions>(toml).is_err());
    }

    #[test]
    fn parse_clamps_quality() {
        let toml = "[compress]\nquality = 250\n";
        let o: TransformOptions = toml::from_str(toml).unwrap();
        assert_eq!(o.compress.quality.value(), 100);
    }
}
