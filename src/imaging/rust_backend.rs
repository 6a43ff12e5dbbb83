//! Pure Rust codec backend, plus mozjpeg for JPEG when the feature is on.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (any sniffed format) | `image::load_from_memory` → RGBA8 |
//! | Encode → JPEG | `mozjpeg::Compress` (quality + chroma subsampling) |
//! | Encode → JPEG, no `mozjpeg` | `image::codecs::jpeg::JpegEncoder` (quality only) |
//! | Encode → BMP, PNG, QOI, TGA, TIFF | matching `image::codecs` encoder, RGBA8 |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (NeuQuant palette) |
//! | Encode → PBM | `image::codecs::pnm::PnmEncoder`, luma thresholded at mid-grey |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//!
//! JPEG and PBM cannot carry alpha; pixels are flattened by dropping the alpha
//! channel.

use super::backend::{BackendError, CodecBackend, EncodeConfig, PixelBuffer};
use super::options::{ChromaSubsampling, Codec, Quality};
use image::buffer::ConvertBuffer;
use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::codecs::qoi::QoiEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageResult, RgbImage};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_failed(codec: Codec) -> impl FnOnce(image::ImageError) -> BackendError {
    move |e| BackendError::Encode(format!("{codec} encode failed: {e}"))
}

/// Run an encoder against a fresh in-memory buffer.
fn encode_into<F>(write: F) -> ImageResult<Vec<u8>>
where
    F: FnOnce(Cursor<&mut Vec<u8>>) -> ImageResult<()>,
{
    let mut out = Vec::new();
    write(Cursor::new(&mut out))?;
    Ok(out)
}

/// PBM is 1-bit with maxval 1: anything darker than mid-grey becomes black
/// (sample 0), the rest white (sample 1).
fn encode_pbm(pixels: &PixelBuffer) -> ImageResult<Vec<u8>> {
    let mut luma: GrayImage = pixels.convert();
    for p in luma.pixels_mut() {
        p.0[0] = u8::from(p.0[0] >= 128);
    }
    encode_into(|out| {
        PnmEncoder::new(out)
            .with_subtype(PnmSubtype::Bitmap(SampleEncoding::Binary))
            .write_image(luma.as_raw(), luma.width(), luma.height(), ExtendedColorType::L8)
    })
}

#[cfg(feature = "mozjpeg")]
fn encode_jpeg(
    pixels: &PixelBuffer,
    quality: Quality,
    chroma: ChromaSubsampling,
) -> Result<Vec<u8>, BackendError> {
    let rgb: RgbImage = pixels.convert();
    let (width, height) = rgb.dimensions();
    let (sample_w, sample_h) = chroma.pixel_size();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality.value() as f32);
    comp.set_chroma_sampling_pixel_sizes((sample_w, sample_h), (sample_w, sample_h));

    let jpeg_failed = |e: std::io::Error| BackendError::Encode(format!("jpg encode failed: {e}"));
    let mut comp = comp.start_compress(Vec::new()).map_err(jpeg_failed)?;
    comp.write_scanlines(rgb.as_raw()).map_err(jpeg_failed)?;
    comp.finish().map_err(jpeg_failed)
}

#[cfg(not(feature = "mozjpeg"))]
fn encode_jpeg(
    pixels: &PixelBuffer,
    quality: Quality,
    chroma: ChromaSubsampling,
) -> Result<Vec<u8>, BackendError> {
    use image::codecs::jpeg::JpegEncoder;

    if chroma != ChromaSubsampling::default() {
        tracing::debug!(?chroma, "chroma subsampling needs the mozjpeg feature, ignoring");
    }
    let rgb: RgbImage = pixels.convert();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut out), quality.value() as u8)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(encode_failed(Codec::Jpeg))?;
    Ok(out)
}

impl CodecBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, BackendError> {
        image::load_from_memory(bytes)
            .map(|img| img.into_rgba8())
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn encode(&self, pixels: &PixelBuffer, config: &EncodeConfig) -> Result<Vec<u8>, BackendError> {
        let codec = config.codec;
        let (raw, w, h) = (pixels.as_raw(), pixels.width(), pixels.height());
        let rgba = ExtendedColorType::Rgba8;
        let encoded = match codec {
            Codec::Jpeg => return encode_jpeg(pixels, config.quality, config.chroma),
            Codec::Pbm => encode_pbm(pixels),
            Codec::Bmp => {
                encode_into(|mut out| BmpEncoder::new(&mut out).write_image(raw, w, h, rgba))
            }
            // The GIF encoder writes its trailer on drop, which happens
            // before `encode_into` hands the buffer back.
            Codec::Gif => encode_into(|out| GifEncoder::new(out).encode(raw, w, h, rgba)),
            Codec::Png => encode_into(|out| PngEncoder::new(out).write_image(raw, w, h, rgba)),
            Codec::Qoi => encode_into(|out| QoiEncoder::new(out).write_image(raw, w, h, rgba)),
            Codec::Tga => encode_into(|out| TgaEncoder::new(out).write_image(raw, w, h, rgba)),
            Codec::Tiff => encode_into(|out| TiffEncoder::new(out).write_image(raw, w, h, rgba)),
            Codec::WebP => {
                encode_into(|out| WebPEncoder::new_lossless(out).write_image(raw, w, h, rgba))
            }
        };
        encoded.map_err(encode_failed(codec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            Rgba([(x * 16 % 256) as u8, (y * 16 % 256) as u8, 128, 255])
        })
    }

    fn encode(codec: Codec, pixels: &PixelBuffer) -> Vec<u8> {
        RustBackend::new()
            .encode(pixels, &EncodeConfig::plain(codec))
            .unwrap()
    }

    #[test]
    fn decode_png_to_rgba() {
        let png = encode(Codec::Png, &gradient(12, 7));
        let decoded = RustBackend::new().decode(&png).unwrap();
        assert_eq!(decoded.dimensions(), (12, 7));
        assert_eq!(decoded, gradient(12, 7));
    }

    #[test]
    fn decode_garbage_errors() {
        let result = RustBackend::new().decode(&[0xFF, 0xD8, 0xFF, 0x00, 0x13, 0x37]);
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn decode_empty_errors() {
        assert!(RustBackend::new().decode(&[]).is_err());
    }

    #[test]
    fn every_codec_produces_bytes() {
        let pixels = gradient(16, 9);
        for codec in Codec::ALL {
            let bytes = encode(codec, &pixels);
            assert!(!bytes.is_empty(), "{codec} produced no bytes");
        }
    }

    #[test]
    fn sniffable_codecs_decode_back_to_same_size() {
        let pixels = gradient(20, 10);
        let backend = RustBackend::new();
        for codec in [
            Codec::Bmp,
            Codec::Gif,
            Codec::Jpeg,
            Codec::Pbm,
            Codec::Png,
            Codec::Qoi,
            Codec::Tiff,
            Codec::WebP,
        ] {
            let bytes = encode(codec, &pixels);
            let decoded = backend.decode(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (20, 10), "{codec}");
        }
    }

    #[test]
    fn tga_decodes_with_explicit_format() {
        let bytes = encode(Codec::Tga, &gradient(5, 4));
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Tga).unwrap();
        assert_eq!((img.width(), img.height()), (5, 4));
    }

    #[test]
    fn lossless_codecs_keep_pixels() {
        let pixels = gradient(8, 8);
        let backend = RustBackend::new();
        for codec in [Codec::Png, Codec::Qoi, Codec::Tiff, Codec::WebP] {
            let decoded = backend.decode(&encode(codec, &pixels)).unwrap();
            assert_eq!(decoded, pixels, "{codec}");
        }
    }

    #[test]
    fn jpeg_output_has_jpeg_magic() {
        let bytes = encode(Codec::Jpeg, &gradient(8, 8));
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn jpeg_quality_changes_size() {
        let pixels = gradient(64, 64);
        let backend = RustBackend::new();
        let low = backend
            .encode(
                &pixels,
                &EncodeConfig {
                    quality: Quality::new(5),
                    ..EncodeConfig::plain(Codec::Jpeg)
                },
            )
            .unwrap();
        let high = backend
            .encode(
                &pixels,
                &EncodeConfig {
                    quality: Quality::new(100),
                    ..EncodeConfig::plain(Codec::Jpeg)
                },
            )
            .unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn jpeg_accepts_every_chroma_mode() {
        let pixels = gradient(17, 13);
        let backend = RustBackend::new();
        for chroma in [
            ChromaSubsampling::Ratio420,
            ChromaSubsampling::Ratio444,
            ChromaSubsampling::Ratio422,
            ChromaSubsampling::Ratio411,
            ChromaSubsampling::Ratio410,
        ] {
            let bytes = backend
                .encode(
                    &pixels,
                    &EncodeConfig {
                        chroma,
                        ..EncodeConfig::plain(Codec::Jpeg)
                    },
                )
                .unwrap();
            let decoded = backend.decode(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (17, 13), "{chroma:?}");
        }
    }

    #[test]
    fn pbm_is_black_and_white() {
        let pixels = PixelBuffer::from_fn(4, 1, |x, _| {
            let v = [0u8, 100, 200, 255][x as usize];
            Rgba([v, v, v, 255])
        });
        let decoded = RustBackend::new().decode(&encode(Codec::Pbm, &pixels)).unwrap();
        let values: Vec<u8> = decoded.pixels().map(|p| p[0]).collect();
        assert_eq!(values[0], values[1]);
        assert_eq!(values[2], values[3]);
        assert_ne!(values[0], values[3]);
    }

    #[test]
    fn pbm_keeps_black_and_white_polarity() {
        let pixels = PixelBuffer::from_fn(2, 1, |x, _| {
            let v = if x == 0 { 0 } else { 255 };
            Rgba([v, v, v, 255])
        });
        let decoded = RustBackend::new().decode(&encode(Codec::Pbm, &pixels)).unwrap();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }
}
