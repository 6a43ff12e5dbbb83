//! Resize step: dimension resolution, fit modes and linear-light resampling.
//!
//! [`apply_resize`] is what the pipeline calls. It resolves the target size
//! with [`calculations`](super::calculations), resamples, and then runs the
//! per-pixel post-processing (alpha premultiplication and brightness) on the
//! result.
//!
//! With `linear_rgb` the buffer is lifted to `Rgba32F` in linear light before
//! filtering and brought back to sRGB afterwards, so averaging happens on
//! light intensity rather than on gamma-encoded values.

use super::backend::PixelBuffer;
use super::calculations::{
    calculate_contain_dimensions, calculate_cover_dimensions, center_offset,
    resolve_target_dimensions,
};
use super::color::{
    apply_linear_brightness, for_each_pixel, linear_to_srgb, premultiply_alpha, srgb_to_linear,
};
use super::options::{Dimension, FitMode, ResizeOptions, Resampler};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, Rgba, Rgba32FImage};

type Buffer<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

pub fn filter_type(resampler: Resampler) -> FilterType {
    match resampler {
        Resampler::Nearest => FilterType::Nearest,
        Resampler::Triangle => FilterType::Triangle,
        Resampler::CatmullRom => FilterType::CatmullRom,
        Resampler::Gaussian => FilterType::Gaussian,
        Resampler::Lanczos3 => FilterType::Lanczos3,
    }
}

/// Resize `pixels` per `options`, then premultiply and brighten in place.
///
/// Does not look at `options.enabled`; the caller decides whether the step
/// runs at all.
pub fn apply_resize(pixels: &PixelBuffer, options: &ResizeOptions) -> PixelBuffer {
    let mut out = resample(pixels, options);
    if options.premultiply_alpha {
        for_each_pixel(&mut out, premultiply_alpha);
    }
    let brightness = options.brightness_factor;
    if !brightness.is_identity() {
        let factor = brightness.value();
        for_each_pixel(&mut out, |px| apply_linear_brightness(px, factor));
    }
    out
}

/// Resample only, no post-processing.
pub fn resample(pixels: &PixelBuffer, options: &ResizeOptions) -> PixelBuffer {
    let source = pixels.dimensions();
    let requested = (options.width.value(), options.height.value());
    let (w, h) = resolve_target_dimensions(source, requested);
    // A derived edge can exceed the requested bound on extreme aspect ratios.
    let target = (w.min(Dimension::MAX), h.min(Dimension::MAX));
    let fit = options.fit.effective(options.maintain_aspect_ratio);
    let filter = filter_type(options.resampler);

    if target == source {
        return pixels.clone();
    }

    if options.linear_rgb {
        let linear = fit_resize(&to_linear(pixels), target, fit, filter);
        from_linear(&linear)
    } else {
        fit_resize(pixels, target, fit, filter)
    }
}

fn fit_resize<P>(img: &Buffer<P>, target: (u32, u32), fit: FitMode, filter: FilterType) -> Buffer<P>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let source = img.dimensions();
    let (target_w, target_h) = target;
    match fit {
        FitMode::Manual | FitMode::Stretch => imageops::resize(img, target_w, target_h, filter),
        FitMode::Contain => {
            let (w, h) = calculate_contain_dimensions(source, target);
            imageops::resize(img, w, h, filter)
        }
        FitMode::Cover => {
            let fill = calculate_cover_dimensions(source, target);
            let filled = imageops::resize(img, fill.0, fill.1, filter);
            let (x, y) = center_offset(fill, target);
            imageops::crop_imm(&filled, x, y, target_w, target_h).to_image()
        }
        FitMode::Pad => {
            let inner = calculate_contain_dimensions(source, target);
            let fitted = imageops::resize(img, inner.0, inner.1, filter);
            let (x, y) = center_offset(target, inner);
            let mut canvas = ImageBuffer::new(target_w, target_h);
            imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);
            canvas
        }
    }
}

fn to_linear(pixels: &PixelBuffer) -> Rgba32FImage {
    Rgba32FImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        Rgba([
            srgb_to_linear(r),
            srgb_to_linear(g),
            srgb_to_linear(b),
            a as f32 / 255.0,
        ])
    })
}

fn from_linear(linear: &Rgba32FImage) -> PixelBuffer {
    PixelBuffer::from_fn(linear.width(), linear.height(), |x, y| {
        let [r, g, b, a] = linear.get_pixel(x, y).0;
        Rgba([
            linear_to_srgb(r),
            linear_to_srgb(g),
            linear_to_srgb(b),
            (a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::color::LEGACY_LINEAR_BRIGHTNESS;
    use crate::imaging::options::BrightnessFactor;

    fn opts(width: u32, height: u32, fit: FitMode) -> ResizeOptions {
        ResizeOptions {
            enabled: true,
            width: Dimension::new(width.into()).unwrap(),
            height: Dimension::new(height.into()).unwrap(),
            fit,
            ..ResizeOptions::default()
        }
    }

    fn solid(width: u32, height: u32, px: [u8; 4]) -> PixelBuffer {
        PixelBuffer::from_pixel(width, height, Rgba(px))
    }

    #[test]
    fn zero_by_zero_keeps_source_dimensions() {
        let src = solid(37, 21, [10, 20, 30, 255]);
        let mut o = opts(0, 0, FitMode::Manual);
        o.maintain_aspect_ratio = true;
        let out = apply_resize(&src, &o);
        assert_eq!(out.dimensions(), (37, 21));
    }

    #[test]
    fn width_only_derives_height() {
        let out = resample(&solid(200, 100, [0, 0, 0, 255]), &opts(50, 0, FitMode::Manual));
        assert_eq!(out.dimensions(), (50, 25));
    }

    #[test]
    fn stretch_ignores_aspect_ratio() {
        let out = resample(&solid(200, 100, [0, 0, 0, 255]), &opts(30, 30, FitMode::Stretch));
        assert_eq!(out.dimensions(), (30, 30));
    }

    #[test]
    fn maintain_aspect_ratio_turns_manual_into_contain() {
        let mut o = opts(30, 30, FitMode::Manual);
        o.maintain_aspect_ratio = true;
        let out = resample(&solid(200, 100, [0, 0, 0, 255]), &o);
        assert_eq!(out.dimensions(), (30, 15));
    }

    #[test]
    fn cover_crops_to_exact_target() {
        let out = resample(&solid(200, 100, [0, 0, 0, 255]), &opts(40, 40, FitMode::Cover));
        assert_eq!(out.dimensions(), (40, 40));
    }

    #[test]
    fn pad_centers_on_transparent_canvas() {
        let src = solid(200, 100, [255, 0, 0, 255]);
        let mut o = opts(40, 40, FitMode::Pad);
        o.linear_rgb = false;
        let out = resample(&src, &o);
        assert_eq!(out.dimensions(), (40, 40));
        // 40x20 strip at y = 10..30
        assert_eq!(out.get_pixel(20, 0)[3], 0);
        assert_eq!(out.get_pixel(20, 39)[3], 0);
        assert_eq!(*out.get_pixel(20, 20), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn solid_color_survives_linear_resample() {
        let src = solid(64, 64, [180, 90, 30, 255]);
        let out = resample(&src, &opts(16, 16, FitMode::Manual));
        for px in out.pixels() {
            for c in 0..3 {
                assert!((px[c] as i16 - src.get_pixel(0, 0)[c] as i16).abs() <= 1);
            }
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn linear_downscale_of_checkerboard_is_brighter_than_gamma_average() {
        let src = PixelBuffer::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let mut o = opts(8, 8, FitMode::Manual);
        o.resampler = Resampler::Triangle;
        let linear = resample(&src, &o);
        o.linear_rgb = false;
        let gamma = resample(&src, &o);
        // Linear average of black and white is 0.5 linear ≈ 188 sRGB.
        assert!(linear.get_pixel(4, 4)[0] > gamma.get_pixel(4, 4)[0]);
    }

    #[test]
    fn premultiply_runs_after_resample() {
        let src = solid(20, 20, [200, 200, 200, 0]);
        let out = apply_resize(&src, &opts(10, 10, FitMode::Manual));
        assert!(out.pixels().all(|p| p.0[..3] == [0, 0, 0]));
    }

    #[test]
    fn premultiply_can_be_disabled() {
        let src = solid(20, 20, [200, 200, 200, 0]);
        let mut o = opts(10, 10, FitMode::Manual);
        o.premultiply_alpha = false;
        o.linear_rgb = false;
        let out = apply_resize(&src, &o);
        assert!((out.get_pixel(5, 5)[0] as i16 - 200).abs() <= 1);
        assert_eq!(out.get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn legacy_brightness_factor_brightens() {
        let src = solid(10, 10, [100, 100, 100, 255]);
        let mut o = opts(0, 0, FitMode::Manual);
        o.brightness_factor = BrightnessFactor::new(LEGACY_LINEAR_BRIGHTNESS as f64).unwrap();
        let out = apply_resize(&src, &o);
        assert!(out.get_pixel(0, 0)[0] > 100);
    }

    #[test]
    fn filter_mapping_covers_every_resampler() {
        assert_eq!(filter_type(Resampler::Nearest), FilterType::Nearest);
        assert_eq!(filter_type(Resampler::Lanczos3), FilterType::Lanczos3);
        assert_eq!(filter_type(Resampler::CatmullRom), FilterType::CatmullRom);
    }
}
