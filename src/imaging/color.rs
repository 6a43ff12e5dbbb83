//! Per-pixel color math.
//!
//! Every function here is pure and works on one channel or one pixel, so the
//! pipeline can fan them out across rows with [`for_each_pixel`].
//!
//! The transfer functions are the piecewise sRGB curve from IEC 61966-2-1:
//!
//! ```text
//! decode:  v <= 0.04045    → v / 12.92       else ((v + 0.055) / 1.055)^2.4
//! encode:  v <= 0.0031308  → v * 12.92       else 1.055 * v^(1/2.4) - 0.055
//! ```

use super::backend::PixelBuffer;
use super::options::SmoothRadius;
use image::{Pixel, Rgba};
use rayon::prelude::*;

/// Historic brightening factor that used to ride along with linear-RGB
/// processing. Pass it as `brightness_factor` to reproduce old output.
pub const LEGACY_LINEAR_BRIGHTNESS: f32 = 1.10;

/// Clamp to the unit interval. NaN maps to 0.
#[inline]
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Decode an 8-bit sRGB channel to linear light in `[0, 1]`.
#[inline]
pub fn srgb_to_linear(channel: u8) -> f32 {
    let v = channel as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode linear light back to an 8-bit sRGB channel.
#[inline]
pub fn linear_to_srgb(linear: f32) -> u8 {
    let v = clamp_unit(linear);
    let srgb = if v <= 0.0031308 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Scale R, G and B by `A / 255`, truncating. Alpha is untouched.
#[inline]
pub fn premultiply_alpha(pixel: &mut Rgba<u8>) {
    let a = pixel[3] as u32;
    for c in &mut pixel.0[..3] {
        *c = (*c as u32 * a / 255) as u8;
    }
}

/// Multiply R, G and B by `factor` in linear light. Alpha is untouched.
#[inline]
pub fn apply_linear_brightness(pixel: &mut Rgba<u8>, factor: f32) {
    for c in &mut pixel.0[..3] {
        *c = linear_to_srgb(clamp_unit(srgb_to_linear(*c) * factor));
    }
}

/// Snap a channel to one of `levels` evenly spaced values.
///
/// `levels < 2` leaves the channel unchanged.
#[inline]
pub fn posterize_channel(channel: u8, levels: u8) -> u8 {
    if levels < 2 {
        return channel;
    }
    let steps = (levels - 1) as f32;
    let index = (channel as f32 / 255.0 * steps).round();
    (index * 255.0 / steps).round() as u8
}

/// Gaussian sigma for a smoothing radius. The radius is the sigma.
#[inline]
pub fn blur_sigma(radius: SmoothRadius) -> f32 {
    radius.value() as f32
}

/// Apply `f` to every pixel, one rayon task per row.
///
/// Returns after all rows are done, so callers can treat it as a barrier
/// between pipeline steps.
pub fn for_each_pixel<F>(buffer: &mut PixelBuffer, f: F)
where
    F: Fn(&mut Rgba<u8>) + Sync,
{
    let stride = buffer.width() as usize * 4;
    if stride == 0 {
        return;
    }
    let raw: &mut [u8] = buffer;
    raw.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            f(Rgba::from_slice_mut(px));
        }
    });
}
