//! Pure calculation functions for resize dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Resolve a requested `(width, height)` against the source size.
///
/// A zero on one axis is derived from the other axis and the source aspect
/// ratio. Zero on both axes keeps the source size.
///
/// # Examples
/// ```
/// # use image_ingest::imaging::calculations::resolve_target_dimensions;
/// assert_eq!(resolve_target_dimensions((800, 600), (0, 0)), (800, 600));
/// assert_eq!(resolve_target_dimensions((800, 600), (400, 0)), (400, 300));
/// assert_eq!(resolve_target_dimensions((800, 600), (0, 150)), (200, 150));
/// ```
pub fn resolve_target_dimensions(source: (u32, u32), requested: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    match requested {
        (0, 0) => source,
        (w, 0) if src_w > 0 => (w, scale_edge(src_h, w, src_w)),
        (0, h) if src_h > 0 => (scale_edge(src_w, h, src_h), h),
        (0, h) => (src_w, h),
        (w, 0) => (w, src_h),
        exact => exact,
    }
}

/// `edge * numerator / denominator`, rounded, never below 1.
fn scale_edge(edge: u32, numerator: u32, denominator: u32) -> u32 {
    ((edge as f64 * numerator as f64 / denominator as f64).round() as u32).max(1)
}

/// Largest size that fits inside `bounds` while keeping the source aspect ratio.
pub fn calculate_contain_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return bounds;
    }

    let ratio = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    (
        ((src_w as f64 * ratio).round() as u32).clamp(1, max_w.max(1)),
        ((src_h as f64 * ratio).round() as u32).clamp(1, max_h.max(1)),
    )
}

/// Smallest size that covers `bounds` while keeping the source aspect ratio.
///
/// At least one axis equals the bound; the other overflows and is cropped.
pub fn calculate_cover_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (min_w, min_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return bounds;
    }

    let ratio = (min_w as f64 / src_w as f64).max(min_h as f64 / src_h as f64);
    (
        ((src_w as f64 * ratio).round() as u32).max(min_w),
        ((src_h as f64 * ratio).round() as u32).max(min_h),
    )
}

/// Offset that centers `inner` inside `outer`.
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // resolve_target_dimensions tests
    // =========================================================================

    #[test]
    fn both_zero_keeps_source() {
        assert_eq!(resolve_target_dimensions((1920, 1080), (0, 0)), (1920, 1080));
    }

    #[test]
    fn zero_height_derived_from_width() {
        // 1920x1080 → width 960 → height 540
        assert_eq!(resolve_target_dimensions((1920, 1080), (960, 0)), (960, 540));
    }

    #[test]
    fn zero_width_derived_from_height() {
        // 1000x500 → height 100 → width 200
        assert_eq!(resolve_target_dimensions((1000, 500), (0, 100)), (200, 100));
    }

    #[test]
    fn explicit_dimensions_pass_through() {
        assert_eq!(resolve_target_dimensions((1000, 500), (300, 300)), (300, 300));
    }

    #[test]
    fn derived_edge_never_collapses_to_zero() {
        // 10000x10 → width 100 → height 0.1, kept at 1
        assert_eq!(resolve_target_dimensions((10000, 10), (100, 0)), (100, 1));
    }

    // =========================================================================
    // calculate_contain_dimensions tests
    // =========================================================================

    #[test]
    fn contain_wide_source_in_square() {
        // 800x400 in 200x200 → 200x100
        assert_eq!(calculate_contain_dimensions((800, 400), (200, 200)), (200, 100));
    }

    #[test]
    fn contain_tall_source_in_square() {
        assert_eq!(calculate_contain_dimensions((400, 800), (200, 200)), (100, 200));
    }

    #[test]
    fn contain_same_aspect() {
        assert_eq!(calculate_contain_dimensions((800, 600), (400, 300)), (400, 300));
    }

    #[test]
    fn contain_upscales_small_source() {
        assert_eq!(calculate_contain_dimensions((50, 25), (200, 200)), (200, 100));
    }

    #[test]
    fn cover_wide_source_in_square() {
        // 800x400 over 200x200 → 400x200, 200px cropped horizontally
        assert_eq!(calculate_cover_dimensions((800, 400), (200, 200)), (400, 200));
    }

    #[test]
    fn cover_never_undershoots_bounds() {
        let (w, h) = calculate_cover_dimensions((333, 777), (100, 90));
        assert!(w >= 100 && h >= 90);
        assert!(w == 100 || h == 90);
    }

    // =========================================================================
    // center_offset tests
    // =========================================================================

    #[test]
    fn center_offset_halves_slack() {
        assert_eq!(center_offset((200, 200), (200, 100)), (0, 50));
        assert_eq!(center_offset((201, 200), (100, 200)), (50, 0));
    }

    #[test]
    fn contain_with_source_size_target_is_identity() {
        let src = (640, 480);
        let target = resolve_target_dimensions(src, (0, 0));
        assert_eq!(calculate_contain_dimensions(src, target), src);
    }
}
