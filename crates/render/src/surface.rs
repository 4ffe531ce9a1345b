//! Render surface: a pixel-complete raster of the page at one scale

use crate::pdf::{PageSize, RenderError};
use image::RgbaImage;

/// Largest surface edge we are willing to allocate, in device pixels
pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

/// Device-pixel size of a surface for a page at `scale` and `device_pixel_ratio`
///
/// Each edge is `ceil(intrinsic * scale * device_pixel_ratio)`, at least 1.
pub fn surface_dimensions(
    intrinsic: PageSize,
    scale: f32,
    device_pixel_ratio: f32,
) -> Result<(u32, u32), RenderError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(RenderError::InvalidScale(scale));
    }
    if !(device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0) {
        return Err(RenderError::InvalidScale(device_pixel_ratio));
    }

    let factor = f64::from(scale) * f64::from(device_pixel_ratio);
    let width = (f64::from(intrinsic.width) * factor).ceil().max(1.0) as u64;
    let height = (f64::from(intrinsic.height) * factor).ceil().max(1.0) as u64;

    let limit = u64::from(MAX_SURFACE_DIMENSION);
    if width > limit || height > limit {
        return Err(RenderError::SurfaceTooLarge { width, height });
    }

    Ok((width as u32, height as u32))
}

/// A fully rendered page raster
///
/// Only completed renders produce a surface; partially painted buffers
/// never leave the render job.
#[derive(Debug, Clone)]
pub struct RenderSurface {
    pixels: RgbaImage,
    intrinsic: PageSize,
    scale: f32,
    device_pixel_ratio: f32,
}

impl RenderSurface {
    pub(crate) fn new(
        pixels: RgbaImage,
        intrinsic: PageSize,
        scale: f32,
        device_pixel_ratio: f32,
    ) -> Self {
        Self { pixels, intrinsic, scale, device_pixel_ratio }
    }

    /// Page pixels in device space
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Intrinsic page size in document units
    pub fn intrinsic(&self) -> PageSize {
        self.intrinsic
    }

    /// Effective scale (document units to screen pixels)
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    /// Surface size in device pixels
    pub fn device_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Surface size in screen pixels
    pub fn screen_size(&self) -> (f32, f32) {
        (self.intrinsic.width * self.scale, self.intrinsic.height * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_round_up() {
        let page = PageSize::new(800.0, 600.0);
        assert_eq!(surface_dimensions(page, 0.5, 1.0).unwrap(), (400, 300));
        assert_eq!(surface_dimensions(page, 0.333, 1.0).unwrap(), (267, 200));
        assert_eq!(surface_dimensions(page, 0.5, 2.0).unwrap(), (800, 600));
        assert_eq!(surface_dimensions(page, 0.5, 1.5).unwrap(), (600, 450));
    }

    #[test]
    fn test_dimensions_never_zero() {
        let page = PageSize::new(1.0, 1.0);
        assert_eq!(surface_dimensions(page, 0.001, 1.0).unwrap(), (1, 1));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let page = PageSize::new(800.0, 600.0);
        assert!(matches!(surface_dimensions(page, 0.0, 1.0), Err(RenderError::InvalidScale(_))));
        assert!(matches!(
            surface_dimensions(page, f32::NAN, 1.0),
            Err(RenderError::InvalidScale(_))
        ));
        assert!(matches!(surface_dimensions(page, 1.0, -1.0), Err(RenderError::InvalidScale(_))));
    }

    #[test]
    fn test_oversized_surface_rejected() {
        let page = PageSize::new(14_400.0, 14_400.0);
        assert!(matches!(
            surface_dimensions(page, 3.0, 1.0),
            Err(RenderError::SurfaceTooLarge { .. })
        ));
    }
}
