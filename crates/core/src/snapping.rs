//! Grid snapping and page-bounds clamping
//!
//! Both operate in document space, so the same grid and the same bounds
//! apply at every zoom level.

use crate::coords::DocPoint;
use sigplace_render::PageSize;

/// Round `value` to the nearest multiple of `grid_size`
///
/// Halves round away from zero. A non-positive grid leaves the value
/// untouched.
pub fn snap(value: f32, grid_size: f32) -> f32 {
    if grid_size <= 0.0 || !grid_size.is_finite() {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Keep an annotation's origin inside the page
///
/// Each axis becomes `max(0, min(v, page - size))`, so an annotation larger
/// than the page pins to the top-left edge rather than going negative.
pub fn clamp_origin(origin: DocPoint, width: f32, height: f32, page: PageSize) -> DocPoint {
    DocPoint::new(
        origin.x.min(page.width - width).max(0.0),
        origin.y.min(page.height - height).max(0.0),
    )
}

/// Grid snapping configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSnap {
    /// Whether positions snap on release
    pub enabled: bool,

    /// Grid pitch in document units
    pub grid_size: f32,
}

impl GridSnap {
    pub fn new(enabled: bool, grid_size: f32) -> Self {
        Self { enabled, grid_size }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, grid_size: 20.0 }
    }

    /// Snap a point if snapping is enabled
    pub fn apply(&self, point: DocPoint) -> DocPoint {
        if !self.enabled {
            return point;
        }
        DocPoint::new(snap(point.x, self.grid_size), snap(point.y, self.grid_size))
    }
}

impl Default for GridSnap {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_rounds_to_nearest_line() {
        assert_eq!(snap(110.0, 20.0), 120.0);
        assert_eq!(snap(109.0, 20.0), 100.0);
        assert_eq!(snap(0.0, 20.0), 0.0);
        assert_eq!(snap(-11.0, 20.0), -20.0);
    }

    #[test]
    fn test_snap_is_idempotent() {
        for grid in [5.0_f32, 10.0, 20.0, 25.0] {
            for step in 0..200 {
                let value = step as f32 * 3.7 - 50.0;
                let once = snap(value, grid);
                assert_eq!(snap(once, grid), once, "value {value} grid {grid}");
            }
        }
    }

    #[test]
    fn test_snap_ignores_degenerate_grid() {
        assert_eq!(snap(13.3, 0.0), 13.3);
        assert_eq!(snap(13.3, -5.0), 13.3);
    }

    #[test]
    fn test_grid_snap_disabled_passes_through() {
        let point = DocPoint::new(33.0, 47.0);
        assert_eq!(GridSnap::disabled().apply(point), point);
        assert_eq!(GridSnap::new(true, 20.0).apply(point), DocPoint::new(40.0, 40.0));
    }

    #[test]
    fn test_clamp_keeps_annotation_on_page() {
        let page = PageSize::new(612.0, 792.0);

        assert_eq!(
            clamp_origin(DocPoint::new(600.0, 780.0), 200.0, 100.0, page),
            DocPoint::new(412.0, 692.0)
        );
        assert_eq!(clamp_origin(DocPoint::new(-20.0, -1.0), 200.0, 100.0, page), DocPoint::new(0.0, 0.0));
        assert_eq!(
            clamp_origin(DocPoint::new(120.0, 120.0), 200.0, 100.0, page),
            DocPoint::new(120.0, 120.0)
        );
    }

    #[test]
    fn test_clamp_oversized_annotation_pins_to_origin() {
        let page = PageSize::new(100.0, 100.0);
        assert_eq!(clamp_origin(DocPoint::new(30.0, 30.0), 150.0, 150.0, page), DocPoint::new(0.0, 0.0));
    }
}
