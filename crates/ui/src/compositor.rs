//! Two-layer page compositor
//!
//! The page raster (base layer) and the annotation overlay are kept as
//! separate device-pixel buffers. The base layer only changes when a render
//! completes; the overlay is repainted whenever its inputs change, which
//! during a drag is every frame. Compositing stacks the overlay on the base.

use crate::images::ImageCache;
use crate::raster::rasterize;
use crate::scene::DisplayList;
use image::{imageops, Rgba, RgbaImage};
use sigplace_core::{AnnotationId, DocPoint, GridSnap, RenderSurface};
use std::sync::Arc;

/// Inputs that decide whether the overlay must be repainted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayKey {
    /// Store revision the overlay was painted from
    pub revision: u64,
    pub selected: Option<AnnotationId>,
    /// Dragged annotation and its preview origin
    pub drag: Option<(AnnotationId, DocPoint)>,
    pub scale: f32,
    pub device_pixel_ratio: f32,
    pub show_grid: bool,
    pub snap: GridSnap,
}

/// What changed in the last update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerChanges {
    pub base: bool,
    pub overlay: bool,
}

impl LayerChanges {
    pub fn any(&self) -> bool {
        self.base || self.overlay
    }
}

/// Base raster plus overlay raster
#[derive(Default)]
pub struct Compositor {
    base: Option<Arc<RenderSurface>>,
    overlay: Option<RgbaImage>,
    overlay_key: Option<OverlayKey>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the base layer; the overlay is invalidated
    pub fn set_base(&mut self, surface: Arc<RenderSurface>) -> LayerChanges {
        self.base = Some(surface);
        self.overlay_key = None;
        LayerChanges { base: true, overlay: false }
    }

    /// Drop both layers
    pub fn clear(&mut self) {
        self.base = None;
        self.overlay = None;
        self.overlay_key = None;
    }

    pub fn base(&self) -> Option<&Arc<RenderSurface>> {
        self.base.as_ref()
    }

    pub fn overlay(&self) -> Option<&RgbaImage> {
        self.overlay.as_ref()
    }

    /// Whether the overlay painted for `key` is out of date
    pub fn overlay_stale(&self, key: &OverlayKey) -> bool {
        self.overlay_key.as_ref() != Some(key)
    }

    /// Repaint the overlay from `list`, sized to the base layer
    ///
    /// Returns `false` when there is no base layer to size against.
    pub fn repaint_overlay(&mut self, key: OverlayKey, list: &DisplayList, images: &ImageCache) -> bool {
        let Some(base) = &self.base else {
            return false;
        };
        let (width, height) = base.device_size();

        let mut layer = match self.overlay.take() {
            Some(mut layer) if layer.dimensions() == (width, height) => {
                layer.pixels_mut().for_each(|pixel| *pixel = Rgba([0, 0, 0, 0]));
                layer
            }
            _ => RgbaImage::new(width, height),
        };
        rasterize(&mut layer, list, images, key.device_pixel_ratio);

        self.overlay = Some(layer);
        self.overlay_key = Some(key);
        true
    }

    /// Flatten both layers into one image
    pub fn composite(&self) -> Option<RgbaImage> {
        let base = self.base.as_ref()?;
        let mut output = base.pixels().clone();
        if let Some(overlay) = &self.overlay {
            imageops::overlay(&mut output, overlay, 0, 0);
        }
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Color, Primitive, Rect};
    use sigplace_render::fixtures::blank_pdf;
    use sigplace_render::{PageRenderer, RenderProgress};
    use sigplace_scheduler::CancellationToken;

    fn surface(width: f32, height: f32) -> Arc<RenderSurface> {
        let renderer = PageRenderer::from_bytes(blank_pdf(width, height).unwrap()).unwrap();
        let job = renderer.begin(1.0, 1.0, CancellationToken::new()).unwrap();
        match job.finish().unwrap() {
            RenderProgress::Complete(surface) => Arc::new(surface),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn key(revision: u64) -> OverlayKey {
        OverlayKey {
            revision,
            selected: None,
            drag: None,
            scale: 1.0,
            device_pixel_ratio: 1.0,
            show_grid: false,
            snap: GridSnap::disabled(),
        }
    }

    #[test]
    fn test_overlay_needs_base() {
        let mut compositor = Compositor::new();
        assert!(!compositor.repaint_overlay(key(0), &DisplayList::new(), &ImageCache::new()));
        assert!(compositor.composite().is_none());
    }

    #[test]
    fn test_overlay_key_tracks_changes() {
        let mut compositor = Compositor::new();
        compositor.set_base(surface(20.0, 20.0));

        assert!(compositor.overlay_stale(&key(0)));
        compositor.repaint_overlay(key(0), &DisplayList::new(), &ImageCache::new());
        assert!(!compositor.overlay_stale(&key(0)));
        assert!(compositor.overlay_stale(&key(1)));

        compositor.set_base(surface(20.0, 20.0));
        assert!(compositor.overlay_stale(&key(0)));
    }

    #[test]
    fn test_composite_stacks_overlay_on_base() {
        let mut compositor = Compositor::new();
        compositor.set_base(surface(20.0, 20.0));
        let mut list = DisplayList::new();
        list.push(Primitive::Rectangle {
            rect: Rect::new(5.0, 5.0, 5.0, 5.0),
            color: Color::rgb(1.0, 0.0, 0.0),
        });

        compositor.repaint_overlay(key(0), &list, &ImageCache::new());
        let output = compositor.composite().unwrap();

        assert_eq!(output.dimensions(), (20, 20));
        assert_eq!(output.get_pixel(7, 7), &Rgba([255, 0, 0, 255]));
        assert_eq!(output.get_pixel(12, 12), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_repaint_clears_previous_overlay() {
        let mut compositor = Compositor::new();
        compositor.set_base(surface(20.0, 20.0));
        let mut list = DisplayList::new();
        list.push(Primitive::Rectangle {
            rect: Rect::new(0.0, 0.0, 5.0, 5.0),
            color: Color::rgb(0.0, 0.0, 0.0),
        });
        compositor.repaint_overlay(key(0), &list, &ImageCache::new());

        compositor.repaint_overlay(key(1), &DisplayList::new(), &ImageCache::new());

        assert_eq!(compositor.overlay().unwrap().get_pixel(2, 2), &Rgba([0, 0, 0, 0]));
    }
}
