//! Coordinate spaces and the mapping between them
//!
//! Three spaces are in play:
//! - document space: page units at scale 1, origin top-left, y down. Every
//!   persisted coordinate lives here.
//! - screen space: CSS-like units on the displayed page (document × scale).
//! - device space: backing-store pixels (screen × device pixel ratio).
//!
//! Pointer input arrives in screen space relative to the surface origin and
//! is converted to document space before anything touches the store.

use serde::{Deserialize, Serialize};

/// A point in document space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

impl DocPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in screen space, relative to the page surface origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in backing-store pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DevicePoint {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned rectangle in document space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DocRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn origin(&self) -> DocPoint {
        DocPoint::new(self.x, self.y)
    }

    /// Same size, moved to `origin`
    pub fn with_origin(&self, origin: DocPoint) -> Self {
        Self { x: origin.x, y: origin.y, ..*self }
    }

    /// Inclusive containment test
    pub fn contains(&self, point: DocPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Axis-aligned rectangle in screen space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Effective render scale for a page in a container
///
/// The page is fitted down to the container width (never up) and then
/// multiplied by the user zoom: `min(container / intrinsic, 1) × zoom`.
/// A non-positive or non-finite container width counts as "no constraint".
pub fn effective_scale(container_width: f32, intrinsic_width: f32, zoom: f32) -> f32 {
    let fit = if container_width.is_finite() && container_width > 0.0 && intrinsic_width > 0.0 {
        (container_width / intrinsic_width).min(1.0)
    } else {
        1.0
    };
    fit * zoom
}

/// Converts between document, screen, and device space at one scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    scale: f32,
    device_pixel_ratio: f32,
}

impl CoordinateMapper {
    /// Create a mapper; `scale` and `device_pixel_ratio` must be positive
    pub fn new(scale: f32, device_pixel_ratio: f32) -> Self {
        Self { scale, device_pixel_ratio }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    /// Scalar document length to screen length
    pub fn to_screen(&self, value: f32) -> f32 {
        value * self.scale
    }

    /// Scalar screen length to document length
    pub fn to_document(&self, value: f32) -> f32 {
        value / self.scale
    }

    pub fn document_to_screen(&self, point: DocPoint) -> ScreenPoint {
        ScreenPoint::new(self.to_screen(point.x), self.to_screen(point.y))
    }

    pub fn screen_to_document(&self, point: ScreenPoint) -> DocPoint {
        DocPoint::new(self.to_document(point.x), self.to_document(point.y))
    }

    /// Convert a client-space pointer position to document space
    ///
    /// `surface_origin` is where the page surface's top-left corner sits in
    /// the same client space as `client`.
    pub fn screen_to_document_offset(&self, client: ScreenPoint, surface_origin: ScreenPoint) -> DocPoint {
        self.screen_to_document(ScreenPoint::new(
            client.x - surface_origin.x,
            client.y - surface_origin.y,
        ))
    }

    pub fn rect_to_screen(&self, rect: DocRect) -> ScreenRect {
        ScreenRect::new(
            self.to_screen(rect.x),
            self.to_screen(rect.y),
            self.to_screen(rect.width),
            self.to_screen(rect.height),
        )
    }

    pub fn screen_to_device(&self, point: ScreenPoint) -> DevicePoint {
        DevicePoint { x: point.x * self.device_pixel_ratio, y: point.y * self.device_pixel_ratio }
    }

    pub fn document_to_device(&self, point: DocPoint) -> DevicePoint {
        self.screen_to_device(self.document_to_screen(point))
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}
