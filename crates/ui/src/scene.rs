//! Overlay display list
//!
//! The overlay painter describes a frame as a flat list of primitives in
//! screen space; the rasterizer turns that list into device pixels. Keeping
//! the two apart lets tests assert on draw order without decoding pixels.

use sigplace_core::AnnotationId;

/// RGBA color value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new color from RGBA values (0.0 to 1.0)
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a new opaque color from RGB values
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Opaque color from 8-bit channels
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0)
    }

    /// Same color with alpha multiplied by `opacity`
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self { a: self.a * opacity, ..self }
    }

    /// 8-bit RGBA, channels clamped
    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }
}

/// Rectangle in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Square of edge `size` centred on (`cx`, `cy`)
    pub fn centered(cx: f32, cy: f32, size: f32) -> Self {
        Self::new(cx - size / 2.0, cy - size / 2.0, size, size)
    }
}

impl From<sigplace_core::ScreenRect> for Rect {
    fn from(rect: sigplace_core::ScreenRect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// Visual primitive types that can be rendered
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Filled rectangle with solid color
    Rectangle { rect: Rect, color: Color },
    /// Rectangle outline, stroke centred on the edge
    StrokeRect { rect: Rect, width: f32, color: Color },
    /// Line segment
    Line { start: [f32; 2], end: [f32; 2], width: f32, color: Color },
    /// Decoded signature image stretched over `rect`
    Image { rect: Rect, annotation: AnnotationId, opacity: f32 },
}

/// Ordered primitives for one overlay frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    primitives: Vec<Primitive>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Annotation ids of image primitives, in draw order
    pub fn image_order(&self) -> Vec<AnnotationId> {
        self.primitives
            .iter()
            .filter_map(|primitive| match primitive {
                Primitive::Image { annotation, .. } => Some(*annotation),
                _ => None,
            })
            .collect()
    }
}
