//! Software rasterizer for overlay display lists
//!
//! Primitives are in screen space; every coordinate is multiplied by the
//! device pixel ratio and snapped to whole device pixels. Blending is
//! source-over on straight (non-premultiplied) RGBA.

use crate::images::ImageCache;
use crate::scene::{Color, DisplayList, Primitive, Rect};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Source-over blend of `top` onto `base`, with `top` alpha scaled by `opacity`
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let top_a = f32::from(top[3]) / 255.0 * opacity.min(1.0);
    let base_a = f32::from(base[3]) / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mix = |t: u8, b: u8| {
        let value = (f32::from(t) * top_a + f32::from(b) * base_a * (1.0 - top_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        mix(top[0], base[0]),
        mix(top[1], base[1]),
        mix(top[2], base[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Device-pixel bounds of a screen rect, clipped to the target
fn device_bounds(target: &RgbaImage, rect: Rect, ratio: f32) -> Option<(u32, u32, u32, u32)> {
    let x0 = (rect.x * ratio).round().max(0.0);
    let y0 = (rect.y * ratio).round().max(0.0);
    let x1 = ((rect.x + rect.width) * ratio).round().min(target.width() as f32);
    let y1 = ((rect.y + rect.height) * ratio).round().min(target.height() as f32);
    (x1 > x0 && y1 > y0).then(|| (x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

pub fn fill_rect(target: &mut RgbaImage, rect: Rect, color: Color, ratio: f32) {
    let Some((x0, y0, x1, y1)) = device_bounds(target, rect, ratio) else {
        return;
    };
    let paint = Rgba(color.to_rgba8());
    for y in y0..y1 {
        for x in x0..x1 {
            let base = *target.get_pixel(x, y);
            target.put_pixel(x, y, blend_pixel(base, paint, 1.0));
        }
    }
}

/// Outline `rect` with a stroke of `width` screen units centred on its edge
pub fn stroke_rect(target: &mut RgbaImage, rect: Rect, width: f32, color: Color, ratio: f32) {
    let half = width / 2.0;
    let (left, top) = (rect.x - half, rect.y - half);
    let (outer_w, outer_h) = (rect.width + width, rect.height + width);

    fill_rect(target, Rect::new(left, top, outer_w, width), color, ratio);
    fill_rect(target, Rect::new(left, rect.y + rect.height - half, outer_w, width), color, ratio);
    fill_rect(target, Rect::new(left, rect.y + half, width, (rect.height - width).max(0.0)), color, ratio);
    fill_rect(
        target,
        Rect::new(rect.x + rect.width - half, rect.y + half, width, (rect.height - width).max(0.0)),
        color,
        ratio,
    );
}

/// Axis-aligned lines become thin rects; anything else is stamped along its length
pub fn draw_line(target: &mut RgbaImage, start: [f32; 2], end: [f32; 2], width: f32, color: Color, ratio: f32) {
    let half = width / 2.0;
    if start[0] == end[0] || start[1] == end[1] {
        let x = start[0].min(end[0]) - half;
        let y = start[1].min(end[1]) - half;
        let w = (end[0] - start[0]).abs() + width;
        let h = (end[1] - start[1]).abs() + width;
        fill_rect(target, Rect::new(x, y, w, h), color, ratio);
        return;
    }

    let length = ((end[0] - start[0]).powi(2) + (end[1] - start[1]).powi(2)).sqrt();
    let steps = (length * ratio).ceil().max(1.0) as u32;
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let cx = start[0] + (end[0] - start[0]) * t;
        let cy = start[1] + (end[1] - start[1]) * t;
        fill_rect(target, Rect::centered(cx, cy, width), color, ratio);
    }
}

/// Stretch `image` over `rect` and blend it at `opacity`
pub fn draw_image(target: &mut RgbaImage, image: &RgbaImage, rect: Rect, opacity: f32, ratio: f32) {
    let dest_w = (rect.width * ratio).round();
    let dest_h = (rect.height * ratio).round();
    if dest_w < 1.0 || dest_h < 1.0 || image.width() == 0 || image.height() == 0 {
        return;
    }
    let (dest_w, dest_h) = (dest_w as u32, dest_h as u32);
    let scaled = if image.dimensions() == (dest_w, dest_h) {
        image.clone()
    } else {
        imageops::resize(image, dest_w, dest_h, FilterType::Triangle)
    };

    let origin_x = (rect.x * ratio).round() as i64;
    let origin_y = (rect.y * ratio).round() as i64;
    for (sx, sy, pixel) in scaled.enumerate_pixels() {
        let x = origin_x + i64::from(sx);
        let y = origin_y + i64::from(sy);
        if x < 0 || y < 0 || x >= i64::from(target.width()) || y >= i64::from(target.height()) {
            continue;
        }
        let (x, y) = (x as u32, y as u32);
        let base = *target.get_pixel(x, y);
        target.put_pixel(x, y, blend_pixel(base, *pixel, opacity));
    }
}

/// Paint every primitive of `list` onto `target`, in order
///
/// Images missing from `images` (not yet decoded, or failed) are skipped.
pub fn rasterize(target: &mut RgbaImage, list: &DisplayList, images: &ImageCache, ratio: f32) {
    for primitive in list.primitives() {
        match primitive {
            Primitive::Rectangle { rect, color } => fill_rect(target, *rect, *color, ratio),
            Primitive::StrokeRect { rect, width, color } => {
                stroke_rect(target, *rect, *width, *color, ratio)
            }
            Primitive::Line { start, end, width, color } => {
                draw_line(target, *start, *end, *width, *color, ratio)
            }
            Primitive::Image { rect, annotation, opacity } => {
                if let Some(image) = images.get(*annotation) {
                    draw_image(target, image, *rect, *opacity, ratio);
                }
            }
        }
    }
}
