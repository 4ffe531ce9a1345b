//! Overlay painter
//!
//! Builds the annotation layer from a store snapshot. The painter holds no
//! state between frames: the same [`OverlayFrame`] always yields the same
//! display list.
//!
//! Draw order:
//! 1. grid, when shown
//! 2. annotations that are neither selected nor dragged, in store order
//! 3. the selected annotation, with a highlight border and eight handles
//! 4. the dragged annotation, translucent, at its snapped preview position
//!
//! An annotation whose image failed to decode is left out of every pass.

use crate::images::ImageCache;
use crate::scene::{Color, DisplayList, Primitive, Rect};
use sigplace_core::{
    clamp_origin, handle_anchors, Annotation, AnnotationId, CoordinateMapper, DocRect, DragSession,
    EditorConfig, GridSnap, PageSize, Snapshot,
};

/// Colors and sizes used by the overlay
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub grid_color: Color,
    pub grid_line_width: f32,
    /// Backing fill behind each signature image
    pub backdrop: Color,
    pub border_color: Color,
    pub border_width: f32,
    pub highlight_color: Color,
    pub highlight_width: f32,
    /// Edge length of the square selection handles
    pub handle_size: f32,
    pub drag_opacity: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            grid_color: Color::rgba(0.0, 0.0, 1.0, 0.1),
            grid_line_width: 1.0,
            backdrop: Color::rgba(1.0, 1.0, 1.0, 0.9),
            border_color: Color::rgba(0.0, 0.0, 0.0, 0.3),
            border_width: 1.0,
            highlight_color: Color::from_rgb8(0x3b, 0x82, 0xf6),
            highlight_width: 2.0,
            handle_size: 8.0,
            drag_opacity: 0.8,
        }
    }
}

impl OverlayStyle {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self { handle_size: config.handle_size, drag_opacity: config.drag_opacity, ..Self::default() }
    }
}

/// Everything one overlay frame depends on
#[derive(Debug, Clone)]
pub struct OverlayFrame<'a> {
    pub annotations: &'a Snapshot,
    pub selected: Option<AnnotationId>,
    pub drag: Option<&'a DragSession>,
    pub mapper: CoordinateMapper,
    /// Intrinsic page size, for the grid extent and drag preview bounds
    pub page: PageSize,
    pub show_grid: bool,
    pub snap: GridSnap,
    /// Decoded images; without a cache every image annotation is drawn
    pub images: Option<&'a ImageCache>,
}

impl OverlayFrame<'_> {
    fn is_drawable(&self, id: AnnotationId) -> bool {
        self.images.map_or(true, |images| !images.is_broken(id))
    }
}

/// Stateless overlay painter
#[derive(Debug, Clone, Default)]
pub struct OverlayPainter {
    style: OverlayStyle,
}

impl OverlayPainter {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Build the display list for one frame
    pub fn paint(&self, frame: &OverlayFrame<'_>) -> DisplayList {
        let mut list = DisplayList::new();

        if frame.show_grid {
            self.paint_grid(&mut list, frame);
        }

        let dragged = frame.drag.map(|session| session.annotation_id);
        let visible = |annotation: &&Annotation| {
            annotation.signature().is_image()
                && Some(annotation.id()) != dragged
                && frame.is_drawable(annotation.id())
        };

        for annotation in frame.annotations.iter().filter(visible) {
            if Some(annotation.id()) != frame.selected {
                self.paint_signature(&mut list, annotation.id(), annotation.rect(), frame, 1.0);
                let rect = Rect::from(frame.mapper.rect_to_screen(annotation.rect()));
                list.push(Primitive::StrokeRect {
                    rect,
                    width: self.style.border_width,
                    color: self.style.border_color,
                });
            }
        }

        if let Some(selected) = frame
            .annotations
            .iter()
            .filter(visible)
            .find(|annotation| Some(annotation.id()) == frame.selected)
        {
            self.paint_signature(&mut list, selected.id(), selected.rect(), frame, 1.0);
            self.paint_highlight(&mut list, selected.rect(), frame, 1.0);
            self.paint_handles(&mut list, selected.rect(), frame);
        }

        if let Some(session) = frame.drag.filter(|session| frame.is_drawable(session.annotation_id)) {
            let original = session.original.rect();
            let preview = session.preview_origin(&frame.mapper, frame.snap);
            let origin = clamp_origin(preview, original.width, original.height, frame.page);
            let rect = original.with_origin(origin);
            let opacity = self.style.drag_opacity;

            self.paint_signature(&mut list, session.annotation_id, rect, frame, opacity);
            self.paint_highlight(&mut list, rect, frame, opacity);
        }

        list
    }

    fn paint_grid(&self, list: &mut DisplayList, frame: &OverlayFrame<'_>) {
        let pitch = frame.mapper.to_screen(frame.snap.grid_size);
        if pitch < 1.0 {
            return;
        }
        let width = frame.mapper.to_screen(frame.page.width);
        let height = frame.mapper.to_screen(frame.page.height);
        let line = |start: [f32; 2], end: [f32; 2]| Primitive::Line {
            start,
            end,
            width: self.style.grid_line_width,
            color: self.style.grid_color,
        };

        let mut x = pitch;
        while x < width {
            list.push(line([x, 0.0], [x, height]));
            x += pitch;
        }
        let mut y = pitch;
        while y < height {
            list.push(line([0.0, y], [width, y]));
            y += pitch;
        }
    }

    fn paint_signature(
        &self,
        list: &mut DisplayList,
        id: AnnotationId,
        rect: DocRect,
        frame: &OverlayFrame<'_>,
        opacity: f32,
    ) {
        let rect = Rect::from(frame.mapper.rect_to_screen(rect));
        list.push(Primitive::Rectangle { rect, color: self.style.backdrop.with_opacity(opacity) });
        list.push(Primitive::Image { rect, annotation: id, opacity });
    }

    fn paint_highlight(&self, list: &mut DisplayList, rect: DocRect, frame: &OverlayFrame<'_>, opacity: f32) {
        let screen = frame.mapper.rect_to_screen(rect);
        let inset = self.style.highlight_width / 2.0;
        list.push(Primitive::StrokeRect {
            rect: Rect::new(
                screen.x - inset,
                screen.y - inset,
                screen.width + self.style.highlight_width,
                screen.height + self.style.highlight_width,
            ),
            width: self.style.highlight_width,
            color: self.style.highlight_color.with_opacity(opacity),
        });
    }

    fn paint_handles(&self, list: &mut DisplayList, rect: DocRect, frame: &OverlayFrame<'_>) {
        for (_, anchor) in handle_anchors(frame.mapper.rect_to_screen(rect)) {
            list.push(Primitive::Rectangle {
                rect: Rect::centered(anchor.x, anchor.y, self.style.handle_size),
                color: self.style.highlight_color,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::encode_png_data_url;
    use image::{Rgba, RgbaImage};
    use sigplace_core::{AnnotationStore, DocPoint, ScreenPoint, Signature};

    const LETTER: PageSize = PageSize { width: 612.0, height: 792.0 };

    fn store(count: usize) -> (AnnotationStore, Vec<AnnotationId>) {
        let mut store = AnnotationStore::new();
        let ids = (0..count)
            .map(|index| {
                let rect = DocRect::new(50.0 * index as f32, 10.0, 40.0, 20.0);
                store.add(Signature::image("data:image/png;base64,AAAA", rect).unwrap()).unwrap()
            })
            .collect();
        (store, ids)
    }

    fn frame<'a>(snapshot: &'a Snapshot) -> OverlayFrame<'a> {
        OverlayFrame {
            annotations: snapshot,
            selected: None,
            drag: None,
            mapper: CoordinateMapper::new(1.0, 1.0),
            page: LETTER,
            show_grid: false,
            snap: GridSnap::disabled(),
            images: None,
        }
    }

    fn handle_count(list: &DisplayList) -> usize {
        list.primitives()
            .iter()
            .filter(|p| matches!(p, Primitive::Rectangle { rect, .. } if rect.width == 8.0 && rect.height == 8.0))
            .count()
    }

    #[test]
    fn test_annotations_draw_in_store_order() {
        let (store, ids) = store(3);
        let snapshot = store.snapshot();

        let list = OverlayPainter::default().paint(&frame(&snapshot));

        assert_eq!(list.image_order(), ids);
        assert_eq!(handle_count(&list), 0);
    }

    #[test]
    fn test_selected_draws_after_others_with_handles() {
        let (store, ids) = store(3);
        let snapshot = store.snapshot();
        let mut frame = frame(&snapshot);
        frame.selected = Some(ids[0]);

        let list = OverlayPainter::default().paint(&frame);

        assert_eq!(list.image_order(), vec![ids[1], ids[2], ids[0]]);
        assert_eq!(handle_count(&list), 8);
    }

    #[test]
    fn test_dragged_draws_last_at_preview_position() {
        let (store, ids) = store(3);
        let snapshot = store.snapshot();
        let session = DragSession {
            annotation_id: ids[1],
            original: store.get(ids[1]).unwrap().signature().clone(),
            grab_offset: DocPoint::new(5.0, 5.0),
            pointer: ScreenPoint::new(205.0, 305.0),
        };
        let mut frame = frame(&snapshot);
        frame.selected = Some(ids[2]);
        frame.drag = Some(&session);

        let list = OverlayPainter::default().paint(&frame);

        assert_eq!(list.image_order(), vec![ids[0], ids[2], ids[1]]);
        let last_image = list
            .primitives()
            .iter()
            .rev()
            .find_map(|p| match p {
                Primitive::Image { rect, opacity, .. } => Some((*rect, *opacity)),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_image, (Rect::new(200.0, 300.0, 40.0, 20.0), 0.8));
    }

    #[test]
    fn test_dragged_preview_is_snapped() {
        let (store, ids) = store(1);
        let snapshot = store.snapshot();
        let session = DragSession {
            annotation_id: ids[0],
            original: store.get(ids[0]).unwrap().signature().clone(),
            grab_offset: DocPoint::new(0.0, 0.0),
            pointer: ScreenPoint::new(109.0, 111.0),
        };
        let mut frame = frame(&snapshot);
        frame.drag = Some(&session);
        frame.snap = GridSnap::new(true, 20.0);

        let list = OverlayPainter::default().paint(&frame);

        assert!(list.primitives().contains(&Primitive::Image {
            rect: Rect::new(100.0, 120.0, 40.0, 20.0),
            annotation: ids[0],
            opacity: 0.8,
        }));
    }

    #[test]
    fn test_grid_draws_first() {
        let (store, _) = store(1);
        let snapshot = store.snapshot();
        let mut frame = frame(&snapshot);
        frame.show_grid = true;
        frame.page = PageSize::new(100.0, 60.0);
        frame.snap = GridSnap::new(false, 20.0);

        let list = OverlayPainter::default().paint(&frame);
        let lines = list.primitives().iter().take_while(|p| matches!(p, Primitive::Line { .. })).count();

        // Verticals at 20, 40, 60, 80; horizontals at 20, 40
        assert_eq!(lines, 6);
        assert!(matches!(list.primitives()[lines], Primitive::Rectangle { .. }));
    }

    #[test]
    fn test_geometry_follows_scale() {
        let (store, ids) = store(2);
        let snapshot = store.snapshot();
        let mut frame = frame(&snapshot);
        frame.mapper = CoordinateMapper::new(2.0, 1.0);

        let list = OverlayPainter::default().paint(&frame);

        assert!(list.primitives().contains(&Primitive::Image {
            rect: Rect::new(100.0, 20.0, 80.0, 40.0),
            annotation: ids[1],
            opacity: 1.0,
        }));
    }

    #[test]
    fn test_text_annotations_are_not_drawn() {
        let (mut store, ids) = store(1);
        let mut text = store.get(ids[0]).unwrap().signature().clone();
        text.kind = sigplace_core::SignatureKind::Text;
        store.add(text).unwrap();
        let snapshot = store.snapshot();

        let list = OverlayPainter::default().paint(&frame(&snapshot));

        assert_eq!(list.image_order(), ids);
    }

    #[test]
    fn test_undecodable_image_is_skipped_in_every_pass() {
        let good_url = encode_png_data_url(&RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))).unwrap();
        let mut store = AnnotationStore::new();
        let rect = DocRect::new(10.0, 10.0, 40.0, 20.0);
        let good = store.add(Signature::image(good_url, rect).unwrap()).unwrap();
        let bad_rect = rect.with_origin(DocPoint::new(100.0, 10.0));
        let bad = store.add(Signature::image("data:image/png;base64,!!!notpng", bad_rect).unwrap()).unwrap();
        let snapshot = store.snapshot();
        let mut images = ImageCache::new();
        images.sync(&snapshot);

        let mut frame = frame(&snapshot);
        frame.images = Some(&images);
        let list = OverlayPainter::default().paint(&frame);

        // Backdrop, image and border for the good one only
        assert_eq!(list.image_order(), vec![good]);
        assert_eq!(list.primitives().len(), 3);

        frame.selected = Some(bad);
        let list = OverlayPainter::default().paint(&frame);
        assert_eq!(list.image_order(), vec![good]);
        assert_eq!(handle_count(&list), 0);

        let session = DragSession {
            annotation_id: bad,
            original: store.get(bad).unwrap().signature().clone(),
            grab_offset: DocPoint::new(0.0, 0.0),
            pointer: ScreenPoint::new(300.0, 300.0),
        };
        frame.selected = None;
        frame.drag = Some(&session);
        let list = OverlayPainter::default().paint(&frame);
        assert_eq!(list.image_order(), vec![good]);
        assert_eq!(list.primitives().len(), 3);
    }
}
