//! Built-in vector backend
//!
//! Paints the paper, then fills the paths drawn by the first page's content
//! stream. Supported: path construction (`m l c v y re h`), fills with the
//! nonzero or even-odd rule, `q`/`Q`/`cm`, and device grey, RGB and CMYK
//! fill colours. Strokes, text, images and clipping are not drawn.

use crate::backend::{paper_pixel, BandPainter, RasterBackend};
use crate::pdf::{PdfPage, RenderError};
use image::{Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use std::ops::Range;

/// Line segments per flattened Bézier curve
const CURVE_SEGMENTS: u32 = 16;

/// Deepest `q` nesting kept
const MAX_STATE_DEPTH: usize = 64;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

type Point = (f32, f32);

/// Backend that fills the page's vector paths on top of the paper
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentBackend;

impl RasterBackend for ContentBackend {
    fn begin(
        &self,
        page: &PdfPage,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn BandPainter>, RenderError> {
        let operations = page_operations(page).unwrap_or_else(|err| {
            log::warn!("page content skipped: {err}");
            Vec::new()
        });
        let fills = interpret(&operations, device_matrix(page, width, height));
        log::trace!("{} filled path(s) from {} operation(s)", fills.len(), operations.len());

        Ok(Box::new(FillPainter { width, height, fills }))
    }
}

fn page_operations(page: &PdfPage) -> Result<Vec<Operation>, lopdf::Error> {
    let doc = Document::load_mem(page.bytes())?;
    let Some(page_id) = doc.get_pages().values().next().copied() else {
        return Ok(Vec::new());
    };
    let content = doc.get_page_content(page_id)?;
    Ok(Content::decode(&content)?.operations)
}

/// Affine transform `[a b c d e f]` as PDF writes it
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Transform applying `self` first, then `next`
    fn then(self, next: Matrix) -> Matrix {
        Matrix {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> Point {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }
}

/// PDF user space to device pixels: flip to a top-left origin, apply the
/// page rotation, then scale to the surface
fn device_matrix(page: &PdfPage, width: u32, height: u32) -> Matrix {
    let media_box = page.media_box();
    let unrotated = media_box.size();
    let flip = Matrix::new(1.0, 0.0, 0.0, -1.0, -media_box.left, media_box.top);

    let (w, h) = (unrotated.width, unrotated.height);
    let rotate = match page.rotation() {
        90 => Matrix::new(0.0, 1.0, -1.0, 0.0, h, 0.0),
        180 => Matrix::new(-1.0, 0.0, 0.0, -1.0, w, h),
        270 => Matrix::new(0.0, -1.0, 1.0, 0.0, 0.0, w),
        _ => Matrix::IDENTITY,
    };

    let size = page.size();
    let scale =
        Matrix::new(width as f32 / size.width, 0.0, 0.0, height as f32 / size.height, 0.0, 0.0);

    flip.then(rotate).then(scale)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FillRule {
    NonZero,
    EvenOdd,
}

/// Non-horizontal path edge in device space, `top < bottom`
#[derive(Debug, Clone, Copy)]
struct Edge {
    top: Point,
    bottom: Point,
    winding: i32,
}

impl Edge {
    fn new(from: Point, to: Point) -> Option<Self> {
        let finite = from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite();
        if !finite || from.1 == to.1 {
            return None;
        }
        Some(if from.1 < to.1 {
            Self { top: from, bottom: to, winding: 1 }
        } else {
            Self { top: to, bottom: from, winding: -1 }
        })
    }

    fn x_at(&self, y: f32) -> f32 {
        let t = (y - self.top.1) / (self.bottom.1 - self.top.1);
        self.top.0 + t * (self.bottom.0 - self.top.0)
    }
}

/// One painted path, ready for scan conversion
#[derive(Debug, Clone)]
struct Fill {
    edges: Vec<Edge>,
    rule: FillRule,
    color: Rgba<u8>,
    top: f32,
    bottom: f32,
}

impl Fill {
    /// Every subpath is closed implicitly
    fn new(subpaths: &[Vec<Point>], rule: FillRule, color: Rgba<u8>) -> Option<Self> {
        let edges: Vec<Edge> = subpaths
            .iter()
            .filter(|points| points.len() > 1)
            .flat_map(|points| {
                points
                    .iter()
                    .zip(points.iter().cycle().skip(1))
                    .filter_map(|(from, to)| Edge::new(*from, *to))
            })
            .collect();
        if edges.is_empty() {
            return None;
        }

        let top = edges.iter().map(|edge| edge.top.1).fold(f32::INFINITY, f32::min);
        let bottom = edges.iter().map(|edge| edge.bottom.1).fold(f32::NEG_INFINITY, f32::max);
        Some(Self { edges, rule, color, top, bottom })
    }

    /// Covered spans of the scanline at `y`, as `[start, end)` in device x
    fn spans(&self, y: f32) -> Vec<(f32, f32)> {
        let mut crossings: Vec<(f32, i32)> = self
            .edges
            .iter()
            .filter(|edge| edge.top.1 <= y && y < edge.bottom.1)
            .map(|edge| (edge.x_at(y), edge.winding))
            .collect();
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut spans = Vec::new();
        let mut winding = 0;
        for pair in crossings.windows(2) {
            let (x, direction) = pair[0];
            winding += match self.rule {
                FillRule::NonZero => direction,
                FillRule::EvenOdd => 1,
            };
            let inside = match self.rule {
                FillRule::NonZero => winding != 0,
                FillRule::EvenOdd => winding % 2 == 1,
            };
            if inside {
                spans.push((x, pair[1].0));
            }
        }
        spans
    }
}

/// Path under construction, in device space
#[derive(Debug, Default)]
struct PathBuilder {
    subpaths: Vec<Vec<Point>>,
}

impl PathBuilder {
    fn current(&self) -> Option<Point> {
        self.subpaths.last().and_then(|points| points.last().copied())
    }

    fn move_to(&mut self, point: Point) {
        self.subpaths.push(vec![point]);
    }

    fn line_to(&mut self, point: Point) {
        match self.subpaths.last_mut() {
            Some(points) => points.push(point),
            None => self.subpaths.push(vec![point]),
        }
    }

    /// Cubic from the current point; `control1` defaults to the current point
    fn curve_to(&mut self, control1: Option<Point>, control2: Point, end: Point) {
        let Some(start) = self.current() else {
            return;
        };
        let control1 = control1.unwrap_or(start);
        for step in 1..=CURVE_SEGMENTS {
            let t = step as f32 / CURVE_SEGMENTS as f32;
            self.line_to(cubic(start, control1, control2, end, t));
        }
    }

    fn rect(&mut self, corners: [Point; 4]) {
        self.subpaths.push(corners.to_vec());
        self.subpaths.push(vec![corners[0]]);
    }

    /// Close the current subpath; the next segment starts from its first point
    fn close(&mut self) {
        let start = self.subpaths.last().filter(|points| points.len() > 1).map(|points| points[0]);
        if let Some(start) = start {
            self.subpaths.push(vec![start]);
        }
    }

    fn take_fill(&mut self, rule: FillRule, color: Rgba<u8>) -> Option<Fill> {
        let subpaths = std::mem::take(&mut self.subpaths);
        Fill::new(&subpaths, rule, color)
    }

    fn clear(&mut self) {
        self.subpaths.clear();
    }
}

fn cubic(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let u = 1.0 - t;
    let (b0, b1, b2, b3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    (
        b0 * p0.0 + b1 * p1.0 + b2 * p2.0 + b3 * p3.0,
        b0 * p0.1 + b1 * p1.1 + b2 * p2.1 + b3 * p3.1,
    )
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgba<u8>,
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn gray(value: f32) -> Rgba<u8> {
    let level = channel(value);
    Rgba([level, level, level, 255])
}

fn rgb(r: f32, g: f32, b: f32) -> Rgba<u8> {
    Rgba([channel(r), channel(g), channel(b), 255])
}

fn cmyk(c: f32, m: f32, y: f32, k: f32) -> Rgba<u8> {
    let k = k.clamp(0.0, 1.0);
    rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
}

/// Operands as numbers; empty when any operand is not numeric
fn numbers(operands: &[Object]) -> Vec<f32> {
    operands
        .iter()
        .map(|operand| operand.as_float().ok())
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

/// Run the content stream and collect its filled paths in paint order
fn interpret(operations: &[Operation], device: Matrix) -> Vec<Fill> {
    let mut state = GraphicsState { ctm: device, fill: BLACK };
    let mut saved: Vec<GraphicsState> = Vec::new();
    let mut path = PathBuilder::default();
    let mut fills = Vec::new();

    for operation in operations {
        let operands = numbers(&operation.operands);
        let ctm = state.ctm;
        match (operation.operator.as_str(), operands.as_slice()) {
            ("q", _) => {
                if saved.len() < MAX_STATE_DEPTH {
                    saved.push(state);
                }
            }
            ("Q", _) => {
                if let Some(previous) = saved.pop() {
                    state = previous;
                }
            }
            ("cm", &[a, b, c, d, e, f]) => state.ctm = Matrix::new(a, b, c, d, e, f).then(ctm),

            ("m", &[x, y]) => path.move_to(ctm.apply(x, y)),
            ("l", &[x, y]) => path.line_to(ctm.apply(x, y)),
            ("c", &[x1, y1, x2, y2, x3, y3]) => {
                path.curve_to(Some(ctm.apply(x1, y1)), ctm.apply(x2, y2), ctm.apply(x3, y3))
            }
            ("v", &[x2, y2, x3, y3]) => path.curve_to(None, ctm.apply(x2, y2), ctm.apply(x3, y3)),
            ("y", &[x1, y1, x3, y3]) => {
                let end = ctm.apply(x3, y3);
                path.curve_to(Some(ctm.apply(x1, y1)), end, end)
            }
            ("re", &[x, y, w, h]) => path.rect([
                ctm.apply(x, y),
                ctm.apply(x + w, y),
                ctm.apply(x + w, y + h),
                ctm.apply(x, y + h),
            ]),
            ("h", _) => path.close(),

            ("f" | "F" | "B" | "b", _) => fills.extend(path.take_fill(FillRule::NonZero, state.fill)),
            ("f*" | "B*" | "b*", _) => fills.extend(path.take_fill(FillRule::EvenOdd, state.fill)),
            ("n" | "S" | "s", _) => path.clear(),

            ("g", &[level]) | ("sc" | "scn", &[level]) => state.fill = gray(level),
            ("rg", &[r, g, b]) | ("sc" | "scn", &[r, g, b]) => state.fill = rgb(r, g, b),
            ("k", &[c, m, y, k]) | ("sc" | "scn", &[c, m, y, k]) => state.fill = cmyk(c, m, y, k),
            ("cs", _) => state.fill = BLACK,
            _ => {}
        }
    }
    fills
}

struct FillPainter {
    width: u32,
    height: u32,
    fills: Vec<Fill>,
}

impl BandPainter for FillPainter {
    fn paint(&mut self, target: &mut RgbaImage, rows: Range<u32>) -> Result<(), RenderError> {
        for y in rows {
            for x in 0..self.width {
                target.put_pixel(x, y, paper_pixel(x, y, self.width, self.height));
            }

            // Sample at pixel centres
            let sample = y as f32 + 0.5;
            for fill in self.fills.iter().filter(|fill| fill.top <= sample && sample < fill.bottom) {
                for (start, end) in fill.spans(sample) {
                    let first = (start - 0.5).ceil().max(0.0) as u32;
                    let last = ((end - 0.5).ceil().max(0.0) as u32).min(self.width);
                    for x in first..last {
                        target.put_pixel(x, y, fill.color);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PAGE_EDGE, PAPER};
    use crate::fixtures::{blank_pdf, PdfFixture};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn render(fixture: PdfFixture, width: u32, height: u32) -> RgbaImage {
        let page = PdfPage::from_bytes(fixture.build().unwrap()).unwrap();
        let mut target = RgbaImage::new(width, height);
        let mut painter = ContentBackend.begin(&page, width, height).unwrap();
        painter.paint(&mut target, 0..height).unwrap();
        target
    }

    #[test]
    fn test_full_page_fill() {
        let image = render(PdfFixture::new(200.0, 200.0).content("0 0 0 rg 0 0 200 200 re f"), 200, 200);

        assert_eq!(image.get_pixel(100, 100), &BLACK);
        assert_eq!(image.get_pixel(0, 0), &BLACK);
        assert_eq!(image.get_pixel(199, 199), &BLACK);
    }

    #[test]
    fn test_pdf_origin_is_bottom_left() {
        let image = render(PdfFixture::new(100.0, 100.0).content("1 0 0 rg 0 0 50 50 re f"), 100, 100);

        assert_eq!(image.get_pixel(25, 75), &RED);
        assert_eq!(image.get_pixel(75, 25), &PAPER);
        assert_eq!(image.get_pixel(49, 50), &RED);
        assert_eq!(image.get_pixel(50, 50), &PAPER);
    }

    #[test]
    fn test_fill_scales_with_surface() {
        let image = render(PdfFixture::new(100.0, 100.0).content("1 0 0 rg 0 0 50 50 re f"), 200, 200);

        assert_eq!(image.get_pixel(99, 100), &RED);
        assert_eq!(image.get_pixel(100, 100), &PAPER);
    }

    #[test]
    fn test_transform_is_restored_by_state_stack() {
        let content = "q 2 0 0 2 0 0 cm 0 0 1 rg 0 0 10 10 re f Q 0 g 90 90 10 10 re f";
        let image = render(PdfFixture::new(100.0, 100.0).content(content), 100, 100);

        assert_eq!(image.get_pixel(15, 85), &BLUE);
        assert_eq!(image.get_pixel(25, 85), &PAPER);
        assert_eq!(image.get_pixel(95, 5), &BLACK);
    }

    #[test]
    fn test_even_odd_leaves_hole() {
        let rects = "0 g 0 0 100 100 re 25 25 50 50 re";

        let even_odd = render(PdfFixture::new(100.0, 100.0).content(format!("{rects} f*")), 100, 100);
        assert_eq!(even_odd.get_pixel(10, 10), &BLACK);
        assert_eq!(even_odd.get_pixel(50, 50), &PAPER);

        let nonzero = render(PdfFixture::new(100.0, 100.0).content(format!("{rects} f")), 100, 100);
        assert_eq!(nonzero.get_pixel(50, 50), &BLACK);
    }

    #[test]
    fn test_curves_are_flattened() {
        let content = "0 g 50 0 m 100 0 100 100 50 100 c 0 100 0 0 50 0 c h f";
        let image = render(PdfFixture::new(100.0, 100.0).content(content), 100, 100);

        assert_eq!(image.get_pixel(50, 50), &BLACK);
        assert_eq!(image.get_pixel(3, 3), &PAPER);
        assert_eq!(image.get_pixel(96, 96), &PAPER);
    }

    #[test]
    fn test_rotation_moves_content() {
        // Bottom-left corner of the unrotated page ends up top-left
        let content = "0 g 0 0 10 10 re f";
        let image = render(PdfFixture::new(200.0, 100.0).rotate(90).content(content), 100, 200);

        assert_eq!(image.get_pixel(5, 5), &BLACK);
        assert_eq!(image.get_pixel(95, 195), &PAPER);
    }

    #[test]
    fn test_cmyk_and_gray_colors() {
        let content = "0 1 1 0 k 0 0 50 100 re f 0.5 g 50 0 50 100 re f";
        let image = render(PdfFixture::new(100.0, 100.0).content(content), 100, 100);

        assert_eq!(image.get_pixel(25, 50), &RED);
        assert_eq!(image.get_pixel(75, 50), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn test_strokes_and_unpainted_paths_are_skipped() {
        let content = "0 g 10 10 80 80 re S 20 20 60 60 re n 30 30 40 40 re";
        let image = render(PdfFixture::new(100.0, 100.0).content(content), 100, 100);

        assert!(image.pixels().all(|pixel| *pixel == PAPER || *pixel == PAGE_EDGE));
    }

    #[test]
    fn test_blank_page_is_paper_with_edge() {
        let page = PdfPage::from_bytes(blank_pdf(100.0, 50.0).unwrap()).unwrap();
        let mut target = RgbaImage::new(10, 10);
        ContentBackend.begin(&page, 10, 10).unwrap().paint(&mut target, 0..10).unwrap();

        assert_eq!(target.get_pixel(0, 5), &PAGE_EDGE);
        assert_eq!(target.get_pixel(5, 5), &PAPER);
    }

    #[test]
    fn test_only_requested_rows_are_touched() {
        let fixture = PdfFixture::new(10.0, 10.0).content("0 g 0 0 10 10 re f");
        let page = PdfPage::from_bytes(fixture.build().unwrap()).unwrap();
        let mut target = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));

        ContentBackend.begin(&page, 10, 10).unwrap().paint(&mut target, 2..4).unwrap();

        assert_eq!(target.get_pixel(5, 1), &Rgba([0, 0, 0, 0]));
        assert_eq!(target.get_pixel(5, 2), &BLACK);
        assert_eq!(target.get_pixel(5, 3), &BLACK);
        assert_eq!(target.get_pixel(5, 4), &Rgba([0, 0, 0, 0]));
    }
}
