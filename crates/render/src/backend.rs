//! Raster backends
//!
//! A backend turns a decoded page into pixels. Painting happens in row
//! bands so the render job can check its cancellation token between bands;
//! a backend that needs a full-page bitmap up front does that work in
//! [`RasterBackend::begin`] and only copies rows afterwards.

use crate::content::ContentBackend;
use crate::pdf::{PdfPage, RenderError};
use image::{Rgba, RgbaImage};
use std::ops::Range;
use std::sync::Arc;

/// Paper colour under the page content
pub(crate) const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Hairline page border
pub(crate) const PAGE_EDGE: Rgba<u8> = Rgba([220, 220, 220, 255]);

/// Paints one render's rows into a staging buffer
pub trait BandPainter {
    /// Paint device rows `rows` into `target`
    ///
    /// `target` has the full surface dimensions; rows outside `rows` must
    /// not be touched.
    fn paint(&mut self, target: &mut RgbaImage, rows: Range<u32>) -> Result<(), RenderError>;
}

/// Factory for per-render band painters
pub trait RasterBackend {
    /// Prepare to paint `page` into a `width` x `height` device-pixel surface
    fn begin(
        &self,
        page: &PdfPage,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn BandPainter>, RenderError>;
}

/// Backend used when the host does not pick one
///
/// PDFium when built with the `pdfium` feature and the library binds,
/// otherwise the built-in [`ContentBackend`].
pub fn default_backend() -> Arc<dyn RasterBackend> {
    match bind_pdfium() {
        Some(backend) => backend,
        None => Arc::new(ContentBackend),
    }
}

#[cfg(feature = "pdfium")]
fn bind_pdfium() -> Option<Arc<dyn RasterBackend>> {
    let backend: Arc<dyn RasterBackend> = pdfium_backend::PdfiumBackend::shared()?;
    Some(backend)
}

#[cfg(not(feature = "pdfium"))]
fn bind_pdfium() -> Option<Arc<dyn RasterBackend>> {
    None
}

/// Paper pixel at `(x, y)` of a `width` x `height` surface
pub(crate) fn paper_pixel(x: u32, y: u32, width: u32, height: u32) -> Rgba<u8> {
    let draw_edge = width >= 4 && height >= 4;
    let edge = draw_edge && (x == 0 || y == 0 || x == width - 1 || y == height - 1);
    if edge {
        PAGE_EDGE
    } else {
        PAPER
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    use super::*;
    use pdfium_render::prelude::*;
    use std::sync::OnceLock;

    static SHARED: OnceLock<Option<Arc<PdfiumBackend>>> = OnceLock::new();

    /// Content-rendering backend backed by the PDFium library
    pub struct PdfiumBackend {
        pdfium: Pdfium,
    }

    impl PdfiumBackend {
        /// Bind PDFium
        ///
        /// Search order:
        /// 1. Executable's directory
        /// 2. Current working directory
        /// 3. System library paths
        pub fn bind() -> Result<Self, RenderError> {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

            if let Some(ref dir) = exe_dir {
                if let Ok(bindings) =
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                {
                    return Ok(Self { pdfium: Pdfium::new(bindings) });
                }
            }

            let bindings =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                    .or_else(|_| Pdfium::bind_to_system_library())
                    .map_err(|err| {
                        RenderError::Backend(format!("failed to bind pdfium: {err}"))
                    })?;
            Ok(Self { pdfium: Pdfium::new(bindings) })
        }

        /// Process-wide instance, bound on first use
        ///
        /// `None` when the library cannot be bound; the failure is logged
        /// once.
        pub fn shared() -> Option<Arc<Self>> {
            SHARED
                .get_or_init(|| match Self::bind() {
                    Ok(backend) => {
                        log::info!("rendering pages with pdfium");
                        Some(Arc::new(backend))
                    }
                    Err(err) => {
                        log::warn!("{err}; falling back to the built-in renderer");
                        None
                    }
                })
                .clone()
        }
    }

    struct BitmapPainter {
        bitmap: RgbaImage,
    }

    impl RasterBackend for PdfiumBackend {
        fn begin(
            &self,
            page: &PdfPage,
            width: u32,
            height: u32,
        ) -> Result<Box<dyn BandPainter>, RenderError> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(page.bytes(), None)
                .map_err(|err| RenderError::Backend(err.to_string()))?;
            let first = document
                .pages()
                .get(0)
                .map_err(|err| RenderError::Backend(err.to_string()))?;

            let config = PdfRenderConfig::new()
                .set_target_width(width as i32)
                .set_target_height(height as i32);
            let rendered = first
                .render_with_config(&config)
                .map_err(|err| RenderError::Backend(err.to_string()))?;

            let bitmap = RgbaImage::from_raw(width, height, rendered.as_rgba_bytes().to_vec())
                .ok_or_else(|| RenderError::Backend("pdfium bitmap size mismatch".to_owned()))?;

            Ok(Box::new(BitmapPainter { bitmap }))
        }
    }

    impl BandPainter for BitmapPainter {
        fn paint(&mut self, target: &mut RgbaImage, rows: Range<u32>) -> Result<(), RenderError> {
            for y in rows {
                for x in 0..self.bitmap.width() {
                    target.put_pixel(x, y, *self.bitmap.get_pixel(x, y));
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_has_hairline_edge() {
        assert_eq!(paper_pixel(0, 5, 10, 10), PAGE_EDGE);
        assert_eq!(paper_pixel(9, 5, 10, 10), PAGE_EDGE);
        assert_eq!(paper_pixel(5, 0, 10, 10), PAGE_EDGE);
        assert_eq!(paper_pixel(5, 9, 10, 10), PAGE_EDGE);
        assert_eq!(paper_pixel(5, 5, 10, 10), PAPER);
    }

    #[test]
    fn test_tiny_surfaces_have_no_edge() {
        assert_eq!(paper_pixel(0, 0, 3, 3), PAPER);
    }

    #[cfg(not(feature = "pdfium"))]
    #[test]
    fn test_default_backend_paints_content() {
        use crate::fixtures::PdfFixture;

        let bytes = PdfFixture::new(20.0, 20.0).content("0 0 0 rg 0 0 20 20 re f").build().unwrap();
        let page = PdfPage::from_bytes(bytes).unwrap();
        let mut target = RgbaImage::new(20, 20);

        default_backend().begin(&page, 20, 20).unwrap().paint(&mut target, 0..20).unwrap();

        assert_eq!(target.get_pixel(10, 10), &Rgba([0, 0, 0, 255]));
    }
}
