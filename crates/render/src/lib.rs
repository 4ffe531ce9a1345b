//! Sigplace Render Library
//!
//! Page renderer for the signature placement engine: decodes PDF bytes,
//! reports the first page's intrinsic size, and rasterizes it into a
//! pixel surface in cancellable row bands.
//!
//! Pages are rasterized by PDFium when the `pdfium` feature is enabled and
//! the library can be bound, and by the built-in [`ContentBackend`]
//! otherwise.

pub mod backend;
pub mod content;
pub mod fixtures;
pub mod job;
pub mod pdf;
pub mod surface;

pub use backend::{default_backend, BandPainter, RasterBackend};
pub use content::ContentBackend;
pub use job::{PageRenderer, RenderJob, RenderProgress, DEFAULT_BAND_ROWS};
pub use pdf::{DecodeError, MediaBox, PageSize, PdfPage, RenderError};
pub use surface::{surface_dimensions, RenderSurface, MAX_SURFACE_DIMENSION};

#[cfg(feature = "pdfium")]
pub use backend::pdfium_backend::PdfiumBackend;
