//! Cancellable page render jobs
//!
//! A [`RenderJob`] rasterizes one page at one scale into a private staging
//! buffer, a band of rows per [`RenderJob::step`]. The cancellation token is
//! checked before every band, so a superseded job stops without painting
//! further. The staging buffer is only handed out as a [`RenderSurface`]
//! once every row is painted.

use crate::backend::{default_backend, BandPainter, RasterBackend};
use crate::pdf::{DecodeError, PageSize, PdfPage, RenderError};
use crate::surface::{surface_dimensions, RenderSurface};
use image::RgbaImage;
use sigplace_scheduler::CancellationToken;
use std::sync::Arc;

/// Device rows painted per step unless configured otherwise
pub const DEFAULT_BAND_ROWS: u32 = 64;

/// Outcome of advancing a render job
#[derive(Debug)]
pub enum RenderProgress {
    /// More bands remain
    Pending { rows_done: u32, rows_total: u32 },
    /// Every row is painted
    Complete(RenderSurface),
    /// The job was superseded; nothing is produced
    Cancelled,
}

/// Renderer for the first page of one decoded document
#[derive(Clone)]
pub struct PageRenderer {
    page: PdfPage,
    backend: Arc<dyn RasterBackend>,
    band_rows: u32,
}

impl PageRenderer {
    /// Decode document bytes with [`default_backend`]
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, DecodeError> {
        Ok(Self::new(PdfPage::from_bytes(bytes)?, default_backend()))
    }

    pub fn new(page: PdfPage, backend: Arc<dyn RasterBackend>) -> Self {
        Self { page, backend, band_rows: DEFAULT_BAND_ROWS }
    }

    /// Set how many device rows each step paints
    pub fn with_band_rows(mut self, band_rows: u32) -> Self {
        self.band_rows = band_rows.max(1);
        self
    }

    /// Intrinsic page size at scale 1
    pub fn intrinsic_size(&self) -> PageSize {
        self.page.size()
    }

    pub fn page(&self) -> &PdfPage {
        &self.page
    }

    /// Start rendering at `scale`, checking `token` at each band
    pub fn begin(
        &self,
        scale: f32,
        device_pixel_ratio: f32,
        token: CancellationToken,
    ) -> Result<RenderJob, RenderError> {
        let intrinsic = self.page.size();
        let (width, height) = surface_dimensions(intrinsic, scale, device_pixel_ratio)?;
        let painter = self.backend.begin(&self.page, width, height)?;

        log::debug!("render started at scale {scale:.3} ({width}x{height} device px)");

        Ok(RenderJob {
            intrinsic,
            scale,
            device_pixel_ratio,
            staging: Some(RgbaImage::new(width, height)),
            painter,
            next_row: 0,
            band_rows: self.band_rows,
            token,
        })
    }
}

/// An in-flight page render
pub struct RenderJob {
    intrinsic: PageSize,
    scale: f32,
    device_pixel_ratio: f32,
    staging: Option<RgbaImage>,
    painter: Box<dyn BandPainter>,
    next_row: u32,
    band_rows: u32,
    token: CancellationToken,
}

impl RenderJob {
    /// Scale this job renders at
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Paint the next band
    ///
    /// After the job has completed or been cancelled, further calls return
    /// `Cancelled`.
    pub fn step(&mut self) -> Result<RenderProgress, RenderError> {
        if self.token.is_cancelled() {
            self.staging = None;
            return Ok(RenderProgress::Cancelled);
        }

        let Some(staging) = self.staging.as_mut() else {
            return Ok(RenderProgress::Cancelled);
        };

        let rows_total = staging.height();
        let end = (self.next_row + self.band_rows).min(rows_total);
        if let Err(err) = self.painter.paint(staging, self.next_row..end) {
            self.staging = None;
            return Err(err);
        }
        self.next_row = end;

        if self.next_row < rows_total {
            return Ok(RenderProgress::Pending { rows_done: self.next_row, rows_total });
        }

        match self.staging.take() {
            Some(pixels) => {
                log::debug!("render complete at scale {:.3}", self.scale);
                Ok(RenderProgress::Complete(RenderSurface::new(
                    pixels,
                    self.intrinsic,
                    self.scale,
                    self.device_pixel_ratio,
                )))
            }
            None => Ok(RenderProgress::Cancelled),
        }
    }

    /// Step until the job completes or is cancelled
    pub fn finish(mut self) -> Result<RenderProgress, RenderError> {
        loop {
            match self.step()? {
                RenderProgress::Pending { .. } => continue,
                done => return Ok(done),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blank_pdf;

    fn renderer(width: f32, height: f32) -> PageRenderer {
        PageRenderer::from_bytes(blank_pdf(width, height).unwrap()).unwrap()
    }

    #[test]
    fn test_surface_matches_requested_scale() {
        let job = renderer(800.0, 600.0).begin(0.5, 2.0, CancellationToken::new()).unwrap();

        let RenderProgress::Complete(surface) = job.finish().unwrap() else {
            panic!("expected a completed surface");
        };

        assert_eq!(surface.device_size(), (800, 600));
        assert_eq!(surface.intrinsic(), PageSize::new(800.0, 600.0));
        assert_eq!(surface.scale(), 0.5);
        assert_eq!(surface.screen_size(), (400.0, 300.0));
    }

    #[test]
    fn test_step_paints_in_bands() {
        let mut job = renderer(100.0, 100.0)
            .with_band_rows(40)
            .begin(1.0, 1.0, CancellationToken::new())
            .unwrap();

        assert!(matches!(
            job.step().unwrap(),
            RenderProgress::Pending { rows_done: 40, rows_total: 100 }
        ));
        assert!(matches!(
            job.step().unwrap(),
            RenderProgress::Pending { rows_done: 80, rows_total: 100 }
        ));
        assert!(matches!(job.step().unwrap(), RenderProgress::Complete(_)));
        assert!(matches!(job.step().unwrap(), RenderProgress::Cancelled));
    }

    #[test]
    fn test_cancel_mid_render_stops_without_surface() {
        let token = CancellationToken::new();
        let mut job =
            renderer(100.0, 100.0).with_band_rows(10).begin(1.0, 1.0, token.clone()).unwrap();

        assert!(matches!(job.step().unwrap(), RenderProgress::Pending { .. }));
        token.cancel();

        assert!(job.is_cancelled());
        assert!(matches!(job.step().unwrap(), RenderProgress::Cancelled));
    }

    #[test]
    fn test_cancelled_before_start_never_paints() {
        let token = CancellationToken::new();
        token.cancel();
        let job = renderer(100.0, 100.0).begin(1.0, 1.0, token).unwrap();

        assert!(matches!(job.finish().unwrap(), RenderProgress::Cancelled));
    }

    #[test]
    fn test_invalid_scale_fails_to_begin() {
        let err = renderer(100.0, 100.0).begin(0.0, 1.0, CancellationToken::new()).err();
        assert!(matches!(err, Some(RenderError::InvalidScale(_))));
    }

    #[test]
    fn test_completed_surface_is_fully_painted() {
        let job = renderer(30.0, 30.0)
            .with_band_rows(7)
            .begin(1.0, 1.0, CancellationToken::new())
            .unwrap();

        let RenderProgress::Complete(surface) = job.finish().unwrap() else {
            panic!("expected a completed surface");
        };

        assert!(surface.pixels().pixels().all(|pixel| pixel.0[3] == 255));
    }
}
