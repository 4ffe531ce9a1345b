//! Render scheduling
//!
//! Decides when the page raster is re-rendered and makes sure only the
//! latest request can produce a surface:
//! - loading a new document renders immediately;
//! - zoom and viewport changes are debounced and coalesced;
//! - a render at the scale already on screen is skipped unless forced;
//! - starting a render cancels the one in flight;
//! - nothing starts or advances while a drag is active.
//!
//! The host drives it by calling [`RenderScheduler::poll`] once per frame
//! with the current time. Each poll advances the in-flight job by a bounded
//! number of bands.
//!
//! Pages are rasterized by the backend given to
//! [`RenderScheduler::with_backend`], or by [`default_backend`].

use crate::config::EditorConfig;
use crate::coords::effective_scale;
use sigplace_render::{
    default_backend, DecodeError, PageRenderer, PageSize, PdfPage, RasterBackend, RenderError,
    RenderJob, RenderProgress, RenderSurface,
};
use sigplace_scheduler::{Debouncer, TaskSlot};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Bands advanced per poll
const DEFAULT_STEPS_PER_POLL: u32 = 4;

/// Something the host should react to
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A render completed; this surface replaces the previous one
    SurfaceReady(Arc<RenderSurface>),
    /// Readiness changed; `false` after a failure or document change
    ReadyChanged(bool),
    /// Rendering failed; the message is user-facing
    Failed(String),
}

/// Result of [`RenderScheduler::load_document`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// New document decoded; a render has been requested
    Loaded(PageSize),
    /// Same document as before; the current surface is kept
    Unchanged(PageSize),
}

/// Schedules cancellable page renders for one document at a time
pub struct RenderScheduler {
    backend: Arc<dyn RasterBackend>,
    renderer: Option<PageRenderer>,
    document_key: Option<String>,
    slot: TaskSlot<RenderJob>,
    debounce: Debouncer<()>,
    immediate: Option<bool>,
    zoom: f32,
    container_width: Option<f32>,
    fallback_width: f32,
    device_pixel_ratio: f32,
    band_rows: u32,
    steps_per_poll: u32,
    last_rendered_scale: Option<f32>,
    surface: Option<Arc<RenderSurface>>,
    ready: bool,
    events: VecDeque<SchedulerEvent>,
}

impl RenderScheduler {
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_backend(config, default_backend())
    }

    /// Scheduler that rasterizes with `backend`
    pub fn with_backend(config: &EditorConfig, backend: Arc<dyn RasterBackend>) -> Self {
        Self {
            backend,
            renderer: None,
            document_key: None,
            slot: TaskSlot::new(),
            debounce: Debouncer::new(config.debounce()),
            immediate: None,
            zoom: 1.0,
            container_width: None,
            fallback_width: config.fallback_container_width,
            device_pixel_ratio: config.device_pixel_ratio,
            band_rows: config.band_rows,
            steps_per_poll: DEFAULT_STEPS_PER_POLL,
            last_rendered_scale: None,
            surface: None,
            ready: false,
            events: VecDeque::new(),
        }
    }

    /// Bands each poll may paint
    pub fn with_steps_per_poll(mut self, steps: u32) -> Self {
        self.steps_per_poll = steps.max(1);
        self
    }

    /// Decode a document and request its first render
    ///
    /// Loading the document that is already loaded keeps the current
    /// surface. A different document resets readiness and drops any
    /// pending or in-flight render of the old one.
    pub fn load_document(&mut self, key: &str, bytes: Vec<u8>) -> Result<LoadOutcome, DecodeError> {
        if self.document_key.as_deref() == Some(key) {
            if let Some(renderer) = &self.renderer {
                return Ok(LoadOutcome::Unchanged(renderer.intrinsic_size()));
            }
        }

        self.unload();
        self.document_key = Some(key.to_owned());

        let renderer = match PdfPage::from_bytes(bytes) {
            Ok(page) => {
                PageRenderer::new(page, Arc::clone(&self.backend)).with_band_rows(self.band_rows)
            }
            Err(err) => {
                log::warn!("failed to decode document {key}: {err}");
                self.fail(err.to_string());
                return Err(err);
            }
        };

        let size = renderer.intrinsic_size();
        self.renderer = Some(renderer);
        self.immediate = Some(true);
        log::debug!("document {key} loaded, {}x{}", size.width, size.height);
        Ok(LoadOutcome::Loaded(size))
    }

    /// Drop the current document and everything rendered for it
    pub fn unload(&mut self) {
        self.slot.cancel();
        self.debounce.cancel();
        self.immediate = None;
        self.renderer = None;
        self.document_key = None;
        self.surface = None;
        self.last_rendered_scale = None;
        self.set_ready(false);
    }

    /// Change the user zoom; the render is debounced
    pub fn set_zoom(&mut self, zoom: f32, now: Instant) {
        if zoom != self.zoom {
            self.zoom = zoom;
            self.debounce.trigger(now, ());
        }
    }

    /// Report the container width; the render is debounced
    pub fn set_container_width(&mut self, width: f32, now: Instant) {
        if self.container_width != Some(width) {
            self.container_width = Some(width);
            self.debounce.trigger(now, ());
        }
    }

    /// Change the device pixel ratio; re-renders on the next poll
    pub fn set_device_pixel_ratio(&mut self, ratio: f32) {
        if ratio != self.device_pixel_ratio {
            self.device_pixel_ratio = ratio;
            self.request_render(true);
        }
    }

    /// Request a render on the next poll, bypassing the debounce
    ///
    /// Unforced requests are skipped when the scale on screen already
    /// matches.
    pub fn request_render(&mut self, force: bool) {
        self.immediate = Some(self.immediate.unwrap_or(false) || force);
    }

    /// Start due renders and advance the in-flight one
    ///
    /// While `drag_active` nothing starts or advances; pending requests
    /// stay queued. Returns the events produced since the last poll.
    pub fn poll(&mut self, now: Instant, drag_active: bool) -> Vec<SchedulerEvent> {
        if !drag_active {
            // An immediate render already reflects the latest zoom and width
            let due = match self.immediate.take() {
                Some(force) => {
                    self.debounce.cancel();
                    Some(force)
                }
                None => self.debounce.poll(now).map(|()| false),
            };
            if let Some(force) = due {
                self.start_render(force);
            }
            self.advance();
        }
        self.events.drain(..).collect()
    }

    fn start_render(&mut self, force: bool) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        let scale = self.effective_scale();

        if !force {
            let in_flight = self.slot.get().map(RenderJob::scale);
            let on_screen = self.last_rendered_scale.filter(|_| !self.slot.is_occupied());
            if in_flight == Some(scale) || on_screen == Some(scale) {
                log::trace!("render at scale {scale:.3} skipped, already current");
                return;
            }
        }

        let dpr = self.device_pixel_ratio;
        match self.slot.start(|token| renderer.begin(scale, dpr, token)) {
            Ok(generation) => log::debug!("render {generation} started at scale {scale:.3}"),
            Err(err) => {
                log::warn!("failed to start render at scale {scale:.3}: {err}");
                self.fail(err.to_string());
            }
        }
    }

    fn advance(&mut self) {
        for _ in 0..self.steps_per_poll {
            let generation = self.slot.generation().unwrap_or_default();
            let Some(job) = self.slot.get_mut() else {
                return;
            };
            match job.step() {
                Ok(RenderProgress::Pending { .. }) => continue,
                Ok(RenderProgress::Complete(surface)) => {
                    self.slot.finish();
                    log::trace!("render {generation} published");
                    self.last_rendered_scale = Some(surface.scale());
                    let surface = Arc::new(surface);
                    self.surface = Some(Arc::clone(&surface));
                    self.events.push_back(SchedulerEvent::SurfaceReady(surface));
                    self.set_ready(true);
                    return;
                }
                Ok(RenderProgress::Cancelled) => {
                    self.slot.finish();
                    log::trace!("render {generation} dropped after cancel");
                    return;
                }
                Err(err) => {
                    self.slot.finish();
                    self.handle_render_error(err);
                    return;
                }
            }
        }
    }

    fn handle_render_error(&mut self, err: RenderError) {
        log::warn!("page render failed: {err}");
        self.fail(err.to_string());
    }

    fn fail(&mut self, message: String) {
        self.events.push_back(SchedulerEvent::Failed(message));
        self.ready = false;
        // Failure always reports not-ready, even if it already was
        self.events.push_back(SchedulerEvent::ReadyChanged(false));
    }

    fn set_ready(&mut self, ready: bool) {
        if self.ready != ready {
            self.ready = ready;
            self.events.push_back(SchedulerEvent::ReadyChanged(ready));
        }
    }

    /// Scale the next render would use
    pub fn effective_scale(&self) -> f32 {
        let intrinsic = self.intrinsic_size().map_or(0.0, |size| size.width);
        effective_scale(self.container_width.unwrap_or(self.fallback_width), intrinsic, self.zoom)
    }

    pub fn intrinsic_size(&self) -> Option<PageSize> {
        self.renderer.as_ref().map(PageRenderer::intrinsic_size)
    }

    /// Most recently completed surface
    pub fn surface(&self) -> Option<&Arc<RenderSurface>> {
        self.surface.as_ref()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    /// Whether a usable surface exists for the current document
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_rendering(&self) -> bool {
        self.slot.is_occupied()
    }

    /// Whether a render is queued but not yet started
    pub fn has_pending(&self) -> bool {
        self.immediate.is_some() || self.debounce.is_pending()
    }

    pub fn document_key(&self) -> Option<&str> {
        self.document_key.as_deref()
    }
}
