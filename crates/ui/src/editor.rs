//! Placement editor session
//!
//! [`PlacementEditor`] is what a host embeds. It owns the annotation store,
//! the drag controller, the render scheduler, and both compositor layers.
//! The host forwards pointer and viewport events and calls
//! [`PlacementEditor::frame`] from its frame callback; everything runs on
//! that one thread.
//!
//! Pointer positions are client-space; the editor subtracts the surface
//! origin reported through [`PlacementEditor::set_surface_origin`].

use crate::compositor::{Compositor, LayerChanges, OverlayKey};
use crate::images::ImageCache;
use crate::overlay::{OverlayFrame, OverlayPainter, OverlayStyle};
use crate::scene::DisplayList;
use image::RgbaImage;
use sigplace_core::{
    clamp_origin, outgoing_signatures, AnnotationId, AnnotationStore, CoordinateMapper, Document,
    DocumentSource, DragCommit, DragController, EditorConfig, EditorError, EditorResult, GridSnap,
    PageSize, RenderScheduler, SchedulerEvent, ScreenPoint, Signature, SignatureSink,
};
use sigplace_render::{default_backend, RasterBackend};
use std::sync::Arc;
use std::time::Instant;

/// What the viewer is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    /// No document, or the first render has not completed
    Loading,
    /// A page surface is on screen and editing is enabled
    Ready,
    /// The document is not a PDF
    CannotPreview { mimetype: String },
    /// The bytes could not be decoded or rendered
    CannotRender(String),
    /// The bytes could not be fetched
    FetchFailed(String),
}

type ReadyCallback = Box<dyn FnMut(bool)>;
type SignaturesCallback = Box<dyn FnMut(&[Signature])>;

/// Interactive signature placement over one rendered PDF page
pub struct PlacementEditor {
    config: EditorConfig,
    document: Option<Document>,
    store: AnnotationStore,
    drag: DragController,
    scheduler: RenderScheduler,
    painter: OverlayPainter,
    images: ImageCache,
    images_revision: Option<u64>,
    compositor: Compositor,
    state: ViewerState,
    surface_origin: ScreenPoint,
    show_grid: bool,
    snap_to_grid: bool,
    clamp_pending: bool,
    on_ready: Option<ReadyCallback>,
    on_signatures_changed: Option<SignaturesCallback>,
}

impl PlacementEditor {
    /// Editor rendering pages with [`default_backend`]
    pub fn new(config: EditorConfig) -> Self {
        Self::with_backend(config, default_backend())
    }

    /// Editor rendering pages with `backend`
    pub fn with_backend(config: EditorConfig, backend: Arc<dyn RasterBackend>) -> Self {
        Self {
            scheduler: RenderScheduler::with_backend(&config, backend),
            painter: OverlayPainter::new(OverlayStyle::from_config(&config)),
            show_grid: config.show_grid,
            snap_to_grid: config.snap_to_grid,
            config,
            document: None,
            store: AnnotationStore::new(),
            drag: DragController::new(),
            images: ImageCache::new(),
            images_revision: None,
            compositor: Compositor::new(),
            state: ViewerState::Loading,
            surface_origin: ScreenPoint::default(),
            clamp_pending: false,
            on_ready: None,
            on_signatures_changed: None,
        }
    }

    /// Called with `true` once a page surface is usable, `false` on failure
    pub fn on_ready(&mut self, callback: impl FnMut(bool) + 'static) {
        self.on_ready = Some(Box::new(callback));
    }

    /// Called after every change to the placed signatures
    pub fn on_signatures_changed(&mut self, callback: impl FnMut(&[Signature]) + 'static) {
        self.on_signatures_changed = Some(Box::new(callback));
    }

    /// Fetch and open a document
    pub fn open_document(
        &mut self,
        document: Document,
        source: &dyn DocumentSource,
        auth_token: &str,
    ) -> EditorResult<()> {
        if !document.is_pdf() {
            return self.open_bytes(document, Vec::new());
        }
        match source.fetch_pdf_bytes(&document.id, auth_token) {
            Ok(bytes) => self.open_bytes(document, bytes),
            Err(err) => {
                log::warn!("failed to fetch document {}: {err}", document.id);
                self.reset();
                self.state = ViewerState::FetchFailed(err.to_string());
                self.document = Some(document);
                Err(err.into())
            }
        }
    }

    /// Open a document whose bytes are already at hand
    ///
    /// Non-PDF documents put the editor in the cannot-preview state and are
    /// not decoded. Reopening the document already open keeps the rendered
    /// surface and the edited signatures.
    pub fn open_bytes(&mut self, document: Document, bytes: Vec<u8>) -> EditorResult<()> {
        if !document.is_pdf() {
            self.reset();
            self.state = ViewerState::CannotPreview { mimetype: document.mimetype.clone() };
            self.document = Some(document);
            return Ok(());
        }

        let key = document.id.clone();
        let same_document = self.document.as_ref().is_some_and(|current| current.id == key);
        if !same_document {
            self.drag.cancel();
            self.compositor.clear();
            self.store = AnnotationStore::from_signatures(document.signatures.iter().cloned())?;
            self.images_revision = None;
            self.clamp_pending = self.config.clamp_on_load;
            self.state = ViewerState::Loading;
        }
        self.document = Some(document);

        match self.scheduler.load_document(&key, bytes) {
            Ok(_) => Ok(()),
            Err(err) => {
                self.state = ViewerState::CannotRender(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Close the document and drop everything derived from it
    pub fn close(&mut self) {
        self.reset();
        self.document = None;
        self.state = ViewerState::Loading;
    }

    fn reset(&mut self) {
        self.drag.cancel();
        self.scheduler.unload();
        self.compositor.clear();
        self.store = AnnotationStore::new();
        self.images_revision = None;
        self.clamp_pending = false;
    }

    /// Advance rendering and repaint whatever changed
    pub fn frame(&mut self, now: Instant) -> LayerChanges {
        let mut changes = LayerChanges::default();

        for event in self.scheduler.poll(now, self.drag.is_dragging()) {
            match event {
                SchedulerEvent::SurfaceReady(surface) => {
                    changes.base = self.compositor.set_base(surface).base;
                    if self.clamp_pending {
                        self.clamp_pending = false;
                        self.clamp_loaded_signatures();
                    }
                }
                SchedulerEvent::ReadyChanged(ready) => {
                    if ready {
                        self.state = ViewerState::Ready;
                    }
                    if let Some(callback) = &mut self.on_ready {
                        callback(ready);
                    }
                }
                SchedulerEvent::Failed(message) => {
                    self.state = ViewerState::CannotRender(message);
                }
            }
        }

        changes.overlay = self.repaint_overlay();
        changes
    }

    fn clamp_loaded_signatures(&mut self) {
        let Some(page) = self.scheduler.intrinsic_size() else {
            return;
        };
        let moved = self.store.clamp_to_page(page);
        if !moved.is_empty() {
            log::warn!("{} stored signature(s) were outside the page and have been moved", moved.len());
            self.notify_signatures_changed();
        }
    }

    fn repaint_overlay(&mut self) -> bool {
        let Some(key) = self.overlay_key() else {
            return false;
        };
        if !self.compositor.overlay_stale(&key) {
            return false;
        }
        if self.images_revision != Some(self.store.revision()) {
            self.images.sync(&self.store.snapshot());
            self.images_revision = Some(self.store.revision());
        }
        let list = self.display_list();
        self.compositor.repaint_overlay(key, &list, &self.images)
    }

    fn overlay_key(&self) -> Option<OverlayKey> {
        let mapper = self.mapper()?;
        let snap = self.grid_snap();
        Some(OverlayKey {
            revision: self.store.revision(),
            selected: self.store.selected(),
            drag: self
                .drag
                .session()
                .map(|session| (session.annotation_id, session.preview_origin(&mapper, snap))),
            scale: mapper.scale(),
            device_pixel_ratio: mapper.device_pixel_ratio(),
            show_grid: self.show_grid,
            snap,
        })
    }

    /// Overlay primitives for the current state
    ///
    /// Empty until a page surface exists.
    pub fn display_list(&self) -> DisplayList {
        let (Some(mapper), Some(page)) = (self.mapper(), self.page_size()) else {
            return DisplayList::new();
        };
        let snapshot = self.store.snapshot();
        self.painter.paint(&OverlayFrame {
            annotations: &snapshot,
            selected: self.store.selected(),
            drag: self.drag.session(),
            mapper,
            page,
            show_grid: self.show_grid,
            snap: self.grid_snap(),
            images: Some(&self.images),
        })
    }

    /// Page with overlay, flattened
    pub fn composite(&self) -> Option<RgbaImage> {
        self.compositor.composite()
    }

    /// Mapper for the surface currently on screen
    pub fn mapper(&self) -> Option<CoordinateMapper> {
        let surface = self.compositor.base()?;
        Some(CoordinateMapper::new(surface.scale(), surface.device_pixel_ratio()))
    }

    fn grid_snap(&self) -> GridSnap {
        GridSnap::new(self.snap_to_grid, self.config.grid_size)
    }

    fn local(&self, client: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(client.x - self.surface_origin.x, client.y - self.surface_origin.y)
    }

    /// Press: select and start dragging the annotation under the pointer
    ///
    /// A press on empty page clears the selection. Ignored until ready.
    pub fn pointer_down(&mut self, client: ScreenPoint) -> Option<AnnotationId> {
        if !self.is_ready() {
            return None;
        }
        let mapper = self.mapper()?;
        let pointer = self.local(client);
        if self.drag.is_dragging() {
            return None;
        }
        match self.drag.begin(pointer, &mapper, &self.store) {
            Some(id) => {
                self.store.select(Some(id));
                Some(id)
            }
            None => {
                self.store.select(None);
                None
            }
        }
    }

    /// Move: only the drag session is updated
    pub fn pointer_move(&mut self, client: ScreenPoint) -> bool {
        let pointer = self.local(client);
        self.drag.move_to(pointer)
    }

    /// Release: commit the drag
    ///
    /// `client` is `None` when the release happened outside the page; the
    /// last known pointer position is used.
    pub fn pointer_up(&mut self, client: Option<ScreenPoint>) -> Option<DragCommit> {
        let pointer = match client {
            Some(client) => self.local(client),
            None => self.drag.session()?.pointer,
        };
        let mapper = self.mapper()?;
        let page = self.page_size()?;
        let snap = self.grid_snap();
        let commit = self.drag.release(pointer, &mapper, snap, page, &mut self.store)?;
        self.notify_signatures_changed();
        Some(commit)
    }

    /// Abandon the drag without committing
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.cancel()
    }

    /// Place a new image signature at the configured default position
    pub fn add_signature(&mut self, data_url: impl Into<String>) -> EditorResult<AnnotationId> {
        let page = self.require_ready()?;
        let defaults = self.config.new_signature;
        let origin = clamp_origin(defaults.rect().origin(), defaults.width, defaults.height, page);
        let signature = Signature::image(data_url, defaults.rect().with_origin(origin))?;
        let id = self.store.add(signature)?;
        self.notify_signatures_changed();
        Ok(id)
    }

    pub fn remove_signature(&mut self, id: AnnotationId) -> EditorResult<()> {
        self.require_ready()?;
        if self.drag.session().is_some_and(|session| session.annotation_id == id) {
            self.drag.cancel();
        }
        self.store.remove(id).ok_or(EditorError::UnknownAnnotation(id))?;
        self.notify_signatures_changed();
        Ok(())
    }

    pub fn clear_signatures(&mut self) -> EditorResult<()> {
        self.require_ready()?;
        self.drag.cancel();
        self.store.clear();
        self.notify_signatures_changed();
        Ok(())
    }

    pub fn select(&mut self, id: Option<AnnotationId>) -> EditorResult<()> {
        if self.store.select(id) {
            Ok(())
        } else {
            Err(EditorError::UnknownAnnotation(id.unwrap_or_default()))
        }
    }

    /// Persist the signatures and adopt the storage ids the sink assigns
    pub fn save(&mut self, sink: &mut dyn SignatureSink) -> EditorResult<Document> {
        self.require_ready()?;
        let document_id = self.document.as_ref().map(|document| document.id.clone()).unwrap_or_default();
        let outgoing = outgoing_signatures(self.store.snapshot().iter().map(|a| a.signature()));

        let saved = sink.save_signatures(&document_id, &outgoing)?;
        let adopted = self.store.assign_storage_ids(&saved.signatures);
        log::debug!("saved {} signature(s), {adopted} new storage id(s)", outgoing.len());

        self.document = Some(saved.clone());
        self.notify_signatures_changed();
        Ok(saved)
    }

    fn require_ready(&self) -> EditorResult<PageSize> {
        if let ViewerState::CannotPreview { mimetype } = &self.state {
            return Err(EditorError::CannotPreview(mimetype.clone()));
        }
        match (self.is_ready(), self.page_size()) {
            (true, Some(page)) => Ok(page),
            _ => Err(EditorError::NotReady),
        }
    }

    fn notify_signatures_changed(&mut self) {
        let signatures = self.store.signatures();
        if let Some(callback) = &mut self.on_signatures_changed {
            callback(&signatures);
        }
    }

    /// Set the zoom factor, clamped to the configured range
    pub fn set_zoom(&mut self, zoom: f32, now: Instant) -> f32 {
        let zoom = self.config.clamp_zoom(zoom);
        self.scheduler.set_zoom(zoom, now);
        zoom
    }

    pub fn zoom_in(&mut self, now: Instant) -> f32 {
        self.set_zoom(self.zoom() + self.config.zoom_step, now)
    }

    pub fn zoom_out(&mut self, now: Instant) -> f32 {
        self.set_zoom(self.zoom() - self.config.zoom_step, now)
    }

    pub fn reset_zoom(&mut self, now: Instant) -> f32 {
        self.set_zoom(1.0, now)
    }

    pub fn zoom(&self) -> f32 {
        self.scheduler.zoom()
    }

    pub fn set_container_width(&mut self, width: f32, now: Instant) {
        self.scheduler.set_container_width(width, now);
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f32) {
        self.scheduler.set_device_pixel_ratio(ratio);
    }

    /// Where the page surface's top-left corner is in client space
    pub fn set_surface_origin(&mut self, origin: ScreenPoint) {
        self.surface_origin = origin;
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.show_grid = show;
    }

    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.snap_to_grid = snap;
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Whether editing is enabled
    pub fn is_ready(&self) -> bool {
        self.state == ViewerState::Ready && self.scheduler.is_ready()
    }

    /// Whether a render is in flight or queued
    pub fn is_rendering(&self) -> bool {
        self.scheduler.is_rendering() || self.scheduler.has_pending()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn page_size(&self) -> Option<PageSize> {
        self.scheduler.intrinsic_size()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn signatures(&self) -> Vec<Signature> {
        self.store.signatures()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.store.selected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::encode_png_data_url;
    use crate::scene::{Primitive, Rect};
    use image::Rgba;
    use sigplace_core::{DocPoint, DocRect, FetchError, MemoryBackend, PDF_MIME_TYPE};
    use sigplace_render::fixtures::{blank_pdf, PdfFixture};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn png() -> String {
        encode_png_data_url(&RgbaImage::from_pixel(4, 2, Rgba([20, 40, 60, 255]))).unwrap()
    }

    fn pdf_document(signatures: Vec<Signature>) -> (Document, Vec<u8>) {
        let bytes = blank_pdf(800.0, 600.0).unwrap();
        let mut document =
            Document::new("65f1c0ffee0123456789abcd", "contract.pdf", PDF_MIME_TYPE, bytes.len() as u64);
        document.signatures = signatures;
        (document, bytes)
    }

    fn signature_at(x: f32, y: f32) -> Signature {
        Signature::image(png(), DocRect::new(x, y, 200.0, 100.0)).unwrap()
    }

    fn ready_editor(signatures: Vec<Signature>) -> (PlacementEditor, Instant) {
        let mut editor = PlacementEditor::new(EditorConfig::default().with_band_rows(10_000));
        let (document, bytes) = pdf_document(signatures);
        editor.open_bytes(document, bytes).unwrap();
        let now = Instant::now();
        editor.frame(now);
        assert!(editor.is_ready());
        (editor, now)
    }

    #[test]
    fn test_ready_fires_after_first_render() {
        let readiness = Rc::new(RefCell::new(Vec::new()));
        let mut editor = PlacementEditor::new(EditorConfig::default().with_band_rows(10_000));
        let sink = Rc::clone(&readiness);
        editor.on_ready(move |ready| sink.borrow_mut().push(ready));

        let (document, bytes) = pdf_document(Vec::new());
        editor.open_bytes(document, bytes).unwrap();
        assert_eq!(editor.state(), &ViewerState::Loading);
        assert!(editor.add_signature(png()).is_err());

        let changes = editor.frame(Instant::now());

        assert!(changes.base && changes.overlay);
        assert_eq!(*readiness.borrow(), vec![true]);
        assert_eq!(editor.state(), &ViewerState::Ready);
        assert_eq!(editor.composite().unwrap().dimensions(), (800, 600));
    }

    #[test]
    fn test_page_fits_viewport_width() {
        let (mut editor, now) = ready_editor(vec![signature_at(100.0, 100.0)]);

        editor.set_container_width(400.0, now);
        editor.frame(now + Duration::from_secs(1));

        assert_eq!(editor.mapper().unwrap().scale(), 0.5);
        let id = editor.store().iter().next().unwrap().id();
        assert!(editor.display_list().primitives().contains(&Primitive::Image {
            rect: Rect::new(50.0, 50.0, 100.0, 50.0),
            annotation: id,
            opacity: 1.0,
        }));
        assert_eq!(editor.composite().unwrap().dimensions(), (400, 300));
    }

    #[test]
    fn test_drag_commits_once_and_notifies() {
        let (mut editor, now) = ready_editor(vec![signature_at(50.0, 50.0)]);
        let changes = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&changes);
        editor.on_signatures_changed(move |_| *counter.borrow_mut() += 1);
        editor.set_surface_origin(ScreenPoint::new(10.0, 20.0));

        let id = editor.pointer_down(ScreenPoint::new(70.0, 80.0)).unwrap();
        assert_eq!(editor.selected(), Some(id));
        editor.pointer_move(ScreenPoint::new(100.0, 100.0));
        editor.pointer_move(ScreenPoint::new(130.0, 140.0));
        let revision = editor.store().revision();
        editor.frame(now);
        assert_eq!(editor.store().revision(), revision);
        assert_eq!(*changes.borrow(), 0);

        let commit = editor.pointer_up(None).unwrap();

        assert_eq!(commit.origin, DocPoint::new(110.0, 110.0));
        assert_eq!(*changes.borrow(), 1);
        assert_eq!(editor.signatures()[0].origin(), DocPoint::new(110.0, 110.0));
    }

    #[test]
    fn test_overlay_repaints_during_drag_without_rerender() {
        let (mut editor, now) = ready_editor(vec![signature_at(50.0, 50.0)]);

        editor.pointer_down(ScreenPoint::new(60.0, 60.0));
        editor.set_zoom(2.0, now);
        editor.pointer_move(ScreenPoint::new(200.0, 200.0));
        let changes = editor.frame(now + Duration::from_secs(1));

        assert!(!changes.base);
        assert!(changes.overlay);
        assert_eq!(editor.mapper().unwrap().scale(), 1.0);

        editor.pointer_up(Some(ScreenPoint::new(200.0, 200.0)));
        let changes = editor.frame(now + Duration::from_secs(1));
        assert!(changes.base);
        assert_eq!(editor.mapper().unwrap().scale(), 2.0);
    }

    #[test]
    fn test_snap_and_clamp_on_release() {
        let (mut editor, _) = ready_editor(vec![signature_at(50.0, 50.0)]);
        editor.set_snap_to_grid(true);

        editor.pointer_down(ScreenPoint::new(60.0, 60.0));
        let commit = editor.pointer_up(Some(ScreenPoint::new(120.0, 120.0))).unwrap();
        assert_eq!(commit.origin, DocPoint::new(120.0, 120.0));

        editor.pointer_down(ScreenPoint::new(130.0, 130.0));
        let commit = editor.pointer_up(Some(ScreenPoint::new(760.0, 560.0))).unwrap();
        assert_eq!(commit.origin, DocPoint::new(600.0, 500.0));
    }

    #[test]
    fn test_press_on_empty_page_clears_selection() {
        let (mut editor, _) = ready_editor(vec![signature_at(50.0, 50.0)]);
        let id = editor.pointer_down(ScreenPoint::new(60.0, 60.0)).unwrap();
        editor.pointer_up(None);
        assert_eq!(editor.selected(), Some(id));

        assert_eq!(editor.pointer_down(ScreenPoint::new(700.0, 500.0)), None);
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn test_add_signature_uses_default_geometry() {
        let (mut editor, _) = ready_editor(Vec::new());

        let id = editor.add_signature(png()).unwrap();

        let annotation = editor.store().get(id).unwrap();
        assert_eq!(annotation.rect(), DocRect::new(100.0, 100.0, 200.0, 100.0));
        assert_eq!(annotation.signature().id, None);
    }

    #[test]
    fn test_remove_selected_clears_selection() {
        let (mut editor, _) = ready_editor(vec![signature_at(50.0, 50.0)]);
        let id = editor.pointer_down(ScreenPoint::new(60.0, 60.0)).unwrap();
        editor.pointer_up(None);

        editor.remove_signature(id).unwrap();

        assert_eq!(editor.selected(), None);
        assert!(matches!(editor.remove_signature(id), Err(EditorError::UnknownAnnotation(_))));
    }

    #[test]
    fn test_save_strips_local_ids_and_adopts_storage_ids() {
        let mut backend = MemoryBackend::new();
        let (document, bytes) = pdf_document(Vec::new());
        backend.insert(document, bytes);
        let (mut editor, _) = ready_editor(Vec::new());

        let id = editor.add_signature(png()).unwrap();
        let saved = editor.save(&mut backend).unwrap();

        let sent = &backend.saved_payloads()[0]["signatures"][0];
        assert!(sent.get("_id").is_none());
        let storage_id = saved.signatures[0].id.clone().unwrap();
        assert_eq!(editor.store().get(id).unwrap().signature().id, Some(storage_id.clone()));

        editor.save(&mut backend).unwrap();
        assert_eq!(backend.saved_payloads()[1]["signatures"][0]["_id"], storage_id.as_str());
    }

    #[test]
    fn test_out_of_bounds_signatures_clamped_on_load() {
        let (editor, _) = ready_editor(vec![signature_at(750.0, 550.0)]);
        assert_eq!(editor.signatures()[0].origin(), DocPoint::new(600.0, 500.0));
    }

    #[test]
    fn test_non_pdf_cannot_preview() {
        let mut editor = PlacementEditor::new(EditorConfig::default());
        let document = Document::new("65f1c0ffee0123456789abcd", "scan.png", "image/png", 10);

        editor.open_document(document, &MemoryBackend::new(), "").unwrap();

        assert_eq!(editor.state(), &ViewerState::CannotPreview { mimetype: "image/png".to_owned() });
        assert!(matches!(editor.add_signature(png()), Err(EditorError::CannotPreview(_))));
    }

    #[test]
    fn test_fetch_failure_is_reported() {
        let mut editor = PlacementEditor::new(EditorConfig::default());
        let mut backend = MemoryBackend::new().with_auth_token("secret");
        let (document, bytes) = pdf_document(Vec::new());
        backend.insert(document.clone(), bytes);

        let err = editor.open_document(document, &backend, "expired").unwrap_err();

        assert!(matches!(err, EditorError::Fetch(FetchError::Unauthorized)));
        assert!(matches!(editor.state(), ViewerState::FetchFailed(message) if message.contains("authentication")));
    }

    #[test]
    fn test_corrupt_bytes_cannot_render() {
        let readiness = Rc::new(RefCell::new(Vec::new()));
        let mut editor = PlacementEditor::new(EditorConfig::default());
        let sink = Rc::clone(&readiness);
        editor.on_ready(move |ready| sink.borrow_mut().push(ready));
        let (document, _) = pdf_document(Vec::new());

        assert!(matches!(
            editor.open_bytes(document, b"garbage".to_vec()),
            Err(EditorError::Decode(_))
        ));
        editor.frame(Instant::now());

        assert!(matches!(editor.state(), ViewerState::CannotRender(_)));
        assert_eq!(*readiness.borrow(), vec![false]);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let (mut editor, now) = ready_editor(Vec::new());

        assert_eq!(editor.set_zoom(10.0, now), 3.0);
        assert_eq!(editor.reset_zoom(now), 1.0);
        let zoomed = editor.zoom_in(now);
        assert!((zoomed - 1.1).abs() < 1e-6);
        assert!((editor.zoom_out(now) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_composite_shows_signature_pixels() {
        let (mut editor, now) = ready_editor(vec![signature_at(50.0, 50.0)]);
        editor.frame(now);

        let output = editor.composite().unwrap();

        assert_eq!(output.get_pixel(150, 100), &Rgba([20, 40, 60, 255]));
        assert_eq!(output.get_pixel(400, 400), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_composite_shows_page_content() {
        let bytes = PdfFixture::new(200.0, 200.0).content("0 0 0 rg 0 0 200 200 re f").build().unwrap();
        let document = Document::new("65f1c0ffee0123456789abce", "black.pdf", PDF_MIME_TYPE, bytes.len() as u64);
        let mut editor = PlacementEditor::new(EditorConfig::default().with_band_rows(10_000));

        editor.open_bytes(document, bytes).unwrap();
        editor.frame(Instant::now());

        let output = editor.composite().unwrap();
        assert_eq!(output.get_pixel(100, 100), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_undecodable_signature_is_not_drawn() {
        let mut broken = signature_at(100.0, 100.0);
        broken.data_url = "data:image/png;base64,!!!notpng".to_owned();
        let (mut editor, now) = ready_editor(vec![broken, signature_at(400.0, 300.0)]);
        editor.frame(now);

        let good = editor.store().iter().nth(1).unwrap().id();
        assert_eq!(editor.display_list().image_order(), vec![good]);

        let output = editor.composite().unwrap();
        // Inside and on the border of the broken one: bare page
        assert_eq!(output.get_pixel(200, 150), &Rgba([255, 255, 255, 255]));
        assert_eq!(output.get_pixel(100, 150), &Rgba([255, 255, 255, 255]));
        assert_eq!(output.get_pixel(500, 350), &Rgba([20, 40, 60, 255]));
    }
}
