//! Drag interaction and selection handles
//!
//! A drag is an explicit state machine: `Idle` until a press lands on an
//! image annotation, `Dragging` until release or cancel. While dragging the
//! pointer position lives only in the session; the store is touched once,
//! on release, after snapping and clamping.

use crate::annotation::{AnnotationId, AnnotationStore, GeometryPatch};
use crate::coords::{CoordinateMapper, DocPoint, ScreenPoint, ScreenRect};
use crate::signature::Signature;
use crate::snapping::{clamp_origin, GridSnap};
use sigplace_render::PageSize;

/// Selection handle positions around an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

/// Centre points of the eight selection handles of `rect`
///
/// Corners first, then edge midpoints, each clockwise from the top-left.
pub fn handle_anchors(rect: ScreenRect) -> [(HandleType, ScreenPoint); 8] {
    let center = rect.center();
    [
        (HandleType::TopLeft, ScreenPoint::new(rect.x, rect.y)),
        (HandleType::TopRight, ScreenPoint::new(rect.right(), rect.y)),
        (HandleType::BottomRight, ScreenPoint::new(rect.right(), rect.bottom())),
        (HandleType::BottomLeft, ScreenPoint::new(rect.x, rect.bottom())),
        (HandleType::Top, ScreenPoint::new(center.x, rect.y)),
        (HandleType::Right, ScreenPoint::new(rect.right(), center.y)),
        (HandleType::Bottom, ScreenPoint::new(center.x, rect.bottom())),
        (HandleType::Left, ScreenPoint::new(rect.x, center.y)),
    ]
}

/// Document-space origin for an annotation dropped at `pointer`
///
/// The grab offset is subtracted so the annotation keeps its position under
/// the cursor, then the grid is applied, then the result is clamped onto
/// the page.
pub fn resolve_drop(
    pointer: ScreenPoint,
    grab_offset: DocPoint,
    mapper: &CoordinateMapper,
    snap: GridSnap,
    size: (f32, f32),
    page: PageSize,
) -> DocPoint {
    let raw = unsnapped_origin(pointer, grab_offset, mapper);
    clamp_origin(snap.apply(raw), size.0, size.1, page)
}

fn unsnapped_origin(pointer: ScreenPoint, grab_offset: DocPoint, mapper: &CoordinateMapper) -> DocPoint {
    let doc = mapper.screen_to_document(pointer);
    DocPoint::new(doc.x - grab_offset.x, doc.y - grab_offset.y)
}

/// State of one in-progress drag
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Annotation being dragged
    pub annotation_id: AnnotationId,

    /// The annotation as it was when the drag began
    pub original: Signature,

    /// Pointer position minus annotation origin, in document units
    pub grab_offset: DocPoint,

    /// Latest pointer position, surface-local screen space
    pub pointer: ScreenPoint,
}

impl DragSession {
    /// Where the annotation would land if released now, before clamping
    ///
    /// Snapping is applied so the preview shows the snapped position.
    pub fn preview_origin(&self, mapper: &CoordinateMapper, snap: GridSnap) -> DocPoint {
        snap.apply(unsnapped_origin(self.pointer, self.grab_offset, mapper))
    }
}

/// Drag state machine
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Result of a committed drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragCommit {
    pub annotation_id: AnnotationId,
    pub origin: DocPoint,
}

/// Turns pointer events into at most one store update per drag
#[derive(Debug, Default)]
pub struct DragController {
    phase: DragPhase,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.phase {
            DragPhase::Dragging(session) => Some(session),
            DragPhase::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    /// Start a drag if `pointer` is over an image annotation
    ///
    /// A press while already dragging is ignored. Returns the grabbed
    /// annotation.
    pub fn begin(
        &mut self,
        pointer: ScreenPoint,
        mapper: &CoordinateMapper,
        store: &AnnotationStore,
    ) -> Option<AnnotationId> {
        if self.is_dragging() {
            return None;
        }

        let doc = mapper.screen_to_document(pointer);
        let annotation = store.get(store.hit_test(doc)?)?;
        let origin = annotation.rect().origin();

        log::trace!("drag started on {} at {:?}", annotation.id(), doc);

        self.phase = DragPhase::Dragging(DragSession {
            annotation_id: annotation.id(),
            original: annotation.signature().clone(),
            grab_offset: DocPoint::new(doc.x - origin.x, doc.y - origin.y),
            pointer,
        });
        Some(annotation.id())
    }

    /// Track the pointer; returns whether a drag is active
    pub fn move_to(&mut self, pointer: ScreenPoint) -> bool {
        match &mut self.phase {
            DragPhase::Dragging(session) => {
                session.pointer = pointer;
                true
            }
            DragPhase::Idle => false,
        }
    }

    /// Finish the drag and write the final position to the store
    ///
    /// Returns `None` when idle, or when the annotation left the store
    /// during the drag.
    pub fn release(
        &mut self,
        pointer: ScreenPoint,
        mapper: &CoordinateMapper,
        snap: GridSnap,
        page: PageSize,
        store: &mut AnnotationStore,
    ) -> Option<DragCommit> {
        let DragPhase::Dragging(session) = std::mem::take(&mut self.phase) else {
            return None;
        };

        let size = (session.original.width, session.original.height);
        let origin = resolve_drop(pointer, session.grab_offset, mapper, snap, size, page);

        match store.update(session.annotation_id, GeometryPatch::origin(origin)) {
            Ok(true) => {
                log::debug!("drag committed {} at {:?}", session.annotation_id, origin);
                Some(DragCommit { annotation_id: session.annotation_id, origin })
            }
            Ok(false) => {
                log::debug!("dragged annotation {} no longer exists", session.annotation_id);
                None
            }
            Err(err) => {
                log::warn!("drag commit rejected: {err}");
                None
            }
        }
    }

    /// Abandon the drag without touching the store
    pub fn cancel(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.phase = DragPhase::Idle;
        was_dragging
    }
}
