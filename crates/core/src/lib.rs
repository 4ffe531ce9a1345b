//! Sigplace Core Library
//!
//! Document-space model and interaction state for placing signature images
//! on a rendered PDF page: coordinate mapping, the annotation store, the
//! drag state machine, and the render scheduler that keeps the page raster
//! in step with zoom and viewport changes.

pub mod annotation;
pub mod config;
pub mod coords;
pub mod document;
pub mod error;
pub mod manipulation;
pub mod persistence;
pub mod render_scheduler;
pub mod signature;
pub mod snapping;

pub use annotation::{Annotation, AnnotationId, AnnotationStore, GeometryPatch, Snapshot};
pub use config::{ConfigError, EditorConfig, PlacementDefaults};
pub use coords::{
    effective_scale, CoordinateMapper, DevicePoint, DocPoint, DocRect, ScreenPoint, ScreenRect,
};
pub use document::{Document, PDF_MIME_TYPE};
pub use error::{EditorError, EditorResult};
pub use manipulation::{
    handle_anchors, resolve_drop, DragCommit, DragController, DragPhase, DragSession, HandleType,
};
pub use persistence::{
    outgoing_signatures, DocumentSource, FetchError, MemoryBackend, SidecarBackend, SignatureSink,
};
pub use render_scheduler::{LoadOutcome, RenderScheduler, SchedulerEvent};
pub use signature::{Signature, SignatureError, SignatureKind, STORAGE_ID_LEN};
pub use snapping::{clamp_origin, snap, GridSnap};

pub use sigplace_render::{PageSize, RenderSurface};
