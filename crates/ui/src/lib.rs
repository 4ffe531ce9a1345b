//! Signature placement UI
//!
//! Overlay painting and compositing on top of the rendered page, and the
//! [`PlacementEditor`] session that ties pointer input, the annotation
//! store and the render scheduler together.

pub mod compositor;
pub mod editor;
pub mod images;
pub mod overlay;
pub mod raster;
pub mod scene;

pub use compositor::{Compositor, LayerChanges, OverlayKey};
pub use editor::{PlacementEditor, ViewerState};
pub use images::{decode_data_url, encode_png_data_url, ImageCache, ImageDecodeError};
pub use overlay::{OverlayFrame, OverlayPainter, OverlayStyle};
pub use scene::{Color, DisplayList, Primitive, Rect};
