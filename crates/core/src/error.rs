//! Editor-level errors

use crate::annotation::AnnotationId;
use crate::persistence::FetchError;
use crate::signature::SignatureError;
use sigplace_render::DecodeError;

/// Errors surfaced by the placement editor
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("the page has not finished rendering")]
    NotReady,
    #[error("no annotation with id {0}")]
    UnknownAnnotation(AnnotationId),
    #[error("cannot preview documents of type {0}")]
    CannotPreview(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("cannot render this document: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;
