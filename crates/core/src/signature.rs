//! Signature wire model
//!
//! A signature is a placed image (or text/date stamp) on the page, stored in
//! document space. The JSON shape matches what the document service accepts
//! and returns.

use crate::coords::{DocPoint, DocRect};
use serde::{Deserialize, Serialize};

/// Length of identifiers assigned by the document service
///
/// Any other identifier was generated locally and must not be sent back.
pub const STORAGE_ID_LEN: usize = 24;

/// Errors for signature geometry and payload
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature geometry {width}x{height}: width and height must be positive")]
    InvalidGeometry { width: f32, height: f32 },
    #[error("signature has no image payload")]
    MissingPayload,
}

/// What a signature draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    /// A raster image carried as a data URL
    #[default]
    Signature,
    Text,
    Date,
}

/// A signature placed on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Storage identifier, present once the service has persisted it
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: SignatureKind,

    /// Image payload as a `data:` URL
    #[serde(rename = "dataURL", default)]
    pub data_url: String,
}

impl Signature {
    /// Create an image signature at `rect`
    pub fn image(data_url: impl Into<String>, rect: DocRect) -> Result<Self, SignatureError> {
        let signature = Self {
            id: None,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            text: None,
            kind: SignatureKind::Signature,
            data_url: data_url.into(),
        };
        signature.validate()?;
        Ok(signature)
    }

    /// Check the geometry and payload invariants
    pub fn validate(&self) -> Result<(), SignatureError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(self.width) || !valid(self.height) || !self.x.is_finite() || !self.y.is_finite() {
            return Err(SignatureError::InvalidGeometry { width: self.width, height: self.height });
        }
        if self.kind == SignatureKind::Signature && self.data_url.is_empty() {
            return Err(SignatureError::MissingPayload);
        }
        Ok(())
    }

    pub fn rect(&self) -> DocRect {
        DocRect::new(self.x, self.y, self.width, self.height)
    }

    pub fn origin(&self) -> DocPoint {
        DocPoint::new(self.x, self.y)
    }

    /// Copy moved to `origin`
    pub fn with_origin(&self, origin: DocPoint) -> Self {
        Self { x: origin.x, y: origin.y, ..self.clone() }
    }

    /// The storage identifier, if this signature has a service-assigned one
    pub fn storage_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| is_storage_id(id))
    }

    /// Copy fit for sending to the service: local identifiers are dropped
    pub fn to_outgoing(&self) -> Self {
        Self { id: self.storage_id().map(str::to_owned), ..self.clone() }
    }

    /// Whether the overlay draws this signature as an image
    pub fn is_image(&self) -> bool {
        self.kind == SignatureKind::Signature
    }
}

/// Whether `id` has the shape of a service-assigned identifier
pub fn is_storage_id(id: &str) -> bool {
    id.len() == STORAGE_ID_LEN
}
