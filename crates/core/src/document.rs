//! Document metadata as exchanged with the document service

use crate::signature::Signature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type the editor can render
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// An uploaded document and its placed signatures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Storage identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning user's identifier
    #[serde(default)]
    pub user: String,

    /// File name as uploaded
    pub original_name: String,

    /// Name of the stored file
    #[serde(default)]
    pub filename: String,

    pub mimetype: String,

    /// Size in bytes
    pub size: u64,

    #[serde(default)]
    pub signed: bool,

    #[serde(default)]
    pub signatures: Vec<Signature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Metadata for a freshly uploaded, unsigned document
    pub fn new(
        id: impl Into<String>,
        original_name: impl Into<String>,
        mimetype: impl Into<String>,
        size: u64,
    ) -> Self {
        let now = Utc::now();
        let original_name = original_name.into();
        Self {
            id: id.into(),
            user: String::new(),
            filename: original_name.clone(),
            original_name,
            mimetype: mimetype.into(),
            size,
            signed: false,
            signatures: Vec::new(),
            signed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the editor can render this document
    pub fn is_pdf(&self) -> bool {
        self.mimetype.eq_ignore_ascii_case(PDF_MIME_TYPE)
    }
}
