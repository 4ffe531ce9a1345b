//! Document fetching and signature persistence
//!
//! The editor talks to storage through two traits: [`DocumentSource`] for
//! the PDF bytes and [`SignatureSink`] for saving placed signatures. Two
//! backends are provided: an in-memory one and one that keeps signatures
//! in a JSON sidecar file next to each PDF.

use crate::document::{Document, PDF_MIME_TYPE};
use crate::signature::{Signature, STORAGE_ID_LEN};
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors from fetching documents or saving signatures
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("authentication required, please log in to view this document")]
    Unauthorized,
    #[error("document {0} not found")]
    NotFound(String),
    #[error("failed to load document: {0}")]
    Network(String),
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Source of document bytes
pub trait DocumentSource {
    /// Fetch the raw PDF bytes of `document_id`
    fn fetch_pdf_bytes(&self, document_id: &str, auth_token: &str) -> Result<Vec<u8>, FetchError>;
}

/// Destination for placed signatures
pub trait SignatureSink {
    /// Replace the signatures of `document_id`
    ///
    /// `signatures` are already in outgoing form (see [`outgoing_signatures`]).
    /// The returned document carries the signatures in the order they were
    /// sent, each with its storage id.
    fn save_signatures(
        &mut self,
        document_id: &str,
        signatures: &[Signature],
    ) -> Result<Document, FetchError>;
}

/// Prepare signatures for a save: locally generated ids are stripped
pub fn outgoing_signatures<'a>(signatures: impl IntoIterator<Item = &'a Signature>) -> Vec<Signature> {
    signatures.into_iter().map(Signature::to_outgoing).collect()
}

/// Fresh identifier in the service's format
fn new_storage_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(STORAGE_ID_LEN);
    id
}

/// Give every signature without a storage id a new one
fn assign_missing_ids(signatures: &[Signature]) -> Vec<Signature> {
    signatures
        .iter()
        .map(|signature| {
            let mut stored = signature.clone();
            if stored.storage_id().is_none() {
                stored.id = Some(new_storage_id());
            }
            stored
        })
        .collect()
}

fn mark_signed(document: &mut Document, signatures: Vec<Signature>) {
    let now = Utc::now();
    document.signed = !signatures.is_empty();
    document.signed_at = document.signed.then_some(now);
    document.signatures = signatures;
    document.updated_at = now;
}

/// In-memory document store with token checking
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: HashMap<String, (Document, Vec<u8>)>,
    auth_token: Option<String>,
    saved_payloads: Vec<serde_json::Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `token` on every fetch
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Register a PDF and return its metadata
    pub fn insert_pdf(&mut self, original_name: &str, bytes: Vec<u8>) -> Document {
        let document = Document::new(new_storage_id(), original_name, PDF_MIME_TYPE, bytes.len() as u64);
        self.insert(document.clone(), bytes);
        document
    }

    pub fn insert(&mut self, document: Document, bytes: Vec<u8>) {
        self.documents.insert(document.id.clone(), (document, bytes));
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.documents.get(document_id).map(|(document, _)| document)
    }

    /// JSON bodies of every save, oldest first
    pub fn saved_payloads(&self) -> &[serde_json::Value] {
        &self.saved_payloads
    }
}

impl DocumentSource for MemoryBackend {
    fn fetch_pdf_bytes(&self, document_id: &str, auth_token: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(expected) = &self.auth_token {
            if expected != auth_token {
                return Err(FetchError::Unauthorized);
            }
        }
        self.documents
            .get(document_id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| FetchError::NotFound(document_id.to_owned()))
    }
}

impl SignatureSink for MemoryBackend {
    fn save_signatures(
        &mut self,
        document_id: &str,
        signatures: &[Signature],
    ) -> Result<Document, FetchError> {
        let payload = serde_json::json!({ "signatures": signatures });
        let (document, _) = self
            .documents
            .get_mut(document_id)
            .ok_or_else(|| FetchError::NotFound(document_id.to_owned()))?;

        mark_signed(document, assign_missing_ids(signatures));
        self.saved_payloads.push(payload);
        Ok(document.clone())
    }
}

/// Signatures kept in a JSON sidecar next to each PDF
///
/// Document ids are file paths. The sidecar for `lease.pdf` is
/// `lease.pdf.signatures.json` and holds the full [`Document`] record.
#[derive(Debug, Clone, Default)]
pub struct SidecarBackend;

impl SidecarBackend {
    /// Sidecar path for a PDF path
    pub fn sidecar_path(pdf_path: &Path) -> PathBuf {
        let mut path = pdf_path.as_os_str().to_owned();
        path.push(".signatures.json");
        PathBuf::from(path)
    }

    /// Load the document record, creating a fresh one if no sidecar exists
    pub fn load(&self, pdf_path: &Path) -> Result<Document, FetchError> {
        let sidecar = Self::sidecar_path(pdf_path);
        if sidecar.exists() {
            let contents = fs::read_to_string(&sidecar)?;
            return serde_json::from_str(&contents)
                .map_err(|err| FetchError::Network(format!("corrupt sidecar {}: {err}", sidecar.display())));
        }

        let metadata = fs::metadata(pdf_path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(pdf_path.display().to_string()),
            _ => err.into(),
        })?;
        let name = pdf_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = pdf_path.display().to_string();
        let mut document = Document::new(path.clone(), name, PDF_MIME_TYPE, metadata.len());
        document.filename = path;
        Ok(document)
    }

    fn write(&self, pdf_path: &Path, document: &Document) -> Result<(), FetchError> {
        let sidecar = Self::sidecar_path(pdf_path);
        let json = serde_json::to_string_pretty(document)
            .map_err(|err| FetchError::Network(err.to_string()))?;

        // Replace atomically; readers never see a partial sidecar
        let tmp = sidecar.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &sidecar)?;
        Ok(())
    }
}

impl DocumentSource for SidecarBackend {
    fn fetch_pdf_bytes(&self, document_id: &str, _auth_token: &str) -> Result<Vec<u8>, FetchError> {
        fs::read(document_id).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(document_id.to_owned()),
            _ => err.into(),
        })
    }
}

impl SignatureSink for SidecarBackend {
    fn save_signatures(
        &mut self,
        document_id: &str,
        signatures: &[Signature],
    ) -> Result<Document, FetchError> {
        let path = Path::new(document_id);
        let mut document = self.load(path)?;
        mark_signed(&mut document, assign_missing_ids(signatures));
        self.write(path, &document)?;
        log::debug!(
            "saved {} signature(s) to {}",
            document.signatures.len(),
            Self::sidecar_path(path).display()
        );
        Ok(document)
    }
}
