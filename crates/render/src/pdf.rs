//! PDF page decoding
//!
//! Parses PDF bytes with lopdf and extracts what the placement engine needs
//! from the first page: its intrinsic size in document units (points at
//! scale 1, origin top-left). The raw bytes are kept for raster backends
//! that re-open the document.

use lopdf::{Dictionary, Document, Object};
use std::sync::Arc;

/// Fallback page size when no usable MediaBox is found (US Letter)
const DEFAULT_PAGE_SIZE: PageSize = PageSize { width: 612.0, height: 792.0 };

/// Guard against cyclic page trees while walking `/Parent` links
const MAX_TREE_DEPTH: usize = 32;

/// Errors raised while decoding document bytes
///
/// Decode failures are not retryable: the same bytes will fail again.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("document is empty")]
    EmptyInput,
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("encrypted PDFs are not supported")]
    Encrypted,
    #[error("document has no pages")]
    NoPages,
}

/// Errors raised while rendering a decoded page
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("invalid render scale {0}")]
    InvalidScale(f32),
    #[error("surface {width}x{height} exceeds the maximum surface size")]
    SurfaceTooLarge { width: u64, height: u64 },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Intrinsic page size in document units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Page bounds in PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl MediaBox {
    /// Unrotated page size
    pub fn size(&self) -> PageSize {
        PageSize::new(self.right - self.left, self.top - self.bottom)
    }
}

impl Default for MediaBox {
    fn default() -> Self {
        Self { left: 0.0, bottom: 0.0, right: DEFAULT_PAGE_SIZE.width, top: DEFAULT_PAGE_SIZE.height }
    }
}

/// First page of a decoded PDF
#[derive(Debug, Clone)]
pub struct PdfPage {
    bytes: Arc<[u8]>,
    media_box: MediaBox,
    size: PageSize,
    rotation: u16,
    page_count: u32,
}

impl PdfPage {
    /// Decode PDF bytes and read the first page's geometry
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, DecodeError> {
        let bytes: Arc<[u8]> = bytes.into();
        if bytes.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        if bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(DecodeError::Encrypted);
        }

        let doc = Document::load_mem(&bytes)?;
        let pages = doc.get_pages();
        let page_count = pages.len() as u32;
        let first = *pages.values().next().ok_or(DecodeError::NoPages)?;

        let page = doc.get_dictionary(first)?;
        let media_box = inherited(&doc, page, b"MediaBox")
            .and_then(|object| media_box(&doc, object))
            .unwrap_or_default();

        let rotation = inherited(&doc, page, b"Rotate")
            .and_then(|object| resolve(&doc, object).as_i64().ok())
            .map(normalize_rotation)
            .unwrap_or(0);

        let unrotated = media_box.size();
        let size = if rotation == 90 || rotation == 270 {
            PageSize::new(unrotated.height, unrotated.width)
        } else {
            unrotated
        };

        log::debug!(
            "decoded PDF: {} page(s), first page {}x{} rotated {}",
            page_count,
            size.width,
            size.height,
            rotation
        );

        Ok(Self { bytes, media_box, size, rotation, page_count })
    }

    /// Intrinsic size of the page at scale 1, rotation applied
    pub fn size(&self) -> PageSize {
        self.size
    }

    /// Page bounds in PDF user space, before rotation
    pub fn media_box(&self) -> MediaBox {
        self.media_box
    }

    /// Page rotation in degrees (0, 90, 180, 270)
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// Number of pages in the document
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Raw document bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look up an inheritable page attribute, walking up the page tree
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn media_box(doc: &Document, object: &Object) -> Option<MediaBox> {
    let array = resolve(doc, object).as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let x0 = resolve(doc, &array[0]).as_float().ok()?;
    let y0 = resolve(doc, &array[1]).as_float().ok()?;
    let x1 = resolve(doc, &array[2]).as_float().ok()?;
    let y1 = resolve(doc, &array[3]).as_float().ok()?;

    // Corners may come in any order
    let media_box =
        MediaBox { left: x0.min(x1), bottom: y0.min(y1), right: x0.max(x1), top: y0.max(y1) };
    let size = media_box.size();
    (size.width > 0.0 && size.height > 0.0).then_some(media_box)
}

fn normalize_rotation(degrees: i64) -> u16 {
    (degrees.rem_euclid(360) / 90 * 90) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{blank_pdf, PdfFixture};

    #[test]
    fn test_reads_media_box() {
        let bytes = blank_pdf(800.0, 600.0).unwrap();
        let page = PdfPage::from_bytes(bytes).unwrap();

        assert_eq!(page.size(), PageSize::new(800.0, 600.0));
        assert_eq!(page.page_count(), 1);
        assert_eq!(page.rotation(), 0);
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let bytes = PdfFixture::new(800.0, 600.0).rotate(90).build().unwrap();
        let page = PdfPage::from_bytes(bytes).unwrap();

        assert_eq!(page.rotation(), 90);
        assert_eq!(page.size(), PageSize::new(600.0, 800.0));
    }

    #[test]
    fn test_negative_rotation_is_normalized() {
        let bytes = PdfFixture::new(800.0, 600.0).rotate(-90).build().unwrap();
        let page = PdfPage::from_bytes(bytes).unwrap();

        assert_eq!(page.rotation(), 270);
    }

    #[test]
    fn test_media_box_inherited_from_page_tree() {
        let bytes = PdfFixture::new(300.0, 400.0).media_box_on_parent().build().unwrap();
        let page = PdfPage::from_bytes(bytes).unwrap();

        assert_eq!(page.size(), PageSize::new(300.0, 400.0));
    }

    #[test]
    fn test_missing_media_box_falls_back_to_letter() {
        let bytes = PdfFixture::new(300.0, 400.0).without_media_box().build().unwrap();
        let page = PdfPage::from_bytes(bytes).unwrap();

        assert_eq!(page.size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_multi_page_uses_first_page() {
        let bytes = PdfFixture::new(200.0, 100.0).pages(3).build().unwrap();
        let page = PdfPage::from_bytes(bytes).unwrap();

        assert_eq!(page.page_count(), 3);
        assert_eq!(page.size(), PageSize::new(200.0, 100.0));
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let err = PdfPage::from_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyInput));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = PdfPage::from_bytes(b"this is not a pdf".to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)));
    }

    #[test]
    fn test_encrypted_marker_rejected() {
        let err = PdfPage::from_bytes(b"%PDF-1.7\n/Encrypt 5 0 R\n".to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::Encrypted));
    }
}
