//! Minimal PDF builder
//!
//! Produces small, valid PDF byte streams with a chosen page geometry.
//! Used by tests across the workspace and by the CLI's sample output.

use lopdf::{Dictionary, Document, Object, Stream};

/// Build a single-page PDF with the given MediaBox size
pub fn blank_pdf(width: f32, height: f32) -> Result<Vec<u8>, lopdf::Error> {
    PdfFixture::new(width, height).build()
}

/// Builder for synthetic PDF documents
#[derive(Debug, Clone)]
pub struct PdfFixture {
    width: f32,
    height: f32,
    rotate: Option<i64>,
    page_count: usize,
    media_box_on_parent: bool,
    with_media_box: bool,
    content: Option<String>,
}

impl PdfFixture {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            rotate: None,
            page_count: 1,
            media_box_on_parent: false,
            with_media_box: true,
            content: None,
        }
    }

    /// Set `/Rotate` on the first page
    pub fn rotate(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// Number of (identical) pages
    pub fn pages(mut self, count: usize) -> Self {
        self.page_count = count.max(1);
        self
    }

    /// Put the MediaBox on the `/Pages` node instead of each page
    pub fn media_box_on_parent(mut self) -> Self {
        self.media_box_on_parent = true;
        self
    }

    /// Omit the MediaBox entirely
    pub fn without_media_box(mut self) -> Self {
        self.with_media_box = false;
        self
    }

    /// Content stream operators for the first page, e.g. `0 0 1 rg 0 0 10 10 re f`
    pub fn content(mut self, operators: impl Into<String>) -> Self {
        self.content = Some(operators.into());
        self
    }

    pub fn build(self) -> Result<Vec<u8>, lopdf::Error> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let media_box = Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.width.into()),
            Object::Real(self.height.into()),
        ]);

        let mut kids = Vec::with_capacity(self.page_count);
        for index in 0..self.page_count {
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            if self.with_media_box && !self.media_box_on_parent {
                page.set("MediaBox", media_box.clone());
            }
            if index == 0 {
                if let Some(degrees) = self.rotate {
                    page.set("Rotate", Object::Integer(degrees));
                }
                if let Some(content) = &self.content {
                    let stream = Stream::new(Dictionary::new(), content.as_bytes().to_vec());
                    page.set("Contents", Object::Reference(doc.add_object(stream)));
                }
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.page_count as i64));
        pages.set("Kids", Object::Array(kids));
        if self.with_media_box && self.media_box_on_parent {
            pages.set("MediaBox", media_box);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}
