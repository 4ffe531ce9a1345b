//! Decoded signature images
//!
//! Signature payloads arrive as `data:` URLs. Each one is decoded once and
//! cached against the annotation that carries it; a payload that fails to
//! decode is logged once and then left out of every frame, without
//! affecting the other annotations.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::RgbaImage;
use sigplace_core::{AnnotationId, Snapshot};
use std::collections::HashMap;

/// Errors decoding a signature payload
#[derive(Debug, thiserror::Error)]
pub enum ImageDecodeError {
    #[error("payload is not a data URL")]
    NotDataUrl,
    #[error("payload is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a base64 `data:` URL into pixels
pub fn decode_data_url(data_url: &str) -> Result<RgbaImage, ImageDecodeError> {
    let rest = data_url.trim().strip_prefix("data:").ok_or(ImageDecodeError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(ImageDecodeError::NotDataUrl)?;
    if !meta.ends_with(";base64") {
        return Err(ImageDecodeError::NotBase64);
    }
    let bytes = STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// Encode pixels as a PNG `data:` URL
pub fn encode_png_data_url(image: &RgbaImage) -> Result<String, image::ImageError> {
    let mut png = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

struct CachedImage {
    data_url: String,
    image: Option<RgbaImage>,
}

/// Per-annotation cache of decoded images
#[derive(Default)]
pub struct ImageCache {
    entries: HashMap<AnnotationId, CachedImage>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let broken = self.entries.values().filter(|cached| cached.image.is_none()).count();
        f.debug_struct("ImageCache")
            .field("entries", &self.entries.len())
            .field("broken", &broken)
            .finish()
    }
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the cache in line with a store snapshot
    ///
    /// New or changed payloads are decoded; entries for annotations no
    /// longer present are dropped.
    pub fn sync(&mut self, snapshot: &Snapshot) {
        self.entries.retain(|id, _| snapshot.iter().any(|annotation| annotation.id() == *id));

        for annotation in snapshot.iter().filter(|annotation| annotation.signature().is_image()) {
            let data_url = &annotation.signature().data_url;
            if self
                .entries
                .get(&annotation.id())
                .is_some_and(|cached| cached.data_url == *data_url)
            {
                continue;
            }

            let image = match decode_data_url(data_url) {
                Ok(image) => Some(image),
                Err(err) => {
                    log::warn!("signature {} image skipped: {err}", annotation.id());
                    None
                }
            };
            self.entries
                .insert(annotation.id(), CachedImage { data_url: data_url.clone(), image });
        }
    }

    /// Decoded image for `id`, if it decoded successfully
    pub fn get(&self, id: AnnotationId) -> Option<&RgbaImage> {
        self.entries.get(&id).and_then(|cached| cached.image.as_ref())
    }

    /// Whether `id`'s payload failed to decode
    pub fn is_broken(&self, id: AnnotationId) -> bool {
        self.entries.get(&id).is_some_and(|cached| cached.image.is_none())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
