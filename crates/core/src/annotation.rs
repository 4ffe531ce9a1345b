//! Annotation store
//!
//! Ordered collection of placed signatures plus the current selection.
//! Insertion order is draw order: later annotations draw on top and win hit
//! tests.
//!
//! Every mutation replaces the whole list, so a [`Snapshot`] taken before a
//! change is never modified by it. Painters compare snapshots with
//! [`Arc::ptr_eq`] (or the revision counter) to decide whether to redraw.

use crate::coords::{DocPoint, DocRect};
use crate::signature::{is_storage_id, Signature, SignatureError};
use crate::snapping::clamp_origin;
use sigplace_render::PageSize;
use std::sync::Arc;

/// Local identifier for an annotation
///
/// Assigned when the annotation enters the store and stable for as long as
/// it stays there. Independent of the service's storage identifier.
pub type AnnotationId = uuid::Uuid;

/// Immutable view of the store's annotations in draw order
pub type Snapshot = Arc<Vec<Annotation>>;

/// A signature held by the store
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    id: AnnotationId,
    signature: Signature,
}

impl Annotation {
    fn new(signature: Signature) -> Self {
        Self { id: uuid::Uuid::new_v4(), signature }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn rect(&self) -> DocRect {
        self.signature.rect()
    }
}

/// Partial geometry update; `None` fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl GeometryPatch {
    /// Move without resizing
    pub fn origin(origin: DocPoint) -> Self {
        Self { x: Some(origin.x), y: Some(origin.y), ..Self::default() }
    }

    fn apply(&self, signature: &Signature) -> Signature {
        Signature {
            x: self.x.unwrap_or(signature.x),
            y: self.y.unwrap_or(signature.y),
            width: self.width.unwrap_or(signature.width),
            height: self.height.unwrap_or(signature.height),
            ..signature.clone()
        }
    }
}

/// Ordered annotation collection with a single selection
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Snapshot,
    selected: Option<AnnotationId>,
    revision: u64,
}

impl AnnotationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from signatures loaded from the service
    pub fn from_signatures(
        signatures: impl IntoIterator<Item = Signature>,
    ) -> Result<Self, SignatureError> {
        let annotations = signatures
            .into_iter()
            .map(|signature| signature.validate().map(|()| Annotation::new(signature)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { annotations: Arc::new(annotations), selected: None, revision: 0 })
    }

    /// Append a signature on top of the others
    pub fn add(&mut self, signature: Signature) -> Result<AnnotationId, SignatureError> {
        signature.validate()?;
        let annotation = Annotation::new(signature);
        let id = annotation.id;
        self.replace_with(|list| list.push(annotation));
        log::debug!("annotation {id} added");
        Ok(id)
    }

    /// Apply a partial geometry update
    ///
    /// Returns `Ok(false)` when `id` is not in the store. An update that would
    /// leave a non-positive size is rejected and nothing changes.
    pub fn update(&mut self, id: AnnotationId, patch: GeometryPatch) -> Result<bool, SignatureError> {
        let Some(index) = self.index_of(id) else {
            return Ok(false);
        };
        let updated = patch.apply(&self.annotations[index].signature);
        updated.validate()?;
        self.replace_with(|list| list[index].signature = updated);
        Ok(true)
    }

    /// Remove an annotation, clearing the selection if it was selected
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.index_of(id)?;
        let removed = self.annotations[index].clone();
        self.replace_with(|list| {
            list.remove(index);
        });
        if self.selected == Some(id) {
            self.selected = None;
        }
        log::debug!("annotation {id} removed");
        Some(removed)
    }

    /// Remove every annotation
    pub fn clear(&mut self) {
        if self.annotations.is_empty() {
            return;
        }
        self.replace_with(Vec::clear);
        self.selected = None;
    }

    /// Set or clear the selection
    ///
    /// Selecting an unknown id leaves the selection unchanged and returns
    /// `false`.
    pub fn select(&mut self, id: Option<AnnotationId>) -> bool {
        match id {
            Some(id) if self.index_of(id).is_none() => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    /// Topmost image annotation containing `point`
    pub fn hit_test(&self, point: DocPoint) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .find(|annotation| annotation.signature.is_image() && annotation.rect().contains(point))
            .map(Annotation::id)
    }

    /// Immutable view of the current contents
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.annotations)
    }

    /// Incremented on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|annotation| annotation.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Signatures in draw order, as they would be persisted
    pub fn signatures(&self) -> Vec<Signature> {
        self.annotations.iter().map(|annotation| annotation.signature.clone()).collect()
    }

    /// Adopt storage identifiers from a save response
    ///
    /// The service returns signatures in the order they were sent, so ids
    /// are matched by position. Only well-formed storage ids are adopted.
    /// Returns how many annotations changed.
    pub fn assign_storage_ids(&mut self, saved: &[Signature]) -> usize {
        let changes: Vec<(usize, String)> = self
            .annotations
            .iter()
            .zip(saved)
            .enumerate()
            .filter_map(|(index, (annotation, saved))| {
                let id = saved.id.as_deref().filter(|id| is_storage_id(id))?;
                (annotation.signature.id.as_deref() != Some(id)).then(|| (index, id.to_owned()))
            })
            .collect();

        if !changes.is_empty() {
            self.replace_with(|list| {
                for (index, id) in &changes {
                    list[*index].signature.id = Some(id.clone());
                }
            });
        }
        changes.len()
    }

    /// Pull every annotation fully onto the page
    ///
    /// Returns the ids of annotations that moved.
    pub fn clamp_to_page(&mut self, page: PageSize) -> Vec<AnnotationId> {
        let moves: Vec<(usize, DocPoint)> = self
            .annotations
            .iter()
            .enumerate()
            .filter_map(|(index, annotation)| {
                let signature = &annotation.signature;
                let clamped = clamp_origin(signature.origin(), signature.width, signature.height, page);
                (clamped != signature.origin()).then_some((index, clamped))
            })
            .collect();

        if moves.is_empty() {
            return Vec::new();
        }

        self.replace_with(|list| {
            for (index, origin) in &moves {
                let signature = &mut list[*index].signature;
                signature.x = origin.x;
                signature.y = origin.y;
            }
        });
        moves.iter().map(|(index, _)| self.annotations[*index].id).collect()
    }

    fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|annotation| annotation.id == id)
    }

    fn replace_with(&mut self, edit: impl FnOnce(&mut Vec<Annotation>)) {
        let mut next = self.annotations.as_ref().clone();
        edit(&mut next);
        self.annotations = Arc::new(next);
        self.revision += 1;
    }
}
