//! Document structure for Reflux collections.
//!
//! This module defines the `Document` struct which represents a single
//! schema-shaped document with a primary key and a revision marker.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;

/// Primary key of a document within its collection.
pub type DocId = String;

/// Monotonically increasing revision marker. Incremented on each write.
pub type Revision = u64;

/// A document in a collection.
#[derive(Clone, Debug)]
pub struct Document {
    /// Primary key value.
    id: DocId,
    /// Revision marker for change detection.
    revision: Revision,
    /// Tombstone flag, set once the document has been deleted.
    deleted: bool,
    /// Top-level fields by name.
    fields: BTreeMap<String, Value>,
}

impl Document {
    /// Creates a new document with the given id and no fields.
    /// Revision defaults to 1 for new documents.
    pub fn new(id: impl Into<DocId>) -> Self {
        Self {
            id: id.into(),
            revision: 1,
            deleted: false,
            fields: BTreeMap::new(),
        }
    }

    /// Creates a new document with the given id, revision and fields.
    pub fn with_fields(
        id: impl Into<DocId>,
        revision: Revision,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            revision,
            deleted: false,
            fields,
        }
    }

    /// Builder-style field setter.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the document id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the revision marker.
    #[inline]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Sets the revision marker.
    #[inline]
    pub fn set_revision(&mut self, revision: Revision) {
        self.revision = revision;
    }

    /// Returns true if this document is a deletion tombstone.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns a tombstone copy of this document with the next revision.
    pub fn to_deleted(&self) -> Self {
        Self {
            id: self.id.clone(),
            revision: self.revision.wrapping_add(1),
            deleted: true,
            fields: self.fields.clone(),
        }
    }

    /// Returns a reference to the top-level fields.
    #[inline]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Sets a top-level field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a top-level field.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Gets a value by dotted path (`"address.city"`).
    ///
    /// Returns `None` when any segment of the path is missing or does not
    /// resolve to an object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns a copy carrying the next revision, ready to be modified.
    pub fn next_revision(&self) -> Self {
        let mut next = self.clone();
        next.revision = self.revision.wrapping_add(1);
        next
    }

    /// Returns the number of top-level fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if this document has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.revision == other.revision
            && self.deleted == other.deleted
            && self.fields == other.fields
    }
}

impl Eq for Document {}
