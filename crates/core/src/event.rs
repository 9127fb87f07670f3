//! Change events emitted by the storage layer.
//!
//! A `ChangeEvent` describes one committed write. Events are immutable once
//! created and carry both the previous and the new document data so that
//! consumers can reason about the write without consulting storage.

use crate::document::{DocId, Document};
use alloc::rc::Rc;

/// Per-collection sequence number of a committed write.
pub type Sequence = u64;

/// Kind of write a change event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeOperation {
    /// A document was inserted.
    Insert,
    /// A document was updated.
    Update,
    /// A document was deleted.
    Delete,
}

/// A single committed write.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    operation: ChangeOperation,
    document_id: DocId,
    /// New data; present for inserts and updates.
    document: Option<Rc<Document>>,
    /// Previous data; present for updates and deletes.
    previous: Option<Rc<Document>>,
    sequence: Sequence,
    /// True when the event comes from the collection's local side store.
    is_local: bool,
}

impl ChangeEvent {
    /// Creates an insert event.
    pub fn insert(sequence: Sequence, document: Rc<Document>) -> Self {
        Self {
            operation: ChangeOperation::Insert,
            document_id: document.id().into(),
            document: Some(document),
            previous: None,
            sequence,
            is_local: false,
        }
    }

    /// Creates an update event.
    pub fn update(sequence: Sequence, previous: Rc<Document>, document: Rc<Document>) -> Self {
        Self {
            operation: ChangeOperation::Update,
            document_id: document.id().into(),
            document: Some(document),
            previous: Some(previous),
            sequence,
            is_local: false,
        }
    }

    /// Creates a delete event.
    pub fn delete(sequence: Sequence, previous: Rc<Document>) -> Self {
        Self {
            operation: ChangeOperation::Delete,
            document_id: previous.id().into(),
            document: None,
            previous: Some(previous),
            sequence,
            is_local: false,
        }
    }

    /// Marks this event as originating from the local side store.
    pub fn into_local(mut self) -> Self {
        self.is_local = true;
        self
    }

    /// Returns the operation kind.
    #[inline]
    pub fn operation(&self) -> ChangeOperation {
        self.operation
    }

    /// Returns the id of the written document.
    #[inline]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Returns the new document data, if any.
    #[inline]
    pub fn document(&self) -> Option<&Rc<Document>> {
        self.document.as_ref()
    }

    /// Returns the previous document data, if any.
    #[inline]
    pub fn previous(&self) -> Option<&Rc<Document>> {
        self.previous.as_ref()
    }

    /// Returns the sequence number of this write.
    #[inline]
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    /// Returns true when the event comes from the local side store.
    #[inline]
    pub fn is_local(&self) -> bool {
        self.is_local
    }
}
