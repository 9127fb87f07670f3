//! In-memory storage backend.
//!
//! `MemoryStorage` keeps a primary document store and a local side store,
//! both keyed by document id. Every write is recorded in a `ChangeJournal`;
//! writes to the local store produce events flagged as local.

use crate::backend::{QueryResult, StorageBackend};
use crate::journal::ChangeJournal;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use reflux_core::{ChangeEvent, DocId, Document, Error, Result, Revision, Sequence};
use reflux_query::{QueryFunctions, QueryParams};
use tracing::trace;

/// One keyed store.
#[derive(Debug, Default)]
struct DocumentStore {
    live: BTreeMap<DocId, Rc<Document>>,
    /// Tombstone revision of every deleted id; a re-insert continues from it.
    retired: BTreeMap<DocId, Revision>,
}

impl DocumentStore {
    fn insert(
        &mut self,
        journal: &RefCell<ChangeJournal>,
        mut doc: Document,
        local: bool,
    ) -> Result<Sequence> {
        if self.live.contains_key(doc.id()) {
            return Err(Error::invalid_operation(alloc::format!(
                "document already exists: {}",
                doc.id()
            )));
        }
        if let Some(tombstone) = self.retired.remove(doc.id()) {
            doc.set_revision(doc.revision().max(tombstone.wrapping_add(1)));
        }
        let doc = Rc::new(doc);
        self.live.insert(DocId::from(doc.id()), doc.clone());
        trace!(document_id = doc.id(), revision = doc.revision(), local, "insert");
        Ok(journal.borrow_mut().record_insert(doc, local))
    }

    fn update(
        &mut self,
        journal: &RefCell<ChangeJournal>,
        mut doc: Document,
        local: bool,
    ) -> Result<Sequence> {
        let previous = self
            .live
            .get(doc.id())
            .cloned()
            .ok_or_else(|| Error::document_not_found(doc.id()))?;
        doc.set_revision(previous.revision().wrapping_add(1));
        let doc = Rc::new(doc);
        self.live.insert(DocId::from(doc.id()), doc.clone());
        trace!(document_id = doc.id(), revision = doc.revision(), local, "update");
        Ok(journal.borrow_mut().record_update(previous, doc, local))
    }

    fn delete(
        &mut self,
        journal: &RefCell<ChangeJournal>,
        id: &str,
        local: bool,
    ) -> Result<Sequence> {
        let previous = self.live.remove(id).ok_or_else(|| Error::document_not_found(id))?;
        // Same revision the tombstone carries downstream
        self.retired.insert(DocId::from(id), previous.revision().wrapping_add(1));
        trace!(document_id = id, local, "delete");
        Ok(journal.borrow_mut().record_delete(previous, local))
    }

    fn upsert(
        &mut self,
        journal: &RefCell<ChangeJournal>,
        doc: Document,
        local: bool,
    ) -> Result<Sequence> {
        if self.live.contains_key(doc.id()) {
            self.update(journal, doc, local)
        } else {
            self.insert(journal, doc, local)
        }
    }
}

/// In-memory document store with an ordered change stream.
#[derive(Debug)]
pub struct MemoryStorage {
    primary_key: String,
    documents: RefCell<DocumentStore>,
    local: RefCell<DocumentStore>,
    journal: RefCell<ChangeJournal>,
    available: Cell<bool>,
    queries: Cell<u64>,
}

impl MemoryStorage {
    /// Creates an empty store whose documents are keyed by `primary_key`.
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            documents: RefCell::new(DocumentStore::default()),
            local: RefCell::new(DocumentStore::default()),
            journal: RefCell::new(ChangeJournal::new()),
            available: Cell::new(true),
            queries: Cell::new(0),
        }
    }

    /// Inserts a new document into the primary store.
    ///
    /// Re-inserting a deleted id continues the revisions of the deleted
    /// document.
    pub fn insert(&self, doc: Document) -> Result<Sequence> {
        self.documents.borrow_mut().insert(&self.journal, doc, false)
    }

    /// Replaces an existing document in the primary store.
    ///
    /// The stored revision becomes the previous revision plus one.
    pub fn update(&self, doc: Document) -> Result<Sequence> {
        self.documents.borrow_mut().update(&self.journal, doc, false)
    }

    /// Inserts or updates a document in the primary store.
    pub fn upsert(&self, doc: Document) -> Result<Sequence> {
        self.documents.borrow_mut().upsert(&self.journal, doc, false)
    }

    /// Deletes a document from the primary store.
    pub fn delete(&self, id: &str) -> Result<Sequence> {
        self.documents.borrow_mut().delete(&self.journal, id, false)
    }

    /// Inserts or updates a document in the local store.
    pub fn upsert_local(&self, doc: Document) -> Result<Sequence> {
        self.local.borrow_mut().upsert(&self.journal, doc, true)
    }

    /// Deletes a document from the local store.
    pub fn delete_local(&self, id: &str) -> Result<Sequence> {
        self.local.borrow_mut().delete(&self.journal, id, true)
    }

    /// Gets a document from the primary store.
    pub fn get(&self, id: &str) -> Option<Rc<Document>> {
        self.documents.borrow().live.get(id).cloned()
    }

    /// Gets a document from the local store.
    pub fn get_local(&self, id: &str) -> Option<Rc<Document>> {
        self.local.borrow().live.get(id).cloned()
    }

    /// Returns the number of documents in the primary store.
    pub fn len(&self) -> usize {
        self.documents.borrow().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.borrow().live.is_empty()
    }

    /// Returns the last sequence number handed out.
    pub fn last_sequence(&self) -> Sequence {
        self.journal.borrow().last_sequence()
    }

    /// Makes reads fail with a storage error until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Returns how many full queries have been served.
    pub fn query_count(&self) -> u64 {
        self.queries.get()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.get() {
            Ok(())
        } else {
            Err(Error::storage("memory storage is unavailable"))
        }
    }
}

impl QueryFunctions for MemoryStorage {}

impl StorageBackend for MemoryStorage {
    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    async fn query(&self, params: &QueryParams) -> Result<QueryResult> {
        self.ensure_available()?;
        self.queries.set(self.queries.get() + 1);

        let mut matching: Vec<Rc<Document>> = self
            .documents
            .borrow()
            .live
            .values()
            .filter(|doc| params.matches(doc))
            .cloned()
            .collect();
        matching.sort_by(|a, b| params.compare(a, b));

        let skip = params.skip_count();
        let documents: Vec<Rc<Document>> = match params.limit {
            Some(limit) => matching.into_iter().skip(skip).take(limit).collect(),
            None => matching.into_iter().skip(skip).collect(),
        };
        let sequence = self.last_sequence();
        trace!(results = documents.len(), sequence, "full query");
        Ok(QueryResult::new(documents, sequence))
    }

    async fn find_documents_by_id(&self, ids: &[DocId]) -> Result<Vec<Rc<Document>>> {
        self.ensure_available()?;
        let store = self.documents.borrow();
        Ok(ids
            .iter()
            .filter_map(|id| store.live.get(id.as_str()))
            .filter(|doc| !doc.is_deleted())
            .cloned()
            .collect())
    }

    fn drain_changes(&self) -> Vec<ChangeEvent> {
        self.journal.borrow_mut().drain()
    }
}
