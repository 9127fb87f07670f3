//! Canonical document identity.
//!
//! The `DocumentCache` holds exactly one `DocumentHandle` per document id.
//! Handles are shared: when the ingestion path upserts a newer revision, the
//! data behind every previously returned handle changes with it.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use hashbrown::HashMap;
use reflux_core::{DocId, Document, Revision};

struct DocumentSlot {
    id: DocId,
    data: RefCell<Rc<Document>>,
}

/// Shared reference to the canonical state of one document.
#[derive(Clone)]
pub struct DocumentHandle(Rc<DocumentSlot>);

impl DocumentHandle {
    fn new(doc: Rc<Document>) -> Self {
        Self(Rc::new(DocumentSlot {
            id: DocId::from(doc.id()),
            data: RefCell::new(doc),
        }))
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Returns the current data.
    pub fn get(&self) -> Rc<Document> {
        self.0.data.borrow().clone()
    }

    pub fn revision(&self) -> Revision {
        self.0.data.borrow().revision()
    }

    pub fn is_deleted(&self) -> bool {
        self.0.data.borrow().is_deleted()
    }

    /// Returns true if both handles refer to the same canonical document.
    pub fn ptr_eq(&self, other: &DocumentHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Moves the handle to `doc` unless it already holds newer data.
    ///
    /// A live document always supersedes a tombstone: writes reach the cache
    /// in sequence order, so a live document seen after a delete was written
    /// after it.
    fn replace(&self, doc: Rc<Document>) -> bool {
        let mut data = self.0.data.borrow_mut();
        if !supersedes(&doc, &data) {
            return false;
        }
        *data = doc;
        true
    }
}

fn supersedes(next: &Document, current: &Document) -> bool {
    next.revision() >= current.revision() || (current.is_deleted() && !next.is_deleted())
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DocumentHandle").field(&*self.0.data.borrow()).finish()
    }
}

/// The identity cache of a collection, shared with its live queries.
pub type SharedDocuments = Rc<RefCell<DocumentCache>>;

/// Id-keyed map of canonical document handles.
///
/// Entries live as long as the cache. Only the ingestion path writes; every
/// other component reads.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<DocId, DocumentHandle>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the canonical handle for a document.
    pub fn get(&self, id: &str) -> Option<DocumentHandle> {
        self.entries.get(id).cloned()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Installs a document or moves the existing handle to the new data.
    ///
    /// Data older than what the handle already holds is ignored.
    pub fn upsert(&mut self, doc: Rc<Document>) -> DocumentHandle {
        match self.entries.get(doc.id()) {
            Some(handle) => {
                handle.replace(doc);
                handle.clone()
            }
            None => {
                let handle = DocumentHandle::new(doc);
                self.entries.insert(DocId::from(handle.id()), handle.clone());
                handle
            }
        }
    }

    /// Returns the existing handle, or installs `doc` if the id is unknown.
    ///
    /// Used for documents read from storage; an existing handle is moved
    /// forward only when `doc` is strictly newer or revives a tombstone.
    pub fn get_or_insert(&mut self, doc: Rc<Document>) -> DocumentHandle {
        match self.entries.get(doc.id()) {
            Some(handle) => {
                let revives = handle.is_deleted() && !doc.is_deleted();
                if revives || doc.revision() > handle.revision() {
                    handle.replace(doc);
                }
                handle.clone()
            }
            None => self.upsert(doc),
        }
    }

    /// Resolves ids to their canonical handles, skipping unknown ids.
    pub fn resolve<'a, I>(&self, ids: I) -> Vec<DocumentHandle>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, revision: Revision, name: &str) -> Rc<Document> {
        let mut doc = Document::new(id).field("name", name);
        doc.set_revision(revision);
        Rc::new(doc)
    }

    #[test]
    fn test_upsert_preserves_identity() {
        let mut cache = DocumentCache::new();
        let first = cache.upsert(doc("a", 1, "alice"));
        let second = cache.upsert(doc("a", 2, "alicia"));

        assert!(first.ptr_eq(&second));
        assert_eq!(first.revision(), 2);
        assert_eq!(first.get().get("name").and_then(|v| v.as_str()), Some("alicia"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_upsert_ignored() {
        let mut cache = DocumentCache::new();
        let handle = cache.upsert(doc("a", 3, "new"));
        cache.upsert(doc("a", 2, "old"));
        assert_eq!(handle.revision(), 3);
    }

    #[test]
    fn test_get_or_insert() {
        let mut cache = DocumentCache::new();
        let installed = cache.get_or_insert(doc("a", 1, "x"));
        let again = cache.get_or_insert(doc("a", 1, "y"));
        assert!(installed.ptr_eq(&again));
        assert_eq!(again.get().get("name").and_then(|v| v.as_str()), Some("x"));

        cache.get_or_insert(doc("a", 2, "z"));
        assert_eq!(installed.revision(), 2);
    }

    #[test]
    fn test_reinsert_revives_tombstone() {
        let mut cache = DocumentCache::new();
        let live = doc("a", 1, "first");
        let handle = cache.upsert(live.clone());
        cache.upsert(Rc::new(live.to_deleted()));
        assert!(handle.is_deleted());

        // A backend that restarts revisions on re-insert
        cache.upsert(doc("a", 1, "second"));
        assert!(!handle.is_deleted());
        assert_eq!(handle.get().get("name").and_then(|v| v.as_str()), Some("second"));

        cache.upsert(Rc::new(handle.get().to_deleted()));
        let read = cache.get_or_insert(doc("a", 1, "third"));
        assert!(read.ptr_eq(&handle));
        assert!(!handle.is_deleted());
    }

    #[test]
    fn test_stale_tombstone_ignored() {
        let mut cache = DocumentCache::new();
        let handle = cache.upsert(doc("a", 5, "current"));
        cache.upsert(Rc::new(doc("a", 3, "old").to_deleted()));
        assert!(!handle.is_deleted());
        assert_eq!(handle.revision(), 5);
    }

    #[test]
    fn test_resolve() {
        let mut cache = DocumentCache::new();
        cache.upsert(doc("a", 1, "x"));
        cache.upsert(doc("b", 1, "y"));
        let handles = cache.resolve(["b", "missing", "a"]);
        let ids: Vec<&str> = handles.iter().map(|h| h.id()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_deleted_tombstone() {
        let mut cache = DocumentCache::new();
        let live = doc("a", 1, "x");
        let handle = cache.upsert(live.clone());
        cache.upsert(Rc::new(live.to_deleted()));
        assert!(handle.is_deleted());
        assert!(cache.contains("a"));
        assert!(cache.get("missing").is_none());
    }
}
