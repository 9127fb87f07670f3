//! Live lookup of a fixed set of document ids.

use crate::buffer::reduce_by_last_of_doc;
use crate::doc_cache::{DocumentCache, DocumentHandle};
use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};
use reflux_core::{ChangeEvent, ChangeOperation, DocId};

/// Keeps an id -> document map current for a fixed set of ids.
///
/// Created by `Collection::observe_ids` and brought up to date with
/// `Collection::refresh_ids`.
#[derive(Debug)]
pub struct IdsObserver {
    ids: Vec<DocId>,
    tracked: HashSet<DocId>,
    documents: HashMap<DocId, DocumentHandle>,
    /// Change-buffer counter the map reflects.
    cursor: u64,
}

impl IdsObserver {
    pub(crate) fn new(
        ids: Vec<DocId>,
        documents: HashMap<DocId, DocumentHandle>,
        cursor: u64,
    ) -> Self {
        let tracked = ids.iter().cloned().collect();
        Self {
            ids,
            tracked,
            documents,
            cursor,
        }
    }

    /// The observed ids, in the order they were requested.
    pub fn ids(&self) -> &[DocId] {
        &self.ids
    }

    /// Returns the current handle for an id, if the document exists.
    pub fn get(&self, id: &str) -> Option<&DocumentHandle> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> &HashMap<DocId, DocumentHandle> {
        &self.documents
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[inline]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub(crate) fn reset(&mut self, documents: HashMap<DocId, DocumentHandle>, cursor: u64) {
        self.documents = documents;
        self.cursor = cursor;
    }

    /// Applies buffered events for the tracked ids. Returns true if the map changed.
    ///
    /// Only the last event of each id matters: the map holds canonical
    /// handles, which already carry the final data.
    pub(crate) fn apply(
        &mut self,
        events: &[ChangeEvent],
        cache: &DocumentCache,
        cursor: u64,
    ) -> bool {
        let tracked: Vec<ChangeEvent> = events
            .iter()
            .filter(|e| !e.is_local() && self.tracked.contains(e.document_id()))
            .cloned()
            .collect();
        let mut changed = false;
        for event in reduce_by_last_of_doc(&tracked) {
            let id = event.document_id();
            let live = match event.operation() {
                ChangeOperation::Insert | ChangeOperation::Update => {
                    cache.get(id).filter(|handle| !handle.is_deleted())
                }
                ChangeOperation::Delete => None,
            };
            match live {
                Some(handle) => {
                    self.documents.insert(DocId::from(id), handle);
                    changed = true;
                }
                None => changed |= self.documents.remove(id).is_some(),
            }
        }
        self.cursor = cursor;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use reflux_core::Document;

    fn doc(id: &str, revision: u64) -> Rc<Document> {
        let mut doc = Document::new(id);
        doc.set_revision(revision);
        Rc::new(doc)
    }

    fn observer(ids: &[&str]) -> IdsObserver {
        IdsObserver::new(ids.iter().map(|id| DocId::from(*id)).collect(), HashMap::new(), 0)
    }

    #[test]
    fn test_insert_then_delete_leaves_id_absent() {
        let mut cache = DocumentCache::new();
        let inserted = doc("a", 1);
        let deleted = Rc::new(inserted.to_deleted());
        cache.upsert(deleted);

        let events = vec![ChangeEvent::insert(1, inserted.clone()), ChangeEvent::delete(2, inserted)];
        let mut observer = observer(&["a"]);
        assert!(!observer.apply(&events, &cache, 2));
        assert!(observer.get("a").is_none());
        assert_eq!(observer.cursor(), 2);
    }

    #[test]
    fn test_delete_then_reinsert_is_live() {
        let mut cache = DocumentCache::new();
        let first = doc("a", 1);
        cache.upsert(Rc::new(first.to_deleted()));
        let again = doc("a", 3);
        cache.upsert(again.clone());

        let events = vec![ChangeEvent::delete(1, first), ChangeEvent::insert(2, again)];
        let mut observer = observer(&["a"]);
        assert!(observer.apply(&events, &cache, 2));
        let handle = observer.get("a").unwrap();
        assert!(!handle.is_deleted());
        assert!(handle.ptr_eq(&cache.get("a").unwrap()));
    }

    #[test]
    fn test_untracked_and_local_events_ignored() {
        let mut cache = DocumentCache::new();
        cache.upsert(doc("b", 1));
        cache.upsert(doc("a", 1));

        let events = vec![
            ChangeEvent::insert(1, doc("b", 1)),
            ChangeEvent::insert(2, doc("a", 1)).into_local(),
        ];
        let mut observer = observer(&["a"]);
        assert!(!observer.apply(&events, &cache, 2));
        assert!(observer.is_empty());
    }
}
