//! The result window of a query subscription.
//!
//! A `ResultWindow` holds the current page of a query: an ordered sequence of
//! documents plus an id lookup that mirrors the sequence exactly. Documents
//! are shared snapshots (`Rc<Document>`); the window never owns a private copy.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::HashMap;
use reflux_core::Document;
use reflux_query::QueryParams;

/// Ordered, paginated query result with an id lookup.
#[derive(Clone, Debug, Default)]
pub struct ResultWindow {
    docs: Vec<Rc<Document>>,
    index: HashMap<String, Rc<Document>>,
}

impl ResultWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a window from documents already sorted by the query comparator.
    pub fn from_sorted(docs: Vec<Rc<Document>>) -> Self {
        let index = docs.iter().map(|d| (String::from(d.id()), d.clone())).collect();
        Self { docs, index }
    }

    /// Returns the documents in order.
    #[inline]
    pub fn documents(&self) -> &[Rc<Document>] {
        &self.docs
    }

    /// Returns the ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.docs.iter().map(|d| d.id())
    }

    /// Looks a document up by id.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&Rc<Document>> {
        self.index.get(id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&Rc<Document>> {
        self.docs.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&Rc<Document>> {
        self.docs.last()
    }

    /// Returns the position of a document in the sequence.
    pub fn position_of(&self, id: &str, params: &QueryParams) -> Option<usize> {
        let doc = self.index.get(id)?;
        match self.docs.binary_search_by(|candidate| params.compare(candidate, doc)) {
            Ok(pos) if self.docs[pos].id() == id => Some(pos),
            _ => self.docs.iter().position(|d| d.id() == id),
        }
    }

    /// Returns true if the lookup mirrors the sequence and the sequence is
    /// strictly ordered by the comparator.
    pub fn is_consistent(&self, params: &QueryParams) -> bool {
        self.index.len() == self.docs.len()
            && self.docs.iter().all(|d| self.index.get(d.id()).is_some_and(|i| Rc::ptr_eq(i, d)))
            && self.docs.windows(2).all(|pair| params.compare(&pair[0], &pair[1]) == Ordering::Less)
    }

    /// Returns true if both windows hold the same document snapshots in the same order.
    pub fn ptr_eq(&self, other: &ResultWindow) -> bool {
        self.docs.len() == other.docs.len() && self.docs.iter().zip(&other.docs).all(|(a, b)| Rc::ptr_eq(a, b))
    }

    pub(crate) fn insert_at(&mut self, at: usize, doc: Rc<Document>) {
        self.index.insert(String::from(doc.id()), doc.clone());
        self.docs.insert(at, doc);
    }

    pub(crate) fn remove_at(&mut self, at: usize) -> Rc<Document> {
        let doc = self.docs.remove(at);
        self.index.remove(doc.id());
        doc
    }

    pub(crate) fn pop_last(&mut self) -> Option<Rc<Document>> {
        let doc = self.docs.pop()?;
        self.index.remove(doc.id());
        Some(doc)
    }
}
