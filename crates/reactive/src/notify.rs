//! Registry of live queries.
//!
//! `QueryRegistry` tracks the query result caches of a collection through
//! weak references and routes change batches to every one that is still
//! alive. Caches are also indexed by shape fingerprint so that asking twice
//! for the same query shares one cache.

use crate::query_cache::QueryResultCache;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use reflux_query::{QueryId, QueryShape};

/// A query result cache shared between the registry and its holders.
pub type SharedQuery = Rc<RefCell<QueryResultCache>>;

/// Tracks live queries by id and by shape.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    /// Shape fingerprint -> queries with that fingerprint
    by_shape: HashMap<u64, Vec<Weak<RefCell<QueryResultCache>>>>,
    /// Query ID -> query reference
    queries: HashMap<QueryId, Weak<RefCell<QueryResultCache>>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a query under its own id.
    pub fn register(&mut self, query: &SharedQuery) -> QueryId {
        let (id, fingerprint) = {
            let cache = query.borrow();
            (cache.query().id(), cache.query().shape().fingerprint())
        };
        let weak = Rc::downgrade(query);
        self.by_shape.entry(fingerprint).or_default().push(weak.clone());
        self.queries.insert(id, weak);
        id
    }

    /// Finds a live query with exactly this shape.
    pub fn find_by_shape(&self, shape: &QueryShape) -> Option<SharedQuery> {
        self.by_shape
            .get(&shape.fingerprint())?
            .iter()
            .filter_map(Weak::upgrade)
            .find(|query| query.borrow().query().shape() == shape)
    }

    /// Returns true if the query was registered.
    pub fn unregister(&mut self, query_id: QueryId) -> bool {
        match self.queries.remove(&query_id) {
            Some(weak) => {
                for queries in self.by_shape.values_mut() {
                    queries.retain(|w| !w.ptr_eq(&weak));
                }
                self.by_shape.retain(|_, v| !v.is_empty());
                true
            }
            None => false,
        }
    }

    /// Returns every live query, oldest first.
    pub fn live(&self) -> Vec<SharedQuery> {
        let mut live: Vec<(QueryId, SharedQuery)> = self
            .queries
            .iter()
            .filter_map(|(id, weak)| weak.upgrade().map(|query| (*id, query)))
            .collect();
        live.sort_by_key(|(id, _)| *id);
        live.into_iter().map(|(_, query)| query).collect()
    }

    /// Number of registered queries that are still alive.
    pub fn query_count(&self) -> usize {
        self.queries.values().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.query_count() == 0
    }

    /// Drops references to queries nobody holds anymore.
    ///
    /// Returns the ids that were removed.
    pub fn cleanup(&mut self) -> Vec<QueryId> {
        let dead: Vec<QueryId> = self
            .queries
            .iter()
            .filter(|(_, w)| w.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        self.queries.retain(|_, w| w.strong_count() > 0);
        for queries in self.by_shape.values_mut() {
            queries.retain(|w| w.strong_count() > 0);
        }
        self.by_shape.retain(|_, v| !v.is_empty());
        dead
    }

    /// Drops every query. Returns the ids that were registered.
    pub fn clear(&mut self) -> Vec<QueryId> {
        self.by_shape.clear();
        self.queries.drain().map(|(id, _)| id).collect()
    }
}
