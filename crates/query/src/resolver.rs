//! Memoized resolution of query parameters.
//!
//! `QueryParamsResolver` turns a query instance into the `QueryParams` used by
//! the incremental engine. The backend comparator and matcher are wrapped with
//! the registered hooks and the comparator is completed with a primary-key
//! tie-break, so the result is a strict total order. Parameters are computed
//! once per query instance and reused for every event.

use crate::hooks::{HookRegistry, QueryMatcherData, SortComparatorData};
use crate::params::{QueryFunctions, QueryMatcher, QueryParams, SortComparator};
use crate::query::{Query, QueryId};
use crate::sort::{compare_by_primary_key, sort_fields_of_query};
use alloc::borrow::Cow;
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use reflux_core::Document;

/// Per-collection resolver and cache of query parameters.
pub struct QueryParamsResolver {
    primary_key: String,
    hooks: Rc<HookRegistry>,
    cache: RefCell<HashMap<QueryId, Rc<QueryParams>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl QueryParamsResolver {
    /// Creates a resolver for a collection with the given primary key.
    pub fn new(primary_key: impl Into<String>, hooks: Rc<HookRegistry>) -> Self {
        Self {
            primary_key: primary_key.into(),
            hooks,
            cache: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Returns the primary key field name.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Returns the parameters of a query, computing them on first use.
    pub fn resolve<F>(&self, query: &Query, functions: &F) -> Rc<QueryParams>
    where
        F: QueryFunctions + ?Sized,
    {
        if let Some(params) = self.cache.borrow().get(&query.id()) {
            self.hits.set(self.hits.get() + 1);
            return params.clone();
        }
        self.misses.set(self.misses.get() + 1);

        let shape = query.shape();
        let comparator = self.wrap_comparator(query, functions.sort_comparator(&self.primary_key, shape));
        let matcher = self.wrap_matcher(query, functions.query_matcher(&self.primary_key, shape));
        let params = Rc::new(QueryParams::new(
            self.primary_key.clone(),
            shape.skip,
            shape.limit,
            sort_fields_of_query(&self.primary_key, &shape.sort),
            comparator,
            matcher,
        ));
        tracing::trace!(query_id = query.id(), "resolved query params");
        self.cache.borrow_mut().insert(query.id(), params.clone());
        params
    }

    /// Drops the cached parameters of a query that is no longer used.
    pub fn forget(&self, query_id: QueryId) -> bool {
        self.cache.borrow_mut().remove(&query_id).is_some()
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    /// Returns (hits, misses).
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.get(), self.misses.get())
    }

    fn wrap_comparator(&self, query: &Query, backend: SortComparator) -> SortComparator {
        let hooks = self.hooks.clone();
        let query = query.clone();
        Rc::new(move |a: &Document, b: &Document| {
            let ord = if hooks.has_pre_sort_comparator() {
                let mut data = SortComparatorData {
                    doc_a: Cow::Borrowed(a),
                    doc_b: Cow::Borrowed(b),
                    query: &query,
                };
                hooks.run_pre_sort_comparator(&mut data);
                backend(&data.doc_a, &data.doc_b)
            } else {
                backend(a, b)
            };
            ord.then_with(|| compare_by_primary_key(a, b))
        })
    }

    fn wrap_matcher(&self, query: &Query, backend: QueryMatcher) -> QueryMatcher {
        let hooks = self.hooks.clone();
        let query = query.clone();
        Rc::new(move |doc: &Document| {
            if doc.is_deleted() {
                return false;
            }
            if hooks.has_pre_query_matcher() {
                let mut data = QueryMatcherData {
                    doc: Cow::Borrowed(doc),
                    query: &query,
                };
                hooks.run_pre_query_matcher(&mut data);
                backend(&data.doc)
            } else {
                backend(doc)
            }
        })
    }
}
