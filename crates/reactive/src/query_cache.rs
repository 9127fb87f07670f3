//! Live query results.
//!
//! A `QueryResultCache` owns the current `ResultWindow` of one query and
//! keeps it equal to what a fresh execution of the query would return. Change
//! events are first offered to the event-reduce engine; when the engine
//! cannot derive the new window, the query runs again against storage.
//!
//! The window itself stays private. Readers get the canonical handles of the
//! collection's identity cache, so a document always shows its latest data
//! no matter which query it was reached through.

use crate::doc_cache::{DocumentHandle, SharedDocuments};
use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use reflux_core::{ChangeEvent, Error, Result, Sequence};
use reflux_incremental::{calculate_new_results, ReduceOutcome, ResultWindow};
use reflux_query::{Query, QueryParams};
use reflux_storage::{QueryResult, StorageBackend};
use tracing::{trace, warn};

/// Result of applying a batch without touching storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Unchanged,
    Updated,
    /// The window cannot be derived locally; the query must run again.
    MustRequery,
}

/// Result of `QueryResultCache::process`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    Unchanged,
    Updated,
    /// The query ran again; `changed` tells whether the window differs.
    Requeried { changed: bool },
}

/// The maintained result of one query.
pub struct QueryResultCache {
    query: Query,
    params: Rc<QueryParams>,
    documents: SharedDocuments,
    window: ResultWindow,
    /// Change-buffer counter this window reflects.
    cursor: u64,
    /// Sequence of the last write this window reflects.
    sequence: Sequence,
    event_reduce: bool,
    initialized: bool,
    /// Set when a full query failed; the next batch retries it.
    stale: bool,
    /// A full query is in flight; no batch may be applied until it lands.
    requerying: bool,
    requery_count: u64,
    subscriptions: SubscriptionManager<[DocumentHandle]>,
}

impl QueryResultCache {
    /// Creates a cache with no result yet. The first batch runs the query.
    pub fn new(
        query: Query,
        params: Rc<QueryParams>,
        documents: SharedDocuments,
        event_reduce: bool,
    ) -> Self {
        Self {
            query,
            params,
            documents,
            window: ResultWindow::new(),
            cursor: 0,
            sequence: 0,
            event_reduce,
            initialized: false,
            stale: false,
            requerying: false,
            requery_count: 0,
            subscriptions: SubscriptionManager::new(),
        }
    }

    #[inline]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[inline]
    pub fn params(&self) -> &Rc<QueryParams> {
        &self.params
    }

    /// Ids of the committed result, in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.window.ids()
    }

    /// Canonical handles of the committed result, in order.
    pub fn documents(&self) -> Vec<DocumentHandle> {
        self.documents.borrow().resolve(self.window.ids())
    }

    /// Canonical handle of a document in the result.
    pub fn get(&self, id: &str) -> Option<DocumentHandle> {
        if self.window.contains(id) {
            self.documents.borrow().get(id)
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// True if the result is sorted by the query comparator and its lookup
    /// mirrors the sequence.
    pub fn is_consistent(&self) -> bool {
        self.window.is_consistent(&self.params)
    }

    #[inline]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    #[inline]
    pub fn set_cursor(&mut self, cursor: u64) {
        self.cursor = cursor;
    }

    /// Sequence of the last write the result reflects.
    #[inline]
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    #[inline]
    pub fn is_requerying(&self) -> bool {
        self.requerying
    }

    /// Number of full queries that have reset the window.
    #[inline]
    pub fn requery_count(&self) -> u64 {
        self.requery_count
    }

    /// Subscribes to committed results.
    ///
    /// The callback runs after every batch that changed the window, whether
    /// derived incrementally or by a full query.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&[DocumentHandle]) + 'static,
    {
        self.subscriptions.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Runs a batch through the event-reduce engine and commits the result.
    ///
    /// Local events and writes the window already reflects are skipped.
    /// Nothing is committed when the outcome is `MustRequery`.
    pub fn apply_events(&mut self, events: &[ChangeEvent]) -> ApplyOutcome {
        if self.stale || !self.initialized {
            return ApplyOutcome::MustRequery;
        }
        let fresh: Vec<ChangeEvent> = events
            .iter()
            .filter(|e| !e.is_local() && e.sequence() > self.sequence)
            .cloned()
            .collect();
        if fresh.is_empty() {
            return ApplyOutcome::Unchanged;
        }
        if !self.event_reduce {
            return ApplyOutcome::MustRequery;
        }

        let last = fresh.iter().map(ChangeEvent::sequence).max().unwrap_or(self.sequence);
        match calculate_new_results(&self.params, &fresh, &self.window) {
            ReduceOutcome::Unchanged => {
                self.sequence = last;
                ApplyOutcome::Unchanged
            }
            ReduceOutcome::RunFullQueryAgain => {
                trace!(query_id = self.query.id(), events = fresh.len(), "event reduce gave up");
                ApplyOutcome::MustRequery
            }
            ReduceOutcome::Updated(window) => {
                self.window = window;
                self.sequence = last;
                self.notify();
                ApplyOutcome::Updated
            }
        }
    }

    /// Applies a batch, running the query again when required.
    ///
    /// The cache is not borrowed while storage runs. A storage failure leaves
    /// the previous window in place, marks the cache stale and is returned to
    /// the caller. Fails with `InvalidOperation` while a full query of the
    /// same cache is still in flight.
    pub async fn process<S: StorageBackend>(
        this: &RefCell<Self>,
        events: &[ChangeEvent],
        storage: &S,
    ) -> Result<ProcessOutcome> {
        let outcome = {
            let mut cache = this.borrow_mut();
            cache.ensure_idle()?;
            cache.apply_events(events)
        };
        match outcome {
            ApplyOutcome::Unchanged => Ok(ProcessOutcome::Unchanged),
            ApplyOutcome::Updated => Ok(ProcessOutcome::Updated),
            ApplyOutcome::MustRequery => {
                let changed = Self::requery(this, storage).await?;
                Ok(ProcessOutcome::Requeried { changed })
            }
        }
    }

    /// Runs the query against storage and resets the window.
    ///
    /// Returns true if the result differs from the previous window.
    pub async fn requery<S: StorageBackend>(this: &RefCell<Self>, storage: &S) -> Result<bool> {
        let params = {
            let mut cache = this.borrow_mut();
            cache.ensure_idle()?;
            cache.requerying = true;
            cache.params.clone()
        };
        let in_flight = InFlight(this);
        let result = storage.query(&params).await;
        let outcome = this.borrow_mut().finish_requery(result);
        drop(in_flight);
        outcome
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.requerying {
            Err(Error::invalid_operation(format!(
                "query {} is already running against storage",
                self.query.id()
            )))
        } else {
            Ok(())
        }
    }

    fn finish_requery(&mut self, result: Result<QueryResult>) -> Result<bool> {
        self.requerying = false;
        match result {
            Ok(result) => Ok(self.reset(result)),
            Err(err) => {
                warn!(query_id = self.query.id(), error = %err, "full query failed");
                self.stale = true;
                Err(err)
            }
        }
    }

    /// Replaces the window with a fresh query result.
    ///
    /// The documents are installed in the identity cache. Subscribers are
    /// notified only if the ordered ids or revisions changed.
    fn reset(&mut self, result: QueryResult) -> bool {
        {
            let mut documents = self.documents.borrow_mut();
            for doc in &result.documents {
                documents.get_or_insert(doc.clone());
            }
        }
        let window = ResultWindow::from_sorted(result.documents);
        let changed = !self.initialized || !same_content(&self.window, &window);
        self.window = window;
        self.sequence = result.sequence;
        self.initialized = true;
        self.stale = false;
        self.requery_count += 1;
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        if self.subscriptions.is_empty() {
            return;
        }
        let handles = self.documents();
        self.subscriptions.notify_all(&handles);
    }
}

impl core::fmt::Debug for QueryResultCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueryResultCache")
            .field("query", &self.query.id())
            .field("len", &self.window.len())
            .field("cursor", &self.cursor)
            .field("sequence", &self.sequence)
            .field("stale", &self.stale)
            .finish()
    }
}

/// Marks the cache stale if a full query is abandoned before it lands.
struct InFlight<'a>(&'a RefCell<QueryResultCache>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut cache) = self.0.try_borrow_mut() {
            if cache.requerying {
                cache.requerying = false;
                cache.stale = true;
            }
        }
    }
}

/// Same ids in the same order, each at the same revision.
fn same_content(a: &ResultWindow, b: &ResultWindow) -> bool {
    a.len() == b.len()
        && a.documents()
            .iter()
            .zip(b.documents())
            .all(|(x, y)| x.id() == y.id() && x.revision() == y.revision())
}
