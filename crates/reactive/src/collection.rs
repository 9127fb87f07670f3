//! A collection: the ingestion path and the live queries over one store.
//!
//! Change events enter through `ingest` in sequence order. Each batch is
//! recorded in the change buffer, moves the canonical documents forward and is
//! then routed to every live query. Each query reads the buffer from its own
//! cursor, so every query sees every event once and in order even when its
//! processing is suspended on a full query. A query takes no events while its
//! full query is in flight; it catches up once the result lands.

use crate::buffer::{BufferRead, ChangeEventBuffer};
use crate::doc_cache::{DocumentCache, DocumentHandle, SharedDocuments};
use crate::ids_observer::IdsObserver;
use crate::notify::{QueryRegistry, SharedQuery};
use crate::options::DatabaseOptions;
use crate::query_cache::QueryResultCache;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use reflux_core::{ChangeEvent, ChangeOperation, DocId, Error, Result, Sequence};
use reflux_query::{HookRegistry, Query, QueryParamsResolver, QueryShape};
use reflux_storage::StorageBackend;
use tracing::{debug, info, trace};

/// Live view over one storage backend.
pub struct Collection<S: StorageBackend> {
    name: String,
    storage: Rc<S>,
    options: DatabaseOptions,
    resolver: QueryParamsResolver,
    documents: SharedDocuments,
    buffer: RefCell<ChangeEventBuffer>,
    registry: RefCell<QueryRegistry>,
    local_listeners: RefCell<SubscriptionManager<ChangeEvent>>,
    last_sequence: Cell<Sequence>,
    closed: Cell<bool>,
}

impl<S: StorageBackend> Collection<S> {
    /// Creates a collection over `storage`.
    pub fn new(name: impl Into<String>, storage: Rc<S>, options: DatabaseOptions) -> Result<Self> {
        Self::with_hooks(name, storage, options, HookRegistry::new())
    }

    /// Creates a collection whose comparators and matchers run `hooks` first.
    pub fn with_hooks(
        name: impl Into<String>,
        storage: Rc<S>,
        options: DatabaseOptions,
        hooks: HookRegistry,
    ) -> Result<Self> {
        options.validate()?;
        let name = name.into();
        let buffer = ChangeEventBuffer::new(options.change_buffer_capacity())?;
        let resolver = QueryParamsResolver::new(storage.primary_key(), Rc::new(hooks));
        info!(
            collection = %name,
            event_reduce = options.event_reduce(),
            buffer_capacity = options.change_buffer_capacity(),
            "collection created"
        );
        Ok(Self {
            name,
            storage,
            options,
            resolver,
            documents: Rc::new(RefCell::new(DocumentCache::new())),
            buffer: RefCell::new(buffer),
            registry: RefCell::new(QueryRegistry::new()),
            local_listeners: RefCell::new(SubscriptionManager::new()),
            last_sequence: Cell::new(0),
            closed: Cell::new(false),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    #[inline]
    pub fn storage(&self) -> &Rc<S> {
        &self.storage
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Sequence number of the last ingested event.
    #[inline]
    pub fn last_sequence(&self) -> Sequence {
        self.last_sequence.get()
    }

    /// Counter of the most recent event in the change buffer.
    pub fn buffer_counter(&self) -> u64 {
        self.buffer.borrow().counter()
    }

    /// Number of live queries.
    pub fn query_count(&self) -> usize {
        self.registry.borrow().query_count()
    }

    /// The resolver holding the parameters of live queries.
    #[inline]
    pub fn resolver(&self) -> &QueryParamsResolver {
        &self.resolver
    }

    /// Returns the canonical handle of a document seen by this collection.
    pub fn document(&self, id: &str) -> Option<DocumentHandle> {
        self.documents.borrow().get(id)
    }

    /// Subscribes to events of the local store.
    pub fn on_local_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.local_listeners.borrow_mut().subscribe(callback)
    }

    pub fn remove_local_listener(&self, id: SubscriptionId) -> bool {
        self.local_listeners.borrow_mut().unsubscribe(id)
    }

    /// Returns the live query for `shape`, running it if no holder exists.
    pub async fn find(&self, shape: QueryShape) -> Result<SharedQuery> {
        self.ensure_open()?;
        if let Some(existing) = self.registry.borrow().find_by_shape(&shape) {
            trace!(collection = %self.name, "reusing live query");
            return Ok(existing);
        }

        let query = Query::new(shape)?;
        let query_id = query.id();
        let params = self.resolver.resolve(&query, &*self.storage);
        let mut cache = QueryResultCache::new(
            query,
            params,
            self.documents.clone(),
            self.options.event_reduce(),
        );
        cache.set_cursor(self.buffer_counter());
        let shared = Rc::new(RefCell::new(cache));

        if let Err(err) = QueryResultCache::requery(&shared, &*self.storage).await {
            self.resolver.forget(query_id);
            return Err(err);
        }
        self.registry.borrow_mut().register(&shared);

        // Events ingested while the query was running
        self.route(&shared).await?;
        Ok(shared)
    }

    /// Ingests a batch of change events in sequence order.
    ///
    /// The whole batch is rejected if any sequence number does not follow the
    /// previous one. When a query fails to re-run, the remaining queries are
    /// still served and the first error is returned.
    pub async fn ingest(&self, events: Vec<ChangeEvent>) -> Result<()> {
        self.ensure_open()?;
        let mut last = self.last_sequence.get();
        for event in &events {
            if event.sequence() <= last {
                return Err(Error::invalid_operation(format!(
                    "change event {} arrived after {}",
                    event.sequence(),
                    last
                )));
            }
            last = event.sequence();
        }
        if events.is_empty() {
            return Ok(());
        }

        {
            let mut buffer = self.buffer.borrow_mut();
            let mut documents = self.documents.borrow_mut();
            for event in &events {
                if !event.is_local() {
                    update_document(&mut documents, event);
                }
                buffer.push(event.clone());
            }
        }
        self.last_sequence.set(last);
        debug!(collection = %self.name, events = events.len(), last_sequence = last, "ingested change events");

        {
            let listeners = self.local_listeners.borrow();
            for event in events.iter().filter(|e| e.is_local()) {
                listeners.notify_all(event);
            }
        }

        let dead = self.registry.borrow_mut().cleanup();
        for query_id in dead {
            self.resolver.forget(query_id);
        }

        let queries = self.registry.borrow().live();
        let mut first_error = None;
        for query in &queries {
            if let Err(err) = self.route(query).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Pulls pending changes from storage and ingests them.
    pub async fn sync(&self) -> Result<usize> {
        self.ensure_open()?;
        let events = self.storage.drain_changes();
        let count = events.len();
        self.ingest(events).await?;
        Ok(count)
    }

    /// Looks documents up by id.
    ///
    /// Ids known to the document cache are answered from it; the rest are
    /// fetched from storage and installed. Deleted and unknown ids are
    /// absent from the result.
    pub async fn find_by_ids(&self, ids: &[DocId]) -> Result<HashMap<DocId, DocumentHandle>> {
        self.ensure_open()?;
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        {
            let documents = self.documents.borrow();
            for id in ids {
                match documents.get(id) {
                    Some(handle) => {
                        if !handle.is_deleted() {
                            found.insert(id.clone(), handle);
                        }
                    }
                    None => missing.push(id.clone()),
                }
            }
        }

        if !missing.is_empty() {
            trace!(collection = %self.name, missing = missing.len(), "fetching documents by id");
            let fetched = self.storage.find_documents_by_id(&missing).await?;
            let mut documents = self.documents.borrow_mut();
            for doc in fetched {
                let handle = documents.get_or_insert(doc);
                if !handle.is_deleted() {
                    found.insert(DocId::from(handle.id()), handle);
                }
            }
        }
        Ok(found)
    }

    /// Starts observing a fixed set of ids.
    pub async fn observe_ids(&self, ids: Vec<DocId>) -> Result<IdsObserver> {
        let cursor = self.buffer_counter();
        let documents = self.find_by_ids(&ids).await?;
        Ok(IdsObserver::new(ids, documents, cursor))
    }

    /// Brings an observer up to date. Returns true if its map changed.
    pub async fn refresh_ids(&self, observer: &mut IdsObserver) -> Result<bool> {
        self.ensure_open()?;
        let counter = self.buffer_counter();
        let read = self.buffer.borrow().get_since(observer.cursor());
        match read {
            BufferRead::Events(events) => Ok(observer.apply(&events, &self.documents.borrow(), counter)),
            BufferRead::OutOfRange => {
                debug!(collection = %self.name, cursor = observer.cursor(), "ids observer fell behind");
                let documents = self.find_by_ids(observer.ids()).await?;
                observer.reset(documents, counter);
                Ok(true)
            }
        }
    }

    /// Closes the collection. Live queries stop receiving events.
    pub fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        let dropped = self.registry.borrow_mut().clear();
        for query_id in dropped {
            self.resolver.forget(query_id);
        }
        self.local_listeners.borrow_mut().clear();
        info!(collection = %self.name, "collection closed");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.get() {
            Err(Error::closed_collection(self.name.as_str()))
        } else {
            Ok(())
        }
    }

    /// Delivers the buffered events a query has not seen yet.
    ///
    /// Returns at once if the query is running against storage; that run
    /// routes what arrived meanwhile when it lands.
    async fn route(&self, query: &SharedQuery) -> Result<()> {
        loop {
            let counter = self.buffer_counter();
            let (query_id, read) = {
                let mut cache = query.borrow_mut();
                if cache.is_requerying() || cache.cursor() >= counter {
                    return Ok(());
                }
                let read = self.buffer.borrow().get_since(cache.cursor());
                cache.set_cursor(counter);
                (cache.query().id(), read)
            };

            match read {
                BufferRead::Events(events) => {
                    trace!(query_id, events = events.len(), "routing change events");
                    QueryResultCache::process(query, &events, &*self.storage).await?;
                }
                BufferRead::OutOfRange => {
                    debug!(query_id, "change buffer out of range");
                    QueryResultCache::requery(query, &*self.storage).await?;
                }
            }
        }
    }
}

impl<S: StorageBackend> core::fmt::Debug for Collection<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("last_sequence", &self.last_sequence.get())
            .field("closed", &self.closed.get())
            .finish()
    }
}

fn update_document(documents: &mut DocumentCache, event: &ChangeEvent) {
    match event.operation() {
        ChangeOperation::Insert | ChangeOperation::Update => {
            if let Some(doc) = event.document() {
                documents.upsert(doc.clone());
            }
        }
        ChangeOperation::Delete => {
            if let Some(previous) = event.previous() {
                documents.upsert(Rc::new(previous.to_deleted()));
            }
        }
    }
}
