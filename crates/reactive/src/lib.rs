//! Reflux Reactive - live query results over a change stream.
//!
//! This crate ties the event-reduce engine to a storage backend:
//!
//! - `DocumentCache`: one canonical, shared handle per document id
//! - `ChangeEventBuffer`: bounded history of change events for catch-up
//! - `QueryResultCache`: the maintained result window of one query
//! - `QueryRegistry`: routes change batches to live queries
//! - `Collection`: the ingestion path, queries and lookups by id
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use pollster::block_on;
//! use reflux_core::Document;
//! use reflux_query::{QueryShape, SortField};
//! use reflux_reactive::{Collection, DatabaseOptions};
//! use reflux_storage::MemoryStorage;
//!
//! let storage = Rc::new(MemoryStorage::new("id"));
//! let users = Collection::new("users", storage.clone(), DatabaseOptions::default()).unwrap();
//!
//! let oldest = block_on(users.find(QueryShape::new().sort_by(SortField::desc("age")).limit(1))).unwrap();
//!
//! storage.insert(Document::new("alice").field("age", 30i64)).unwrap();
//! storage.insert(Document::new("bob").field("age", 40i64)).unwrap();
//! block_on(users.sync()).unwrap();
//!
//! assert_eq!(oldest.borrow().ids().collect::<Vec<_>>(), ["bob"]);
//!
//! // Handles are the collection's canonical documents
//! let bob = users.document("bob").unwrap();
//! assert!(oldest.borrow().documents()[0].ptr_eq(&bob));
//! ```

#![no_std]

extern crate alloc;

pub mod buffer;
pub mod collection;
pub mod doc_cache;
pub mod ids_observer;
pub mod notify;
pub mod options;
pub mod query_cache;
pub mod subscription;

pub use buffer::{reduce_by_last_of_doc, BufferRead, ChangeEventBuffer, DEFAULT_CAPACITY};
pub use collection::Collection;
pub use doc_cache::{DocumentCache, DocumentHandle, SharedDocuments};
pub use ids_observer::IdsObserver;
pub use notify::{QueryRegistry, SharedQuery};
pub use options::DatabaseOptions;
pub use query_cache::{ApplyOutcome, ProcessOutcome, QueryResultCache};
pub use subscription::{Callback, Subscription, SubscriptionId, SubscriptionManager};
