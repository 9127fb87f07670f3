//! Reflux Storage - the storage backend seam.
//!
//! This crate provides:
//!
//! - `StorageBackend`: the interface the reactive layer consumes (full
//!   queries, lookups by id and an ordered change stream)
//! - `ChangeJournal`: sequenced recording of committed writes
//! - `MemoryStorage`: an in-memory backend with primary and local stores
//!
//! # Example
//!
//! ```rust
//! use reflux_core::Document;
//! use reflux_storage::{MemoryStorage, StorageBackend};
//!
//! let storage = MemoryStorage::new("id");
//! storage.insert(Document::new("a").field("age", 30i64)).unwrap();
//! storage.insert(Document::new("b").field("age", 40i64)).unwrap();
//!
//! let changes = storage.drain_changes();
//! assert_eq!(changes.len(), 2);
//! assert_eq!(changes[1].sequence(), 2);
//! ```

#![no_std]

extern crate alloc;

pub mod backend;
pub mod journal;
pub mod memory;

pub use backend::{QueryResult, StorageBackend};
pub use journal::ChangeJournal;
pub use memory::MemoryStorage;
