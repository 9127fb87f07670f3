//! Reflux Core - Core document and change-event types for Reflux.
//!
//! This crate provides the foundational types shared by every Reflux crate:
//!
//! - `Value`: Field values (Null, Boolean, Int64, Float64, String, Array, Object)
//! - `Document`: A document with a primary key, a revision and fields
//! - `ChangeEvent`: One committed write (insert, update or delete)
//! - `Error`: Error types for Reflux operations
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use reflux_core::{ChangeEvent, ChangeOperation, Document, Value};
//!
//! let doc = Rc::new(Document::new("alice").field("age", 31i64));
//! assert_eq!(doc.get("age"), Some(&Value::Int64(31)));
//!
//! let event = ChangeEvent::insert(1, doc);
//! assert_eq!(event.operation(), ChangeOperation::Insert);
//! assert_eq!(event.document_id(), "alice");
//! ```

#![no_std]

extern crate alloc;

mod document;
mod error;
mod event;
mod value;

pub use document::{DocId, Document, Revision};
pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeOperation, Sequence};
pub use value::Value;
