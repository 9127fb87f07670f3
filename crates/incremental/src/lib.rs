//! Reflux Incremental - the event-reduce engine.
//!
//! Given the current result window of a query and an ordered batch of change
//! events, the engine either derives the new window directly or reports that
//! the query has to be executed again.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use reflux_core::{ChangeEvent, Document};
//! use reflux_incremental::{calculate_new_results, ReduceOutcome, ResultWindow};
//! use reflux_query::{DefaultQueryFunctions, HookRegistry, Query, QueryParamsResolver, QueryShape, SortField};
//!
//! let resolver = QueryParamsResolver::new("id", Rc::new(HookRegistry::new()));
//! let query = Query::new(QueryShape::new().sort_by(SortField::asc("age")).limit(2)).unwrap();
//! let params = resolver.resolve(&query, &DefaultQueryFunctions);
//!
//! let window = ResultWindow::from_sorted(vec![
//!     Rc::new(Document::new("a").field("age", 30i64)),
//!     Rc::new(Document::new("b").field("age", 40i64)),
//! ]);
//! let event = ChangeEvent::insert(1, Rc::new(Document::new("c").field("age", 20i64)));
//!
//! match calculate_new_results(&params, &[event], &window) {
//!     ReduceOutcome::Updated(next) => assert_eq!(next.ids().collect::<Vec<_>>(), ["c", "a"]),
//!     _ => unreachable!(),
//! }
//! ```

#![no_std]

extern crate alloc;

pub mod action;
pub mod reduce;
pub mod window;

pub use action::{Action, ActionName};
pub use reduce::{calculate_action, calculate_new_results, run_action, ReduceOutcome};
pub use window::ResultWindow;
