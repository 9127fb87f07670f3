//! Reflux Query - Query shapes and resolved query parameters.
//!
//! This crate turns the declarative shape of a query into the deterministic
//! functions the incremental engine needs:
//!
//! - `selector`: Selector AST and its matcher semantics
//! - `sort`: Sort specification and field comparison
//! - `query`: `QueryShape` and `Query` instances with stable identity
//! - `params`: `QueryParams` and the `QueryFunctions` backend seam
//! - `hooks`: Pre-processing hooks around comparator and matcher calls
//! - `resolver`: `QueryParamsResolver`, memoized per query instance

#![no_std]

extern crate alloc;

mod field;
pub mod hooks;
pub mod params;
pub mod query;
pub mod resolver;
pub mod selector;
pub mod sort;

pub use field::field_value;
pub use hooks::{HookRegistry, QueryMatcherData, SortComparatorData};
pub use params::{
    default_query_matcher, default_sort_comparator, DefaultQueryFunctions, QueryFunctions, QueryMatcher,
    QueryParams, SortComparator,
};
pub use query::{next_query_id, Query, QueryId, QueryShape};
pub use resolver::QueryParamsResolver;
pub use selector::{EvalType, Selector};
pub use sort::{compare_by_fields, compare_by_primary_key, sort_fields_of_query, SortField, SortOrder};
