//! Query parameters consumed by the incremental engine.

use crate::query::QueryShape;
use crate::sort::compare_by_fields;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use reflux_core::Document;

/// Total-order comparator over documents.
pub type SortComparator = Rc<dyn Fn(&Document, &Document) -> Ordering>;

/// Selector predicate over documents.
pub type QueryMatcher = Rc<dyn Fn(&Document) -> bool>;

/// Resolved, immutable parameters of one query instance.
///
/// The comparator is a strict total order: declared sort fields first, then
/// the primary key.
#[derive(Clone)]
pub struct QueryParams {
    pub primary_key: String,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub sort_fields: Vec<String>,
    comparator: SortComparator,
    matcher: QueryMatcher,
}

impl QueryParams {
    pub fn new(
        primary_key: impl Into<String>,
        skip: Option<usize>,
        limit: Option<usize>,
        sort_fields: Vec<String>,
        comparator: SortComparator,
        matcher: QueryMatcher,
    ) -> Self {
        Self {
            primary_key: primary_key.into(),
            skip,
            limit,
            sort_fields,
            comparator,
            matcher,
        }
    }

    #[inline]
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        (self.comparator)(a, b)
    }

    #[inline]
    pub fn matches(&self, doc: &Document) -> bool {
        (self.matcher)(doc)
    }

    /// Skip count, treating an absent skip as zero.
    #[inline]
    pub fn skip_count(&self) -> usize {
        self.skip.unwrap_or(0)
    }

    pub fn comparator(&self) -> &SortComparator {
        &self.comparator
    }

    pub fn matcher(&self) -> &QueryMatcher {
        &self.matcher
    }
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParams")
            .field("primary_key", &self.primary_key)
            .field("skip", &self.skip)
            .field("limit", &self.limit)
            .field("sort_fields", &self.sort_fields)
            .finish_non_exhaustive()
    }
}

/// Source of the comparator and matcher for a query shape.
///
/// Storage backends implement this to supply their own comparison and
/// matching semantics; the defaults evaluate the shape directly.
pub trait QueryFunctions {
    fn sort_comparator(&self, primary_key: &str, shape: &QueryShape) -> SortComparator {
        default_sort_comparator(primary_key, shape)
    }

    fn query_matcher(&self, primary_key: &str, shape: &QueryShape) -> QueryMatcher {
        default_query_matcher(primary_key, shape)
    }
}

/// Query functions that evaluate the shape as declared.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultQueryFunctions;

impl QueryFunctions for DefaultQueryFunctions {}

/// Comparator over the declared sort fields. Ties are left to the caller.
pub fn default_sort_comparator(primary_key: &str, shape: &QueryShape) -> SortComparator {
    let primary_key = String::from(primary_key);
    let sort = shape.sort.clone();
    Rc::new(move |a: &Document, b: &Document| compare_by_fields(&sort, &primary_key, a, b))
}

/// Matcher evaluating the shape's selector.
pub fn default_query_matcher(primary_key: &str, shape: &QueryShape) -> QueryMatcher {
    let primary_key = String::from(primary_key);
    let selector = shape.selector.clone();
    Rc::new(move |doc: &Document| selector.matches(doc, &primary_key))
}
