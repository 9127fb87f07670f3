//! Pre-processing hooks around comparator and matcher calls.
//!
//! Hooks may rewrite the documents handed to the backend comparator or
//! matcher (for example to bring them into the representation the backend
//! expects). A hook must not change the relative order of two documents or
//! whether a document matches; it only changes their representation.

use crate::query::Query;
use alloc::borrow::Cow;
use alloc::rc::Rc;
use alloc::vec::Vec;
use reflux_core::Document;

/// Input of a pre-sort-comparator hook.
pub struct SortComparatorData<'a> {
    pub doc_a: Cow<'a, Document>,
    pub doc_b: Cow<'a, Document>,
    pub query: &'a Query,
}

/// Input of a pre-query-matcher hook.
pub struct QueryMatcherData<'a> {
    pub doc: Cow<'a, Document>,
    pub query: &'a Query,
}

pub type PreSortComparatorHook = Rc<dyn Fn(&mut SortComparatorData<'_>)>;
pub type PreQueryMatcherHook = Rc<dyn Fn(&mut QueryMatcherData<'_>)>;

/// Registered hooks, run in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    pre_sort_comparator: Vec<PreSortComparatorHook>,
    pre_query_matcher: Vec<PreQueryMatcherHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pre_sort_comparator<F>(&mut self, hook: F)
    where
        F: Fn(&mut SortComparatorData<'_>) + 'static,
    {
        self.pre_sort_comparator.push(Rc::new(hook));
    }

    pub fn add_pre_query_matcher<F>(&mut self, hook: F)
    where
        F: Fn(&mut QueryMatcherData<'_>) + 'static,
    {
        self.pre_query_matcher.push(Rc::new(hook));
    }

    #[inline]
    pub fn has_pre_sort_comparator(&self) -> bool {
        !self.pre_sort_comparator.is_empty()
    }

    #[inline]
    pub fn has_pre_query_matcher(&self) -> bool {
        !self.pre_query_matcher.is_empty()
    }

    pub fn run_pre_sort_comparator(&self, data: &mut SortComparatorData<'_>) {
        for hook in &self.pre_sort_comparator {
            hook(data);
        }
    }

    pub fn run_pre_query_matcher(&self, data: &mut QueryMatcherData<'_>) {
        for hook in &self.pre_query_matcher {
            hook(data);
        }
    }
}

impl core::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("pre_sort_comparator", &self.pre_sort_comparator.len())
            .field("pre_query_matcher", &self.pre_query_matcher.len())
            .finish()
    }
}
