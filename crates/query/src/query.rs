//! Query shapes and query instances.
//!
//! A `QueryShape` is the declarative description of a query (selector, sort,
//! skip, limit). A `Query` is one instance of a shape with a stable identity;
//! resolved parameters are memoized per instance.

use crate::selector::Selector;
use crate::sort::SortField;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering};
use reflux_core::{Error, Result};

/// Unique identifier of a query instance.
pub type QueryId = u64;

/// Global counter for query instance ids.
static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

/// Gets the next unique query id.
pub fn next_query_id() -> QueryId {
    NEXT_QUERY_ID.fetch_add(1, Ordering::SeqCst)
}

/// Declarative description of a query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryShape {
    pub selector: Selector,
    pub sort: Vec<SortField>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl QueryShape {
    /// Creates a shape matching every document, unsorted and unpaginated.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn sort_by(mut self, field: SortField) -> Self {
        self.sort.push(field);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the shape for contradictions.
    pub fn validate(&self) -> Result<()> {
        for (i, field) in self.sort.iter().enumerate() {
            if field.path.is_empty() {
                return Err(Error::invalid_query("sort field path must not be empty"));
            }
            if self.sort[..i].iter().any(|f| f.path == field.path) {
                return Err(Error::invalid_query(alloc::format!(
                    "sort field declared twice: {}",
                    field.path
                )));
            }
        }
        Ok(())
    }

    /// Returns a fingerprint of this shape. Equal shapes share a fingerprint.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// A query instance with stable identity.
///
/// Clones share the same id, so they resolve to the same cached parameters.
#[derive(Clone, Debug)]
pub struct Query {
    id: QueryId,
    shape: Rc<QueryShape>,
}

impl Query {
    /// Creates a new query instance with a fresh id.
    pub fn new(shape: QueryShape) -> Result<Self> {
        shape.validate()?;
        Ok(Self {
            id: next_query_id(),
            shape: Rc::new(shape),
        })
    }

    #[inline]
    pub fn id(&self) -> QueryId {
        self.id
    }

    #[inline]
    pub fn shape(&self) -> &QueryShape {
        &self.shape
    }
}

/// A simple hasher for computing shape fingerprints.
/// Uses FNV-1a, which is fast and has good distribution.
struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::FNV_OFFSET,
        }
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state ^= *byte as u64;
            self.state = self.state.wrapping_mul(Self::FNV_PRIME);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_ids_are_unique() {
        let a = Query::new(QueryShape::new()).unwrap();
        let b = Query::new(QueryShape::new()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_fingerprint_follows_shape() {
        let a = QueryShape::new().selector(Selector::gt("age", 18i64)).limit(10);
        let b = QueryShape::new().selector(Selector::gt("age", 18i64)).limit(10);
        let c = QueryShape::new().selector(Selector::gt("age", 18i64)).limit(11);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_duplicate_sort_field_rejected() {
        let shape = QueryShape::new()
            .sort_by(SortField::asc("age"))
            .sort_by(SortField::desc("age"));
        assert!(matches!(Query::new(shape), Err(Error::InvalidQuery { .. })));
    }
}
