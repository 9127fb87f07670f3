//! Sort specification and the document comparator built from it.

use crate::field::field_value;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use reflux_core::Document;

/// Sort direction for a sort field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Ascending order (smallest first)
    Asc,
    /// Descending order (largest first)
    Desc,
}

impl SortOrder {
    /// Applies this order to a comparison result.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// One entry of a query's sort specification.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortField {
    pub path: String,
    pub order: SortOrder,
}

impl SortField {
    pub fn new(path: impl Into<String>, order: SortOrder) -> Self {
        Self {
            path: path.into(),
            order,
        }
    }

    pub fn asc(path: impl Into<String>) -> Self {
        Self::new(path, SortOrder::Asc)
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self::new(path, SortOrder::Desc)
    }
}

/// Compares two documents by the given sort fields in declared order.
///
/// Does not break ties; callers that need a total order chain
/// [`compare_by_primary_key`] after it.
pub fn compare_by_fields(
    sort: &[SortField],
    primary_key: &str,
    a: &Document,
    b: &Document,
) -> Ordering {
    for field in sort {
        let a_val = field_value(a, primary_key, &field.path);
        let b_val = field_value(b, primary_key, &field.path);
        let cmp = a_val.as_ref().cmp(b_val.as_ref());
        if cmp != Ordering::Equal {
            return field.order.apply(cmp);
        }
    }
    Ordering::Equal
}

/// Ordinal comparison of document ids.
#[inline]
pub fn compare_by_primary_key(a: &Document, b: &Document) -> Ordering {
    a.id().cmp(b.id())
}

/// Sort fields of a query: the declared ones, or the primary key when the
/// query declares none.
pub fn sort_fields_of_query(primary_key: &str, sort: &[SortField]) -> Vec<String> {
    if sort.is_empty() {
        alloc::vec![String::from(primary_key)]
    } else {
        sort.iter().map(|f| f.path.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn doc(id: &str, group: i64, score: i64) -> Document {
        Document::new(id).field("group", group).field("score", score)
    }

    #[test]
    fn test_compare_asc_desc() {
        let a = doc("a", 1, 10);
        let b = doc("b", 1, 20);
        let asc = vec![SortField::asc("score")];
        let desc = vec![SortField::desc("score")];
        assert_eq!(compare_by_fields(&asc, "id", &a, &b), Ordering::Less);
        assert_eq!(compare_by_fields(&desc, "id", &a, &b), Ordering::Greater);
    }

    #[test]
    fn test_compare_multi_field() {
        let a = doc("a", 2, 10);
        let b = doc("b", 1, 20);
        let c = doc("c", 1, 30);
        let sort = vec![SortField::asc("group"), SortField::desc("score")];
        assert_eq!(compare_by_fields(&sort, "id", &a, &b), Ordering::Greater);
        assert_eq!(compare_by_fields(&sort, "id", &b, &c), Ordering::Greater);
    }

    #[test]
    fn test_full_tie_is_equal_without_primary_key() {
        let a = doc("a", 1, 10);
        let b = doc("b", 1, 10);
        let sort = vec![SortField::asc("score")];
        assert_eq!(compare_by_fields(&sort, "id", &a, &b), Ordering::Equal);
        assert_eq!(compare_by_primary_key(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_sort_fields_default_to_primary_key() {
        assert_eq!(sort_fields_of_query("id", &[]), vec![String::from("id")]);
        let sort = vec![SortField::asc("score"), SortField::desc("group")];
        assert_eq!(
            sort_fields_of_query("id", &sort),
            vec![String::from("score"), String::from("group")]
        );
    }
}
