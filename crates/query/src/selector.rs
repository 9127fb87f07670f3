//! Selector definitions for query filtering.
//!
//! A `Selector` is the declarative predicate part of a query. Field paths are
//! dotted (`"address.city"`); the primary key is addressable by its field name.

use crate::field::field_value;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use reflux_core::{Document, Value};

/// Evaluation type for field comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvalType {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A query selector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Matches every document.
    #[default]
    All,
    /// Compares a field to a literal value.
    Compare {
        path: String,
        eval_type: EvalType,
        value: Value,
    },
    /// Field value is one of the listed values.
    In { path: String, values: Vec<Value> },
    /// Field value is none of the listed values.
    NotIn { path: String, values: Vec<Value> },
    /// Field presence check.
    Exists { path: String, exists: bool },
    /// All sub-selectors match.
    And(Vec<Selector>),
    /// At least one sub-selector matches.
    Or(Vec<Selector>),
    /// The sub-selector does not match.
    Not(Box<Selector>),
}

impl Selector {
    fn compare(path: impl Into<String>, eval_type: EvalType, value: impl Into<Value>) -> Self {
        Selector::Compare {
            path: path.into(),
            eval_type,
            value: value.into(),
        }
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, EvalType::Eq, value)
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, EvalType::Ne, value)
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, EvalType::Lt, value)
    }

    pub fn le(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, EvalType::Le, value)
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, EvalType::Gt, value)
    }

    pub fn ge(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, EvalType::Ge, value)
    }

    pub fn in_list(path: impl Into<String>, values: Vec<Value>) -> Self {
        Selector::In {
            path: path.into(),
            values,
        }
    }

    pub fn not_in(path: impl Into<String>, values: Vec<Value>) -> Self {
        Selector::NotIn {
            path: path.into(),
            values,
        }
    }

    pub fn exists(path: impl Into<String>, exists: bool) -> Self {
        Selector::Exists {
            path: path.into(),
            exists,
        }
    }

    pub fn and(selectors: Vec<Selector>) -> Self {
        Selector::And(selectors)
    }

    pub fn or(selectors: Vec<Selector>) -> Self {
        Selector::Or(selectors)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(selector: Selector) -> Self {
        Selector::Not(Box::new(selector))
    }

    /// Evaluates the selector against a document.
    ///
    /// Missing fields evaluate as `Null`. Ordering comparisons only match
    /// values of the same kind (numbers against numbers, strings against
    /// strings), so `{age: {$gt: 5}}` never matches a string age.
    pub fn matches(&self, doc: &Document, primary_key: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Compare {
                path,
                eval_type,
                value,
            } => {
                let field = field_value(doc, primary_key, path);
                match field.as_ref().as_array() {
                    // Arrays match when the array itself or any element matches
                    Some(items) if !matches!(value, Value::Array(_)) => match eval_type {
                        EvalType::Ne => !items.contains(value),
                        _ => items.iter().any(|item| eval_compare(item, *eval_type, value)),
                    },
                    _ => eval_compare(field.as_ref(), *eval_type, value),
                }
            }
            Selector::In { path, values } => {
                let field = field_value(doc, primary_key, path);
                values.iter().any(|v| contains_or_equals(field.as_ref(), v))
            }
            Selector::NotIn { path, values } => {
                let field = field_value(doc, primary_key, path);
                !values.iter().any(|v| contains_or_equals(field.as_ref(), v))
            }
            Selector::Exists { path, exists } => {
                let present = path == primary_key || doc.get(path).is_some();
                present == *exists
            }
            Selector::And(selectors) => selectors.iter().all(|s| s.matches(doc, primary_key)),
            Selector::Or(selectors) => selectors.iter().any(|s| s.matches(doc, primary_key)),
            Selector::Not(selector) => !selector.matches(doc, primary_key),
        }
    }
}

fn contains_or_equals(field: &Value, value: &Value) -> bool {
    match field.as_array() {
        Some(items) if !matches!(value, Value::Array(_)) => items.contains(value),
        _ => field == value,
    }
}

fn eval_compare(field: &Value, eval_type: EvalType, value: &Value) -> bool {
    match eval_type {
        EvalType::Eq => field == value,
        EvalType::Ne => field != value,
        _ if !field.same_kind(value) => false,
        EvalType::Lt => field < value,
        EvalType::Le => field <= value,
        EvalType::Gt => field > value,
        EvalType::Ge => field >= value,
    }
}
