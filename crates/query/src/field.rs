//! Field access shared by the matcher and the comparator.

use alloc::borrow::Cow;
use alloc::string::ToString;
use reflux_core::{Document, Value};

static NULL: Value = Value::Null;

/// Resolves a dotted field path on a document.
///
/// The primary key path resolves to the document id. Missing fields resolve
/// to `Null`.
pub fn field_value<'a>(doc: &'a Document, primary_key: &str, path: &str) -> Cow<'a, Value> {
    if path == primary_key {
        return Cow::Owned(Value::String(doc.id().to_string()));
    }
    match doc.get(path) {
        Some(value) => Cow::Borrowed(value),
        None => Cow::Borrowed(&NULL),
    }
}
