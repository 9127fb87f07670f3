//! Value type definitions for Reflux documents.
//!
//! This module defines the `Value` enum which represents any value that can be
//! stored in a document field, including nested objects and arrays.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

/// A value that can be stored in a document field.
#[derive(Clone, Debug)]
pub enum Value {
    /// Null value (also used for missing fields)
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Nested object, keyed by field name
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value if this is an Int64, None otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the f64 value for any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the elements if this is an Array, None otherwise.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the fields if this is an Object, None otherwise.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true if both values belong to the same comparison bracket.
    ///
    /// Integers and floats share one bracket; every other variant is its own.
    pub fn same_kind(&self, other: &Value) -> bool {
        self.type_order() == other.type_order()
    }

    /// Returns a type ordering value for comparing different types.
    fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int64(_) | Value::Float64(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

}

/// 2^63, the first float above every `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn compare_f64(a: f64, b: f64) -> Ordering {
    // NaN sorts after every other number
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a float, without rounding the integer.
fn compare_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= I64_BOUND {
        return Ordering::Less;
    }
    if f < -I64_BOUND {
        return Ordering::Greater;
    }
    // In range, so the cast truncates toward zero without saturating
    let whole = f as i64;
    i.cmp(&whole).then_with(|| {
        let fraction = f - whole as f64;
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

/// The integer a float is exactly equal to, if any.
fn integral_value(f: f64) -> Option<i64> {
    if f.is_nan() || f >= I64_BOUND || f < -I64_BOUND {
        return None;
    }
    let whole = f as i64;
    (whole as f64 == f).then_some(whole)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => compare_f64(*a, *b),
            (Value::Int64(a), Value::Float64(b)) => compare_int_float(*a, *b),
            (Value::Float64(a), Value::Int64(b)) => compare_int_float(*b, *a).reverse(),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => a.iter().cmp(b.iter()),
            // Different types: order by type bracket
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Integers and floats share a bracket, so they share a tag
        self.type_order().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::Float64(f) => match integral_value(*f) {
                // Equal to an Int64, so it must hash like one; covers -0.0
                Some(i) => i.hash(state),
                None => {
                    let canonical = if f.is_nan() { f64::NAN } else { *f };
                    canonical.to_bits().hash(state)
                }
            },
            Value::String(s) => s.hash(state),
            Value::Array(a) => a.hash(state),
            Value::Object(o) => {
                for (k, v) in o {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_value_null() {
        let v = Value::Null;
        assert!(v.is_null());
        assert!(!Value::Int64(0).is_null());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int64(100).as_i64(), Some(100));
        assert_eq!(Value::Float64(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Int64(2).as_f64(), Some(2.0));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(
            Value::Array(vec![Value::Int64(1)]).as_array(),
            Some(&[Value::Int64(1)][..])
        );
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Int64(1) < Value::Int64(2));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        assert!(Value::Null < Value::Int64(0));
        assert!(Value::Int64(1) < Value::Float64(1.5));
        assert!(Value::Float64(0.5) < Value::Int64(1));
    }

    /// Records the bytes fed to it, so equal inputs compare equal.
    #[derive(Default)]
    struct Recorder(Vec<u8>);

    impl Hasher for Recorder {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, bytes: &[u8]) {
            self.0.extend_from_slice(bytes);
        }
    }

    fn hash_of(value: &Value) -> Vec<u8> {
        let mut recorder = Recorder::default();
        value.hash(&mut recorder);
        recorder.0
    }

    #[test]
    fn test_mixed_numeric_equality() {
        let int = Value::Int64(1);
        let float = Value::Float64(1.0);
        assert_eq!(int, float);
        assert_eq!(int.cmp(&float), Ordering::Equal);
        assert_eq!(hash_of(&int), hash_of(&float));
        assert_eq!(hash_of(&Value::Int64(0)), hash_of(&Value::Float64(-0.0)));
        assert!(int.same_kind(&float));

        assert!(Value::Int64(2) > Value::Float64(1.5));
        assert!(Value::Float64(-1.5) < Value::Int64(-1));
        assert!(Value::Int64(-2) < Value::Float64(-1.5));
    }

    #[test]
    fn test_mixed_numeric_order_is_exact() {
        // Both round to 2^53 as f64
        let big = 9_007_199_254_740_993i64;
        assert!(Value::Int64(big) > Value::Float64(9_007_199_254_740_992.0));
        assert_ne!(Value::Int64(big), Value::Float64(9_007_199_254_740_992.0));
        assert!(Value::Int64(i64::MAX) < Value::Float64(I64_BOUND));
        assert!(Value::Int64(i64::MIN) == Value::Float64(-I64_BOUND));
        assert!(Value::Int64(i64::MAX) < Value::Float64(f64::NAN));
    }

    #[test]
    fn test_nan_sorts_last() {
        assert!(Value::Float64(f64::NAN) > Value::Float64(1e300));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }

    #[test]
    fn test_value_from_impls() {
        let v: Value = 42i32.into();
        assert_eq!(v.as_i64(), Some(42));

        let v: Value = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));

        let v: Value = Some(100i64).into();
        assert_eq!(v.as_i64(), Some(100));

        let v: Value = None::<i64>.into();
        assert!(v.is_null());
    }
}
