//! Field values and structural equality.
//!
//! Every decision the reconciliation core makes ("is this an edit?", "did the
//! server change this?", "is this our own write coming back?") reduces to
//! comparing two JSON values. The rules are fixed here:
//!
//! - numbers compare by numeric value, so `1` equals `1.0`
//! - strings, booleans and `null` compare by value; there is no truthiness,
//!   so `""`, `false`, `0` and `null` are all distinct
//! - arrays compare element-wise, in order
//! - objects compare by key set and per-key value, ignoring key order
//! - an absent field is distinct from a field holding `null`

use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// A single field value.
pub type FieldValue = Value;

/// A set of field changes keyed by field key.
///
/// Used for local edits, remote drift and submission payloads. Ordered so
/// payloads and log lines are deterministic.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Deep structural equality between two values.
#[must_use]
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| structurally_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| structurally_equal(v, w)))
        }
        _ => false,
    }
}

/// Equality for possibly-absent fields. Absent only equals absent.
#[must_use]
pub fn field_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => structurally_equal(x, y),
        _ => false,
    }
}

/// Structural equality between two change sets.
#[must_use]
pub fn maps_equal(a: &FieldMap, b: &FieldMap) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).is_some_and(|w| structurally_equal(v, w)))
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
