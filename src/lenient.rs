//! Accessors for loosely-typed JSON coming back from the gateway.
//!
//! Every accessor answers "is this field present in a usable form?" and
//! returns `None` otherwise, so callers never branch on raw `Value`s.

use serde_json::Value;

/// JavaScript-style truthiness, which the gateway's payloads were written against.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Non-blank string. Numbers are accepted and rendered as written.
pub fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer, from a JSON number or a numeric string.
pub fn count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Like [`count`] but zero counts as absent.
pub fn positive(value: Option<&Value>) -> Option<u64> {
    count(value).filter(|n| *n > 0)
}

pub fn flag(value: Option<&Value>) -> Option<bool> {
    value?.as_bool()
}

pub fn decimal(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Monetary amount kept in its textual form; zero and blanks are absent.
pub fn amount(value: Option<&Value>) -> Option<String> {
    let value = value?;
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::String(s) if s.trim() == "0" => None,
        _ => text(Some(value)),
    }
}
