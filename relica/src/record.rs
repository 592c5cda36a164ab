// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row representation shared by every backend
//!
//! Records are plain JSON object maps. SQL rows and document-store
//! documents both normalize into this shape, which keeps the behavior
//! pipeline and the cache serialization driver-agnostic.

use serde_json::{Map, Value};

/// A single row/document: column name -> value.
pub type Record = Map<String, Value>;

/// Build a record from `(key, value)` pairs.
pub fn record_from<I, K>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Value equality that tolerates integer/float representation drift.
///
/// Ids travel through JSON serialization (cache entries, document stores)
/// and may come back as a different numeric variant than they left with.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Render a join-key value as a grouping string.
///
/// `Value` is not `Hash`, so eager-load grouping maps key values through
/// this canonical text form. Null keys return `None` and never group.
pub(crate) fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}
