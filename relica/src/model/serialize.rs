// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Record serialization
//!
//! Strips hidden and internal (underscore-prefixed) fields before a
//! record leaves the model layer; attached relation data is sanitized
//! recursively.

use serde_json::Value;

use super::ModelDef;
use crate::record::Record;

/// Serializable view of a record: hidden fields and underscore-prefixed
/// keys removed, relation values sanitized recursively.
pub(crate) fn to_object(def: &ModelDef, record: &Record) -> Record {
    let mut out = Record::new();
    for (key, value) in record {
        if key.starts_with('_') || def.hidden().iter().any(|hidden| hidden == key) {
            continue;
        }
        out.insert(key.clone(), sanitize(value));
    }
    out
}

/// JSON string of the serializable view.
pub(crate) fn to_json(def: &ModelDef, record: &Record) -> String {
    Value::Object(to_object(def, record)).to_string()
}

fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !key.starts_with('_'))
                .map(|(key, value)| (key.clone(), sanitize(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}
