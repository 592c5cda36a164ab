// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Deterministic cache-key derivation
//!
//! Keys are `"{model}:{group}:{hash}"` where the hash is SHA-256 over a
//! canonical rendering of the query payload. Canonicalization sorts
//! object keys recursively, so structurally identical payloads hash the
//! same regardless of construction order.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Rewrite a payload with all object keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Stable content hash of a query payload, as lowercase hex.
pub fn hash_payload(payload: &Value) -> String {
    let canonical = canonicalize(payload);
    // Serialization of a Value cannot fail.
    let normalized = canonical.to_string();
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}

/// Full cache key for a model operation.
pub fn cache_key(model: &str, group: &str, payload: &Value) -> String {
    format!("{}:{}:{}", model, group, hash_payload(payload))
}
