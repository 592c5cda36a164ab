// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-process cache driver

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::super::{CacheDriver, CacheEntry, CacheError};

/// Map-backed cache tier. The fastest tier and the last resort of the
/// fallback chain; contents die with the process.
#[derive(Default)]
pub struct MemoryCacheDriver {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet purged) entries.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }
}

#[async_trait]
impl CacheDriver for MemoryCacheDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let expired = {
            let store = self.store.read();
            match store.get(key) {
                Some(entry) if entry.is_expired() => true,
                Some(entry) => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
            }
        };
        if expired {
            // Lazy purge on access.
            self.store.write().remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        let entry = CacheEntry::new(value.clone(), ttl_secs);
        self.store.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.store.write().clear();
        Ok(())
    }
}
