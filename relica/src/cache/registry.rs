// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache key registry
//!
//! Tracks the keys generated for each `(model, group)` pair so a write
//! to a model can invalidate every cached read for it without scanning
//! the underlying store. The registry is an index, not a source of
//! truth: a registered key whose value has already fallen out of the
//! cache is tolerated silently.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use super::{CacheError, CacheService};

#[derive(Default)]
pub struct KeyRegistry {
    entries: Mutex<HashMap<String, HashSet<String>>>,
}

fn registry_key(model: &str, group: &str) -> String {
    format!("{}:{}", model, group)
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache key under a model and group.
    pub fn add_key(&self, model: &str, group: &str, key: impl Into<String>) {
        self.entries
            .lock()
            .entry(registry_key(model, group))
            .or_default()
            .insert(key.into());
    }

    /// All registered keys for a model, optionally narrowed to one group.
    pub fn get_keys(&self, model: &str, group: Option<&str>) -> Vec<String> {
        let entries = self.entries.lock();
        match group {
            Some(group) => entries
                .get(&registry_key(model, group))
                .map(|keys| keys.iter().cloned().collect())
                .unwrap_or_default(),
            None => {
                let prefix = format!("{}:", model);
                entries
                    .iter()
                    .filter(|(entry, _)| entry.starts_with(&prefix))
                    .flat_map(|(_, keys)| keys.iter().cloned())
                    .collect()
            }
        }
    }

    /// Drop a single key from the registry (not from the cache).
    pub fn remove_key(&self, model: &str, group: &str, key: &str) {
        let mut entries = self.entries.lock();
        let entry = registry_key(model, group);
        if let Some(keys) = entries.get_mut(&entry) {
            keys.remove(key);
            if keys.is_empty() {
                entries.remove(&entry);
            }
        }
    }

    /// Delete every registered key for a model from the cache and drop
    /// the registry entries. Individual delete failures are logged and
    /// skipped; the registry entries are dropped regardless.
    pub async fn clear_model(&self, cache: &CacheService, model: &str) {
        let keys: Vec<String> = {
            let mut entries = self.entries.lock();
            let prefix = format!("{}:", model);
            let matching: Vec<String> = entries
                .keys()
                .filter(|entry| entry.starts_with(&prefix))
                .cloned()
                .collect();
            matching
                .into_iter()
                .filter_map(|entry| entries.remove(&entry))
                .flatten()
                .collect()
        };

        for key in keys {
            if let Err(err) = cache.delete(&key).await {
                log::warn!("cache invalidation of '{}' failed: {}", key, err);
            }
        }
    }

    /// Same as [`clear_model`](Self::clear_model), narrowed to one group.
    pub async fn clear_group(&self, cache: &CacheService, model: &str, group: &str) {
        let keys: Vec<String> = {
            let mut entries = self.entries.lock();
            entries
                .remove(&registry_key(model, group))
                .map(|keys| keys.into_iter().collect())
                .unwrap_or_default()
        };

        for key in keys {
            if let Err(err) = cache.delete(&key).await {
                log::warn!("cache invalidation of '{}' failed: {}", key, err);
            }
        }
    }

    /// Wipe the entire underlying cache and the registry.
    pub async fn clear_all(&self, cache: &CacheService) -> Result<(), CacheError> {
        cache.clear().await?;
        self.entries.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bookkeeping() {
        let registry = KeyRegistry::new();
        registry.add_key("User", "find", "User:find:a");
        registry.add_key("User", "find", "User:find:b");
        registry.add_key("User", "all", "User:all:c");
        registry.add_key("Post", "find", "Post:find:d");

        let mut all = registry.get_keys("User", None);
        all.sort();
        assert_eq!(all, vec!["User:all:c", "User:find:a", "User:find:b"]);
        assert_eq!(registry.get_keys("User", Some("all")), vec!["User:all:c"]);

        registry.remove_key("User", "find", "User:find:a");
        assert_eq!(registry.get_keys("User", Some("find")), vec!["User:find:b"]);
    }

    #[test]
    fn test_model_prefix_does_not_leak_across_models() {
        let registry = KeyRegistry::new();
        registry.add_key("User", "find", "User:find:a");
        registry.add_key("UserProfile", "find", "UserProfile:find:b");

        assert_eq!(registry.get_keys("User", None), vec!["User:find:a"]);
    }

    #[tokio::test]
    async fn test_clear_model_deletes_registered_keys_from_cache() {
        let cache = CacheService::memory();
        let registry = KeyRegistry::new();

        cache.set("User:find:a", &json!(1), 0).await.unwrap();
        cache.set("User:all:b", &json!(2), 0).await.unwrap();
        cache.set("Post:find:c", &json!(3), 0).await.unwrap();
        registry.add_key("User", "find", "User:find:a");
        registry.add_key("User", "all", "User:all:b");
        registry.add_key("Post", "find", "Post:find:c");

        registry.clear_model(&cache, "User").await;

        assert_eq!(cache.get("User:find:a").await.unwrap(), None);
        assert_eq!(cache.get("User:all:b").await.unwrap(), None);
        assert_eq!(cache.get("Post:find:c").await.unwrap(), Some(json!(3)));
        assert!(registry.get_keys("User", None).is_empty());
        assert_eq!(registry.get_keys("Post", None).len(), 1);
    }

    #[tokio::test]
    async fn test_clear_group_is_narrower() {
        let cache = CacheService::memory();
        let registry = KeyRegistry::new();

        cache.set("User:find:a", &json!(1), 0).await.unwrap();
        cache.set("User:all:b", &json!(2), 0).await.unwrap();
        registry.add_key("User", "find", "User:find:a");
        registry.add_key("User", "all", "User:all:b");

        registry.clear_group(&cache, "User", "find").await;

        assert_eq!(cache.get("User:find:a").await.unwrap(), None);
        assert_eq!(cache.get("User:all:b").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_clear_all_wipes_cache_and_registry() {
        let cache = CacheService::memory();
        let registry = KeyRegistry::new();

        cache.set("User:find:a", &json!(1), 0).await.unwrap();
        cache.set("unrelated", &json!(9), 0).await.unwrap();
        registry.add_key("User", "find", "User:find:a");

        registry.clear_all(&cache).await.unwrap();

        assert_eq!(cache.get("User:find:a").await.unwrap(), None);
        assert_eq!(cache.get("unrelated").await.unwrap(), None);
        assert!(registry.get_keys("User", None).is_empty());
    }

    #[tokio::test]
    async fn test_registered_key_missing_from_cache_is_tolerated() {
        let cache = CacheService::memory();
        let registry = KeyRegistry::new();
        registry.add_key("User", "find", "User:find:gone");
        // Nothing in the cache under that key; clear must not fail.
        registry.clear_model(&cache, "User").await;
    }
}
