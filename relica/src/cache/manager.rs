// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Single-driver cache manager and the unified cache service
//!
//! `CacheManager` holds one active driver and delegates to it; a driver
//! error propagates to the caller. `CacheService` is the one API the
//! model layer talks to, regardless of whether a single manager or a
//! fallback chain is wired behind it.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::{
    CacheDriver, CacheError, FallbackChain, FileCacheDriver, MemcachedCacheDriver,
    MemoryCacheDriver,
};
use crate::config::{CacheMode, CacheSettings};

/// Holds one active driver; operations delegate directly.
pub struct CacheManager {
    driver: RwLock<Arc<dyn CacheDriver>>,
}

impl CacheManager {
    pub fn new(driver: Arc<dyn CacheDriver>) -> Self {
        Self {
            driver: RwLock::new(driver),
        }
    }

    /// Swap the active driver.
    pub fn use_driver(&self, driver: Arc<dyn CacheDriver>) {
        log::debug!("cache manager switching to driver '{}'", driver.name());
        *self.driver.write() = driver;
    }

    /// Name of the active driver.
    pub fn driver_name(&self) -> &'static str {
        self.driver.read().name()
    }

    fn driver(&self) -> Arc<dyn CacheDriver> {
        self.driver.read().clone()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.driver().get(key).await
    }

    pub async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        self.driver().set(key, value, ttl_secs).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.driver().delete(key).await
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.driver().clear().await
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(Arc::new(MemoryCacheDriver::new()))
    }
}

/// The cache API consumed by the query-cache layer and the key registry.
pub enum CacheService {
    Manager(CacheManager),
    Chain(FallbackChain),
}

impl CacheService {
    /// Single in-process tier; the default wiring.
    pub fn memory() -> Self {
        CacheService::Manager(CacheManager::default())
    }

    /// Build the wiring selected by [`CacheSettings`].
    pub fn from_settings(settings: &CacheSettings) -> Self {
        match settings.mode {
            CacheMode::Memory => CacheService::memory(),
            CacheMode::File => CacheService::Manager(CacheManager::new(Arc::new(
                FileCacheDriver::new(settings.dir.clone()),
            ))),
            CacheMode::FallbackChain => CacheService::Chain(FallbackChain::new(vec![
                Arc::new(MemcachedCacheDriver::new(settings.memcached_addr.clone())),
                Arc::new(FileCacheDriver::new(settings.dir.clone())),
                Arc::new(MemoryCacheDriver::new()),
            ])),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        match self {
            CacheService::Manager(manager) => manager.get(key).await,
            CacheService::Chain(chain) => chain.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        match self {
            CacheService::Manager(manager) => manager.set(key, value, ttl_secs).await,
            CacheService::Chain(chain) => chain.set(key, value, ttl_secs).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            CacheService::Manager(manager) => manager.delete(key).await,
            CacheService::Chain(chain) => chain.delete(key).await,
        }
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        match self {
            CacheService::Manager(manager) => manager.clear().await,
            CacheService::Chain(chain) => chain.clear().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_manager_delegates_to_active_driver() {
        let manager = CacheManager::default();
        manager.set("k", &json!(1), 0).await.unwrap();
        assert_eq!(manager.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(manager.driver_name(), "memory");
    }

    #[tokio::test]
    async fn test_use_driver_swaps_the_store() {
        let manager = CacheManager::default();
        manager.set("k", &json!(1), 0).await.unwrap();

        manager.use_driver(Arc::new(MemoryCacheDriver::new()));
        // The fresh driver has no entries.
        assert_eq!(manager.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_service_clear_wipes_single_tier() {
        let service = CacheService::memory();
        service.set("a", &json!(1), 0).await.unwrap();
        service.clear().await.unwrap();
        assert_eq!(service.get("a").await.unwrap(), None);
    }
}
