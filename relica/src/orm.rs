// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The ORM coordinator
//!
//! `Orm` owns everything the model layer shares: the connection
//! registry, the cache service, the cache key registry, the analytics,
//! the morph-target registry, and the registered model definitions.
//! It is the single entry point: definitions are registered once at
//! startup and `model()` hands out per-use handles.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::{
    CacheAnalytics, CacheDriver, CacheManager, CacheService, FallbackChain, KeyRegistry,
    ModelCacheStats,
};
use crate::config::{CacheSettings, DatabaseConfig};
use crate::connection::{ConnectionHandle, ConnectionRegistry, DriverKind, MemoryConnection};
use crate::error::Error;
use crate::model::pipeline::ModelServices;
use crate::model::{Model, ModelDef};

/// Shared ORM internals, handed to models and relation descriptors.
pub(crate) struct OrmCore {
    connections: ConnectionRegistry,
    cache: CacheService,
    registry: KeyRegistry,
    analytics: CacheAnalytics,
    morphs: RwLock<HashMap<String, String>>,
    models: RwLock<HashMap<String, Arc<ModelDef>>>,
}

impl OrmCore {
    pub(crate) fn model_def(&self, name: &str) -> Option<Arc<ModelDef>> {
        self.models.read().get(name).cloned()
    }

    pub(crate) fn connection_for(&self, def: &ModelDef) -> Result<ConnectionHandle, Error> {
        Ok(self.connections.get(def.connection())?)
    }

    pub(crate) fn morph_target(&self, type_value: &str) -> Option<Arc<ModelDef>> {
        let model_name = self.morphs.read().get(type_value).cloned()?;
        self.model_def(&model_name)
    }

    pub(crate) fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub(crate) fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub(crate) fn analytics(&self) -> &CacheAnalytics {
        &self.analytics
    }
}

pub struct OrmBuilder {
    cache: Option<CacheService>,
    connections: Vec<(String, ConnectionHandle)>,
}

impl OrmBuilder {
    /// Use a prebuilt cache service.
    pub fn cache_service(mut self, service: CacheService) -> Self {
        self.cache = Some(service);
        self
    }

    /// Use a single cache driver behind a manager.
    pub fn cache_driver(mut self, driver: Arc<dyn CacheDriver>) -> Self {
        self.cache = Some(CacheService::Manager(CacheManager::new(driver)));
        self
    }

    /// Use an ordered fallback chain of cache drivers.
    pub fn fallback_chain(mut self, drivers: Vec<Arc<dyn CacheDriver>>) -> Self {
        self.cache = Some(CacheService::Chain(FallbackChain::new(drivers)));
        self
    }

    /// Wire the cache tiers selected by settings (typically from env).
    pub fn cache_settings(mut self, settings: &CacheSettings) -> Self {
        self.cache = Some(CacheService::from_settings(settings));
        self
    }

    /// Register an already-open connection handle under a name.
    pub fn connection(mut self, name: impl Into<String>, handle: ConnectionHandle) -> Self {
        self.connections.push((name.into(), handle));
        self
    }

    /// Validate a database configuration and pre-register what can be
    /// opened in-process. Connections on external drivers must still be
    /// registered by the embedder with their open handles; resolving
    /// one that never was is a fatal error at `model()` time.
    pub fn database_config(mut self, config: &DatabaseConfig) -> Result<Self, Error> {
        config.validate()?;
        for (name, settings) in &config.connections {
            let kind: DriverKind = settings.driver.parse()?;
            if kind == DriverKind::Memory {
                self.connections.push((
                    name.clone(),
                    ConnectionHandle::Document(Arc::new(MemoryConnection::new())),
                ));
            }
        }
        Ok(self)
    }

    pub fn build(self) -> Orm {
        let connections = ConnectionRegistry::new();
        for (name, handle) in self.connections {
            connections.register(name, handle);
        }
        Orm {
            core: Arc::new(OrmCore {
                connections,
                cache: self.cache.unwrap_or_else(CacheService::memory),
                registry: KeyRegistry::new(),
                analytics: CacheAnalytics::new(),
                morphs: RwLock::new(HashMap::new()),
                models: RwLock::new(HashMap::new()),
            }),
        }
    }
}

pub struct Orm {
    core: Arc<OrmCore>,
}

impl Orm {
    pub fn builder() -> OrmBuilder {
        OrmBuilder {
            cache: None,
            connections: Vec::new(),
        }
    }

    /// An ORM with an in-process cache and no connections; mostly
    /// useful in tests.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Register a model definition, wiring its TTL slot into the
    /// analytics so adaptive tuning reaches the model's default TTL.
    pub fn register(&self, def: ModelDef) -> Arc<ModelDef> {
        let def = Arc::new(def);
        self.core
            .analytics
            .register(def.name(), def.ttl_slot().clone());
        self.core
            .models
            .write()
            .insert(def.name().to_string(), def.clone());
        log::debug!("registered model '{}' (table '{}')", def.name(), def.table());
        def
    }

    /// Map a polymorphic discriminator value to a registered model.
    pub fn register_morph(&self, type_value: impl Into<String>, model: impl Into<String>) {
        self.core.morphs.write().insert(type_value.into(), model.into());
    }

    /// Register an open connection handle after construction.
    pub fn register_connection(&self, name: impl Into<String>, handle: ConnectionHandle) {
        self.core.connections.register(name, handle);
    }

    /// A per-use model handle. Fails fast when the model is unknown or
    /// its connection is not registered.
    pub fn model(&self, name: &str) -> Result<Model, Error> {
        let def = self
            .core
            .model_def(name)
            .ok_or_else(|| Error::ModelNotRegistered(name.to_string()))?;
        let conn = self.core.connection_for(&def)?;
        Ok(Model::new(ModelServices {
            def,
            conn,
            core: self.core.clone(),
        }))
    }

    /// A registered model's definition.
    pub fn model_def(&self, name: &str) -> Result<Arc<ModelDef>, Error> {
        self.core
            .model_def(name)
            .ok_or_else(|| Error::ModelNotRegistered(name.to_string()))
    }

    /// Direct access to the cache service.
    pub fn cache(&self) -> &CacheService {
        &self.core.cache
    }

    /// Per-model cache hit/miss statistics for monitoring.
    pub fn cache_stats(&self) -> Vec<ModelCacheStats> {
        self.core.analytics.snapshot()
    }

    /// Wipe the entire cache and the key registry.
    pub async fn clear_cache(&self) -> Result<(), crate::cache::CacheError> {
        self.core.registry.clear_all(&self.core.cache).await
    }
}

impl Default for Orm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_lookup_fails_fast() {
        let orm = Orm::new();
        assert!(matches!(
            orm.model("User"),
            Err(Error::ModelNotRegistered(_))
        ));
    }

    #[test]
    fn test_unregistered_connection_fails_at_resolution() {
        let orm = Orm::new();
        orm.register(ModelDef::builder("User", "users").connection("mysql").build());
        let err = orm.model("User").unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn test_register_and_resolve_model() {
        let orm = Orm::builder()
            .connection(
                "memory",
                ConnectionHandle::Document(Arc::new(MemoryConnection::new())),
            )
            .build();
        orm.register(ModelDef::builder("User", "users").build());
        assert!(orm.model("User").is_ok());
        assert_eq!(orm.model_def("User").unwrap().table(), "users");
    }

    #[test]
    fn test_database_config_opens_memory_connections() {
        let orm = Orm::builder()
            .database_config(&DatabaseConfig::default())
            .unwrap()
            .build();
        orm.register(ModelDef::builder("User", "users").build());
        assert!(orm.model("User").is_ok());
    }

    #[test]
    fn test_database_config_rejects_unknown_drivers() {
        use crate::config::ConnectionSettings;

        let mut config = DatabaseConfig::default();
        config
            .connections
            .insert("weird".to_string(), ConnectionSettings::new("oracle"));
        assert!(Orm::builder().database_config(&config).is_err());
    }
}
