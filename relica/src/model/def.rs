// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Model definitions
//!
//! A `ModelDef` is the per-model registration handle: table and
//! connection identifiers, primary key, soft-delete configuration,
//! cast table, hidden fields, cache defaults, hook and scope
//! registries, and relation metadata. Definitions are built once,
//! registered with the ORM, and shared immutably; the hook and scope
//! registries are internally synchronized so listeners can be added
//! after registration.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::behaviors::hooks::HookRegistry;
use super::behaviors::scopes::ScopeRegistry;
use super::pipeline::{standard_pipeline, Behavior};
use crate::cache::TtlSlot;
use crate::relations::RelationDef;

/// Supported attribute casts applied on read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Number,
    Boolean,
    /// Normalize to an RFC 3339 string.
    DateTime,
    /// Parse string payloads into structured JSON.
    Json,
}

/// Dynamic TTL strategy: `(payload, group) -> ttl seconds`, consulted
/// after an explicit per-call TTL and before the static tables.
pub type CacheStrategyFn = Arc<dyn Fn(&Value, &str) -> Option<u64> + Send + Sync>;

/// Model-level cache configuration.
pub struct CacheDefaults {
    /// Model-wide default TTL; adaptive tuning writes back here.
    pub(crate) ttl_slot: Arc<TtlSlot>,
    /// Per-group static TTL table.
    pub(crate) group_ttl: HashMap<String, u64>,
    pub(crate) strategy: Option<CacheStrategyFn>,
}

impl CacheDefaults {
    /// Whether model-level defaults imply caching without an explicit
    /// per-call opt-in.
    pub(crate) fn configured(&self) -> bool {
        self.ttl_slot.get().is_some() || !self.group_ttl.is_empty() || self.strategy.is_some()
    }
}

pub struct ModelDef {
    name: String,
    table: String,
    connection: String,
    primary_key: String,
    soft_deletes: bool,
    deleted_at_column: String,
    casts: HashMap<String, CastType>,
    hidden: Vec<String>,
    cache: CacheDefaults,
    hooks: HookRegistry,
    scopes: ScopeRegistry,
    relations: HashMap<String, RelationDef>,
    pipeline: Vec<Arc<dyn Behavior>>,
}

impl ModelDef {
    /// Start building a definition. `name` keys cache entries,
    /// analytics, and relation lookups; `table` is the table or
    /// collection identifier.
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> ModelDefBuilder {
        ModelDefBuilder {
            name: name.into(),
            table: table.into(),
            connection: "memory".to_string(),
            primary_key: "id".to_string(),
            soft_deletes: false,
            deleted_at_column: "deleted_at".to_string(),
            casts: HashMap::new(),
            hidden: Vec::new(),
            default_cache_ttl: None,
            group_ttl: HashMap::new(),
            strategy: None,
            relations: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn soft_deletes_enabled(&self) -> bool {
        self.soft_deletes
    }

    pub fn deleted_at_column(&self) -> &str {
        &self.deleted_at_column
    }

    pub fn casts(&self) -> &HashMap<String, CastType> {
        &self.casts
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    /// Lifecycle hook registry; listeners may be added at any time.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Global scope registry; scopes may be added or removed at any time.
    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    pub fn relation_def(&self, name: &str) -> Option<RelationDef> {
        self.relations.get(name).cloned()
    }

    pub fn relation_names(&self) -> Vec<&str> {
        self.relations.keys().map(String::as_str).collect()
    }

    pub(crate) fn cache_defaults(&self) -> &CacheDefaults {
        &self.cache
    }

    /// Shared slot holding the model's default TTL.
    pub fn ttl_slot(&self) -> &Arc<TtlSlot> {
        &self.cache.ttl_slot
    }

    pub(crate) fn pipeline(&self) -> &[Arc<dyn Behavior>] {
        &self.pipeline
    }
}

pub struct ModelDefBuilder {
    name: String,
    table: String,
    connection: String,
    primary_key: String,
    soft_deletes: bool,
    deleted_at_column: String,
    casts: HashMap<String, CastType>,
    hidden: Vec<String>,
    default_cache_ttl: Option<u64>,
    group_ttl: HashMap<String, u64>,
    strategy: Option<CacheStrategyFn>,
    relations: HashMap<String, RelationDef>,
}

impl ModelDefBuilder {
    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.connection = name.into();
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Enable soft deletion via the default `deleted_at` column.
    pub fn soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    pub fn deleted_at_column(mut self, column: impl Into<String>) -> Self {
        self.soft_deletes = true;
        self.deleted_at_column = column.into();
        self
    }

    pub fn cast(mut self, field: impl Into<String>, cast: CastType) -> Self {
        self.casts.insert(field.into(), cast);
        self
    }

    /// Fields stripped by serialization.
    pub fn hidden<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Model-wide default TTL; makes caching implicit for every read.
    pub fn default_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_cache_ttl = Some(ttl_secs);
        self
    }

    /// Static TTL for one operation group (`"find"`, `"all"`).
    pub fn group_cache_ttl(mut self, group: impl Into<String>, ttl_secs: u64) -> Self {
        self.group_ttl.insert(group.into(), ttl_secs);
        self
    }

    /// Dynamic TTL strategy consulted per call.
    pub fn cache_strategy<F>(mut self, strategy: F) -> Self
    where
        F: Fn(&Value, &str) -> Option<u64> + Send + Sync + 'static,
    {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Declare a relation under its explicit attachment name.
    pub fn relation(mut self, name: impl Into<String>, def: RelationDef) -> Self {
        self.relations.insert(name.into(), def);
        self
    }

    pub fn build(self) -> ModelDef {
        ModelDef {
            name: self.name,
            table: self.table,
            connection: self.connection,
            primary_key: self.primary_key,
            soft_deletes: self.soft_deletes,
            deleted_at_column: self.deleted_at_column,
            casts: self.casts,
            hidden: self.hidden,
            cache: CacheDefaults {
                ttl_slot: Arc::new(TtlSlot::new(self.default_cache_ttl)),
                group_ttl: self.group_ttl,
                strategy: self.strategy,
            },
            hooks: HookRegistry::new(),
            scopes: ScopeRegistry::new(),
            relations: self.relations,
            pipeline: standard_pipeline(),
        }
    }
}
