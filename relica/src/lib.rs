// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relica - A lightweight multi-driver ORM with composable model
//! behaviors and adaptive query caching
//!
//! Relica layers independent cross-cutting behaviors around a
//! driver-agnostic CRUD core:
//!
//! - **Behavior pipeline**: eager loading, query-result caching,
//!   lifecycle hooks, global scopes, soft deletes, and attribute casts,
//!   composed in a fixed order around the connection
//! - **Caching subsystem**: interchangeable key/value tiers (memory,
//!   file, memcached), a multi-tier fallback chain, registry-driven
//!   write invalidation, and hit-rate-driven adaptive TTL tuning
//! - **Relations**: has-one/has-many, belongs-to, many-to-many through
//!   a pivot, and polymorphic variants, each with single-parent fetch
//!   and batched eager loading
//!
//! # Usage
//!
//! ```ignore
//! let orm = Orm::builder()
//!     .connection("memory", ConnectionHandle::Document(Arc::new(MemoryConnection::new())))
//!     .build();
//!
//! orm.register(
//!     ModelDef::builder("User", "users")
//!         .soft_deletes()
//!         .default_cache_ttl(120)
//!         .relation("posts", RelationDef::has_many("Post", "user_id", "id"))
//!         .build(),
//! );
//! orm.register(ModelDef::builder("Post", "posts").build());
//!
//! let users = orm.model("User")?.with(["posts"]).cache(60).all().await?;
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod model;
pub mod orm;
pub mod record;
pub mod relations;

pub use cache::{
    CacheAnalytics, CacheDriver, CacheEntry, CacheError, CacheManager, CacheService,
    FallbackChain, FileCacheDriver, KeyRegistry, MemcachedCacheDriver, MemoryCacheDriver,
    ModelCacheStats, TtlSlot,
};
pub use config::{CacheMode, CacheSettings, ConfigError, ConnectionSettings, DatabaseConfig};
pub use connection::{
    ConnectionError, ConnectionHandle, ConnectionRegistry, DocumentConnection, DriverKind,
    ExecResult, Filter, MemoryConnection, SqlConnection,
};
pub use error::{Error, Result};
pub use model::{
    CacheOption, CastType, HookEvent, HookPayload, Model, ModelDef, ModelDefBuilder,
    TrashedVisibility,
};
pub use orm::{Orm, OrmBuilder};
pub use record::Record;
pub use relations::{Relation, RelationDef, RelationError};

/// Relica version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Relica crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
