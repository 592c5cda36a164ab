// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query-result caching subsystem
//!
//! This module provides the caching tiers behind the model layer:
//! - Uniform key/value drivers with TTL (in-process, file-backed, remote)
//! - A manager holding one active driver, and a multi-tier fallback chain
//! - A key registry enabling bulk invalidation per model or group
//! - Hit/miss analytics driving adaptive per-model TTL tuning
//! - Deterministic cache-key derivation from query payloads

pub mod analytics;
pub mod driver;
pub mod drivers;
pub mod fallback;
pub mod key;
pub mod manager;
pub mod registry;

pub use analytics::{CacheAnalytics, ModelCacheStats, TtlSlot};
pub use driver::CacheDriver;
pub use drivers::{FileCacheDriver, MemcachedCacheDriver, MemoryCacheDriver};
pub use fallback::FallbackChain;
pub use key::{cache_key, hash_payload};
pub use manager::{CacheManager, CacheService};
pub use registry::KeyRegistry;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default TTL applied when neither the call, the model, nor the group
/// specifies one.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Error type for cache-tier operations.
///
/// These never abort a logical model operation: the query-cache layer
/// swallows them and degrades to a miss. Only direct cache-API callers
/// observe them, and only the fallback chain produces the aggregate
/// variant, after every tier has failed.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache driver '{driver}' failed: {message}")]
    Driver { driver: String, message: String },

    #[error("all cache drivers failed in fallback chain: [{attempted}]")]
    AllDriversFailed { attempted: String },
}

impl CacheError {
    pub fn driver(name: impl Into<String>, message: impl Into<String>) -> Self {
        CacheError::Driver {
            driver: name.into(),
            message: message.into(),
        }
    }
}

/// A stored cache value with its absolute expiry.
///
/// `expires_at` is wall-clock epoch milliseconds so file-backed entries
/// survive process restarts; `None` means the entry never expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: Option<i64>,
}

impl CacheEntry {
    /// Build an entry expiring `ttl_secs` from now; `0` means no expiry.
    pub fn new(value: Value, ttl_secs: u64) -> Self {
        let expires_at = if ttl_secs > 0 {
            Some(now_millis() + (ttl_secs as i64) * 1000)
        } else {
            None
        };
        Self { value, expires_at }
    }

    /// An expired entry must never be returned by `get`.
    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if now_millis() > at)
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
