// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache driver trait
//!
//! All storage tiers implement this trait with identical semantics:
//! `ttl == 0` means no expiration, and expired entries are invisible to
//! `get` and physically removed opportunistically on access or on clear.

use async_trait::async_trait;
use serde_json::Value;

use super::CacheError;

#[async_trait]
pub trait CacheDriver: Send + Sync {
    /// Driver name for chain diagnostics and logging.
    fn name(&self) -> &'static str;

    /// Return the stored value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store a value for `ttl_secs` seconds; `0` means no expiration.
    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<(), CacheError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key in this tier.
    async fn clear(&self) -> Result<(), CacheError>;
}
