// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Multi-tier cache fallback chain
//!
//! Drivers are tried in priority order on every operation: a fast but
//! possibly unreliable primary degrades to slower, more durable tiers
//! without caller-visible failure. Ordering is always primary-first per
//! call, never sticky, so a recovered primary is picked up again on the
//! next operation. The "active" driver is recorded purely for
//! observability.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::{CacheDriver, CacheError};

const NO_ACTIVE: usize = usize::MAX;

pub struct FallbackChain {
    drivers: Vec<Arc<dyn CacheDriver>>,
    /// Index of the last driver that served an operation.
    active: AtomicUsize,
}

impl FallbackChain {
    /// First driver is the primary, last is the final backup.
    pub fn new(drivers: Vec<Arc<dyn CacheDriver>>) -> Self {
        Self {
            drivers,
            active: AtomicUsize::new(NO_ACTIVE),
        }
    }

    /// Name of the last driver that successfully served an operation.
    pub fn active_driver(&self) -> Option<&'static str> {
        let index = self.active.load(Ordering::Relaxed);
        self.drivers.get(index).map(|driver| driver.name())
    }

    fn record_success(&self, index: usize) {
        self.active.store(index, Ordering::Relaxed);
    }

    fn exhausted(&self) -> CacheError {
        let attempted = self
            .drivers
            .iter()
            .map(|driver| driver.name())
            .collect::<Vec<_>>()
            .join(", ");
        CacheError::AllDriversFailed { attempted }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        for (index, driver) in self.drivers.iter().enumerate() {
            match driver.get(key).await {
                Ok(value) => {
                    self.record_success(index);
                    return Ok(value);
                }
                Err(err) => {
                    log::warn!("cache driver '{}' get failed: {}", driver.name(), err);
                }
            }
        }
        Err(self.exhausted())
    }

    pub async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        for (index, driver) in self.drivers.iter().enumerate() {
            match driver.set(key, value, ttl_secs).await {
                Ok(()) => {
                    self.record_success(index);
                    return Ok(());
                }
                Err(err) => {
                    log::warn!("cache driver '{}' set failed: {}", driver.name(), err);
                }
            }
        }
        Err(self.exhausted())
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        for (index, driver) in self.drivers.iter().enumerate() {
            match driver.delete(key).await {
                Ok(()) => {
                    self.record_success(index);
                    return Ok(());
                }
                Err(err) => {
                    log::warn!("cache driver '{}' delete failed: {}", driver.name(), err);
                }
            }
        }
        Err(self.exhausted())
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        for (index, driver) in self.drivers.iter().enumerate() {
            match driver.clear().await {
                Ok(()) => {
                    self.record_success(index);
                    return Ok(());
                }
                Err(err) => {
                    log::warn!("cache driver '{}' clear failed: {}", driver.name(), err);
                }
            }
        }
        Err(self.exhausted())
    }
}
