// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache hit/miss analytics with adaptive TTL tuning
//!
//! Tracks per-model hit and miss counts, and every fixed number of
//! recorded operations (globally, not per model) re-derives the TTL of
//! the model that triggered the threshold: frequently-hit models get
//! longer-lived caching, rarely-hit ones shrink to limit staleness.
//! The new TTL is pushed back into the model's default through the
//! `TtlSlot` registered at model-definition time, so future cache
//! writes observe it. A model with sparse traffic may go long stretches
//! without adjustment even if its own ratio is extreme; the interval is
//! global by design.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::now_millis;

/// Run an adjustment every this many recorded operations.
const ADJUST_INTERVAL: u64 = 100;
/// TTL bounds in seconds.
const MIN_TTL: u64 = 30;
const MAX_TTL: u64 = 3600;
/// Grow above this hit rate, shrink below the lower one.
const GROW_THRESHOLD: f64 = 0.8;
const SHRINK_THRESHOLD: f64 = 0.4;

/// A model's externally visible default TTL, shared between its
/// definition and the analytics. Zero encodes "unset".
#[derive(Debug, Default)]
pub struct TtlSlot(AtomicU64);

impl TtlSlot {
    pub fn new(initial: Option<u64>) -> Self {
        Self(AtomicU64::new(initial.unwrap_or(0)))
    }

    pub fn get(&self) -> Option<u64> {
        match self.0.load(Ordering::Relaxed) {
            0 => None,
            ttl => Some(ttl),
        }
    }

    pub fn set(&self, ttl_secs: u64) {
        self.0.store(ttl_secs, Ordering::Relaxed);
    }
}

struct ModelStats {
    hits: u64,
    misses: u64,
    current_ttl: u64,
    last_adjust: i64,
    slot: Option<Arc<TtlSlot>>,
}

/// Snapshot row for monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCacheStats {
    pub model: String,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
    pub last_adjust_ms: i64,
}

#[derive(Default)]
struct AnalyticsInner {
    stats: HashMap<String, ModelStats>,
    counter: u64,
}

/// Per-model cache counters and the adjustment loop. O(1) map updates
/// per recorded operation.
#[derive(Default)]
pub struct CacheAnalytics {
    inner: Mutex<AnalyticsInner>,
}

impl CacheAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire a model's TTL slot so adjustments reach its default TTL.
    pub fn register(&self, model: &str, slot: Arc<TtlSlot>) {
        let mut inner = self.inner.lock();
        match inner.stats.get_mut(model) {
            Some(stats) => stats.slot = Some(slot),
            None => {
                let current_ttl = slot.get().unwrap_or(0);
                inner.stats.insert(
                    model.to_string(),
                    ModelStats {
                        hits: 0,
                        misses: 0,
                        current_ttl,
                        last_adjust: now_millis(),
                        slot: Some(slot),
                    },
                );
            }
        }
    }

    /// Record a cache hit.
    pub fn hit(&self, model: &str, ttl_secs: u64) {
        self.record(model, ttl_secs, true);
    }

    /// Record a cache miss.
    pub fn miss(&self, model: &str, ttl_secs: u64) {
        self.record(model, ttl_secs, false);
    }

    fn record(&self, model: &str, ttl_secs: u64, hit: bool) {
        let mut inner = self.inner.lock();

        let stats = inner
            .stats
            .entry(model.to_string())
            .or_insert_with(|| ModelStats {
                hits: 0,
                misses: 0,
                // TTL in effect at first observation seeds the baseline.
                current_ttl: ttl_secs,
                last_adjust: now_millis(),
                slot: None,
            });
        if stats.current_ttl == 0 {
            stats.current_ttl = ttl_secs;
        }
        if hit {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        inner.counter += 1;
        if inner.counter % ADJUST_INTERVAL == 0 {
            Self::adjust(&mut inner, model);
        }
    }

    fn adjust(inner: &mut AnalyticsInner, model: &str) {
        let Some(stats) = inner.stats.get_mut(model) else {
            return;
        };
        let total = stats.hits + stats.misses;
        if total == 0 {
            return;
        }

        let hit_rate = stats.hits as f64 / total as f64;
        let mut new_ttl = stats.current_ttl as f64;
        if hit_rate > GROW_THRESHOLD {
            new_ttl *= 1.25;
        } else if hit_rate < SHRINK_THRESHOLD {
            new_ttl *= 0.75;
        }
        let new_ttl = (new_ttl.round() as u64).clamp(MIN_TTL, MAX_TTL);

        if new_ttl != stats.current_ttl {
            log::debug!(
                "cache ttl for '{}': hit rate {:.1}% -> {}s -> {}s",
                model,
                hit_rate * 100.0,
                stats.current_ttl,
                new_ttl
            );
            stats.current_ttl = new_ttl;
            stats.last_adjust = now_millis();
            if let Some(slot) = &stats.slot {
                slot.set(new_ttl);
            }
        }

        // Counters restart for the next cycle either way.
        stats.hits = 0;
        stats.misses = 0;
    }

    /// Per-model stats for monitoring.
    pub fn snapshot(&self) -> Vec<ModelCacheStats> {
        let inner = self.inner.lock();
        let mut rows: Vec<ModelCacheStats> = inner
            .stats
            .iter()
            .map(|(model, stats)| ModelCacheStats {
                model: model.clone(),
                hits: stats.hits,
                misses: stats.misses,
                ttl_secs: stats.current_ttl,
                last_adjust_ms: stats.last_adjust,
            })
            .collect();
        rows.sort_by(|a, b| a.model.cmp(&b.model));
        rows
    }
}
