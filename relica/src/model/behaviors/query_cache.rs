// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query-cache stage
//!
//! Read-through caching for `find` and `all`, write-invalidation for the
//! mutating operations. Caching is best-effort end to end: cache reads
//! and writes that fail are logged and swallowed, degrading to the
//! uncached path, and never abort the logical operation. Invalidation
//! is coarse-grained by design: any successful write drops every
//! registered key for the model, since the registry cannot know which
//! cached rows depended on the mutated record.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::super::pipeline::{Behavior, CacheOption, CallContext, ModelServices, Next};
use crate::cache::{cache_key, DEFAULT_TTL_SECS};
use crate::error::Error;
use crate::record::Record;

const GROUP_FIND: &str = "find";
const GROUP_ALL: &str = "all";

pub struct QueryCache;

/// Whether this call should touch the cache at all. The fully-disabled
/// path adds zero overhead.
fn cache_active(sv: &ModelServices, ctx: &CallContext) -> bool {
    match ctx.cache {
        CacheOption::Bypass => false,
        CacheOption::Enabled { .. } => true,
        CacheOption::Inherit => sv.def.cache_defaults().configured(),
    }
}

/// Effective TTL, by priority: explicit per-call TTL, dynamic strategy,
/// per-group static table, model default, global fallback.
fn resolve_ttl(sv: &ModelServices, ctx: &CallContext, payload: &Value, group: &str) -> u64 {
    if let CacheOption::Enabled { ttl_secs } = ctx.cache {
        if ttl_secs > 0 {
            return ttl_secs;
        }
    }
    let defaults = sv.def.cache_defaults();
    if let Some(strategy) = &defaults.strategy {
        if let Some(ttl_secs) = strategy(payload, group) {
            return ttl_secs;
        }
    }
    if let Some(ttl_secs) = defaults.group_ttl.get(group) {
        return *ttl_secs;
    }
    if let Some(ttl_secs) = defaults.ttl_slot.get() {
        return ttl_secs;
    }
    DEFAULT_TTL_SECS
}

/// Drop every cached read for the model after a successful write.
async fn invalidate(sv: &ModelServices) {
    sv.core
        .registry()
        .clear_model(sv.core.cache(), sv.def.name())
        .await;
}

#[async_trait]
impl Behavior for QueryCache {
    fn name(&self) -> &'static str {
        "query-cache"
    }

    async fn find(
        &self,
        ctx: &CallContext,
        id: Value,
        next: Next<'_>,
    ) -> Result<Option<Record>, Error> {
        let sv = next.services();
        if !cache_active(sv, ctx) {
            return next.find(ctx, id).await;
        }

        let model = sv.def.name().to_string();
        let payload = json!({
            "op": "find",
            "id": id.clone(),
            "pk": sv.def.primary_key(),
            "trashed": ctx.trashed.tag(),
        });
        let key = cache_key(&model, GROUP_FIND, &payload);
        let ttl = resolve_ttl(sv, ctx, &payload, GROUP_FIND);

        let mut cached: Option<Record> = None;
        match sv.core.cache().get(&key).await {
            Ok(Some(value)) if !value.is_null() => {
                cached = serde_json::from_value(value).ok();
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("cache read failed for '{}': {}", key, err);
            }
        }
        if let Some(record) = cached {
            sv.core.analytics().hit(&model, ttl);
            return Ok(Some(record));
        }
        sv.core.analytics().miss(&model, ttl);

        let result = next.find(ctx, id).await?;

        let value = result
            .as_ref()
            .map(|record| Value::Object(record.clone()))
            .unwrap_or(Value::Null);
        match sv.core.cache().set(&key, &value, ttl).await {
            Ok(()) => sv.core.registry().add_key(&model, GROUP_FIND, &key),
            Err(err) => log::warn!("cache write failed for '{}': {}", key, err),
        }
        Ok(result)
    }

    async fn all(&self, ctx: &CallContext, next: Next<'_>) -> Result<Vec<Record>, Error> {
        let sv = next.services();
        if !cache_active(sv, ctx) {
            return next.all(ctx).await;
        }

        let model = sv.def.name().to_string();
        let payload = json!({
            "op": "all",
            "trashed": ctx.trashed.tag(),
        });
        let key = cache_key(&model, GROUP_ALL, &payload);
        let ttl = resolve_ttl(sv, ctx, &payload, GROUP_ALL);

        let mut cached: Option<Vec<Record>> = None;
        match sv.core.cache().get(&key).await {
            Ok(Some(value)) if value.is_array() => {
                cached = serde_json::from_value(value).ok();
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("cache read failed for '{}': {}", key, err);
            }
        }
        if let Some(records) = cached {
            sv.core.analytics().hit(&model, ttl);
            return Ok(records);
        }
        sv.core.analytics().miss(&model, ttl);

        let result = next.all(ctx).await?;

        let value = Value::Array(result.iter().cloned().map(Value::Object).collect());
        match sv.core.cache().set(&key, &value, ttl).await {
            Ok(()) => sv.core.registry().add_key(&model, GROUP_ALL, &key),
            Err(err) => log::warn!("cache write failed for '{}': {}", key, err),
        }
        Ok(result)
    }

    async fn create(
        &self,
        ctx: &CallContext,
        data: Record,
        next: Next<'_>,
    ) -> Result<Record, Error> {
        let sv = next.services();
        let record = next.create(ctx, data).await?;
        invalidate(sv).await;
        Ok(record)
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: Value,
        data: Record,
        next: Next<'_>,
    ) -> Result<(), Error> {
        let sv = next.services();
        next.update(ctx, id, data).await?;
        invalidate(sv).await;
        Ok(())
    }

    async fn delete(&self, ctx: &CallContext, id: Value, next: Next<'_>) -> Result<(), Error> {
        let sv = next.services();
        next.delete(ctx, id).await?;
        invalidate(sv).await;
        Ok(())
    }
}
