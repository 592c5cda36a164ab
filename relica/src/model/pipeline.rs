// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The model behavior pipeline
//!
//! Cross-cutting model logic is an ordered list of interceptors over a
//! fixed operation set, each delegating inward through an explicit
//! `Next` handle. The order is fixed and matters: outer layers see the
//! effects of inner layers. Outermost first:
//!
//! eager-loading -> query-cache -> hooks -> scopes -> soft-deletes ->
//! casts -> core CRUD
//!
//! Eager loading sits outside the cache so results served from cache
//! are still relation-hydrated on return. Within one call, each
//! layer's pre/post logic runs strictly in composition order.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::behaviors::casts::Casts;
use super::behaviors::eager::EagerLoading;
use super::behaviors::hooks::Hooks;
use super::behaviors::query_cache::QueryCache;
use super::behaviors::scopes::Scopes;
use super::behaviors::soft_deletes::SoftDeletes;
use super::core;
use super::ModelDef;
use crate::connection::ConnectionHandle;
use crate::error::Error;
use crate::orm::OrmCore;
use crate::record::Record;

/// Everything a pipeline stage needs to do its work: the model's
/// definition, its resolved connection, and the ORM-wide services.
#[derive(Clone)]
pub(crate) struct ModelServices {
    pub def: Arc<ModelDef>,
    pub conn: ConnectionHandle,
    pub core: Arc<OrmCore>,
}

/// Soft-delete visibility for the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedVisibility {
    /// Deleted rows are invisible.
    #[default]
    Exclude,
    /// Deleted rows are included.
    With,
    /// Only deleted rows are returned.
    Only,
}

impl TrashedVisibility {
    /// Tag folded into cache payloads: visibility changes result
    /// semantics, so it must change the cache key.
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            TrashedVisibility::Exclude => "exclude",
            TrashedVisibility::With => "with",
            TrashedVisibility::Only => "only",
        }
    }
}

/// Per-call caching preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheOption {
    /// Follow the model's defaults.
    #[default]
    Inherit,
    /// Cache this call with an explicit TTL.
    Enabled { ttl_secs: u64 },
    /// Force bypass regardless of model defaults.
    Bypass,
}

/// Mutable per-call state, assembled by the chaining methods on
/// [`Model`](super::Model) and consumed by the terminal operation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Relation paths to eager load (`"posts"`, `"posts.comments"`).
    pub eager: Vec<String>,
    pub cache: CacheOption,
    pub trashed: TrashedVisibility,
    /// Bypass soft-delete conversion and physically delete.
    pub force_delete: bool,
}

/// A pipeline stage. Every method defaults to plain delegation, so a
/// stage only spells out the operations it intercepts.
#[async_trait]
pub trait Behavior: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find(
        &self,
        ctx: &CallContext,
        id: Value,
        next: Next<'_>,
    ) -> Result<Option<Record>, Error> {
        next.find(ctx, id).await
    }

    async fn all(&self, ctx: &CallContext, next: Next<'_>) -> Result<Vec<Record>, Error> {
        next.all(ctx).await
    }

    async fn create(
        &self,
        ctx: &CallContext,
        data: Record,
        next: Next<'_>,
    ) -> Result<Record, Error> {
        next.create(ctx, data).await
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: Value,
        data: Record,
        next: Next<'_>,
    ) -> Result<(), Error> {
        next.update(ctx, id, data).await
    }

    async fn delete(&self, ctx: &CallContext, id: Value, next: Next<'_>) -> Result<(), Error> {
        next.delete(ctx, id).await
    }
}

/// Handle into the remaining inner stages. The innermost delegation
/// target is the CRUD core against the connection.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    pub(crate) stages: &'a [Arc<dyn Behavior>],
    pub(crate) services: &'a ModelServices,
}

impl<'a> Next<'a> {
    pub(crate) fn entry(services: &'a ModelServices) -> Self {
        Self {
            stages: services.def.pipeline(),
            services,
        }
    }

    pub(crate) fn services(&self) -> &'a ModelServices {
        self.services
    }

    fn inner(&self, rest: &'a [Arc<dyn Behavior>]) -> Next<'a> {
        Next {
            stages: rest,
            services: self.services,
        }
    }

    pub async fn find(self, ctx: &CallContext, id: Value) -> Result<Option<Record>, Error> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.find(ctx, id, self.inner(rest)).await,
            None => core::find(self.services, &id).await,
        }
    }

    pub async fn all(self, ctx: &CallContext) -> Result<Vec<Record>, Error> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.all(ctx, self.inner(rest)).await,
            None => core::all(self.services).await,
        }
    }

    pub async fn create(self, ctx: &CallContext, data: Record) -> Result<Record, Error> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.create(ctx, data, self.inner(rest)).await,
            None => core::create(self.services, data).await,
        }
    }

    pub async fn update(self, ctx: &CallContext, id: Value, data: Record) -> Result<(), Error> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.update(ctx, id, data, self.inner(rest)).await,
            None => core::update(self.services, &id, data).await,
        }
    }

    pub async fn delete(self, ctx: &CallContext, id: Value) -> Result<(), Error> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.delete(ctx, id, self.inner(rest)).await,
            None => core::delete(self.services, &id).await,
        }
    }
}

/// The fixed stage list, assembled once per model definition.
pub(crate) fn standard_pipeline() -> Vec<Arc<dyn Behavior>> {
    vec![
        Arc::new(EagerLoading),
        Arc::new(QueryCache),
        Arc::new(Hooks),
        Arc::new(Scopes),
        Arc::new(SoftDeletes),
        Arc::new(Casts),
    ]
}
