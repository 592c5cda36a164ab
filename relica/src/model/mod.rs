// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The model layer
//!
//! A `Model` is a per-use handle over a registered definition: the five
//! CRUD operations, chaining configuration (`cache`, `without_cache`,
//! `with`, trashed visibility), soft-delete extensions, relation access,
//! and serialization. Every operation traverses the fixed behavior
//! pipeline outward-in; see [`pipeline`] for the ordering contract.

pub mod behaviors;
pub(crate) mod core;
mod def;
pub mod pipeline;
mod serialize;

pub use behaviors::hooks::{HookEvent, HookPayload, HookRegistry};
pub use behaviors::scopes::{ScopeFn, ScopeRegistry};
pub use def::{CacheStrategyFn, CastType, ModelDef, ModelDefBuilder};
pub use pipeline::{Behavior, CacheOption, CallContext, Next, TrashedVisibility};

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::record::Record;
use crate::relations::{self, pivot, Relation, RelationDef, RelationError};
use pipeline::ModelServices;

/// A model handle bound to one definition and connection.
///
/// Handles are constructed per use via [`Orm::model`](crate::Orm::model);
/// chaining methods consume and return the handle, so per-call state is
/// naturally scoped to one instance.
pub struct Model {
    services: ModelServices,
    ctx: CallContext,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("model", &self.services.def.name())
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl Model {
    pub(crate) fn new(services: ModelServices) -> Self {
        Self {
            services,
            ctx: CallContext::default(),
        }
    }

    pub fn def(&self) -> &Arc<ModelDef> {
        &self.services.def
    }

    // ---- chaining configuration ----

    /// Cache the next terminal read with an explicit TTL in seconds.
    pub fn cache(mut self, ttl_secs: u64) -> Self {
        self.ctx.cache = CacheOption::Enabled { ttl_secs };
        self
    }

    /// Bypass the cache for this call regardless of model defaults.
    pub fn without_cache(mut self) -> Self {
        self.ctx.cache = CacheOption::Bypass;
        self
    }

    /// Eager load relation paths on the next terminal read.
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctx.eager.extend(relations.into_iter().map(Into::into));
        self
    }

    /// Include soft-deleted rows in reads.
    pub fn with_trashed(mut self) -> Self {
        self.ctx.trashed = TrashedVisibility::With;
        self
    }

    /// Return only soft-deleted rows.
    pub fn only_trashed(mut self) -> Self {
        self.ctx.trashed = TrashedVisibility::Only;
        self
    }

    // ---- terminal operations ----

    /// Fetch a record by primary key.
    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Record>, Error> {
        pipeline::Next::entry(&self.services)
            .find(&self.ctx, id.into())
            .await
    }

    /// Fetch all records.
    pub async fn all(&self) -> Result<Vec<Record>, Error> {
        pipeline::Next::entry(&self.services).all(&self.ctx).await
    }

    /// Insert a record, returning it with its assigned primary key.
    pub async fn create(&self, data: Record) -> Result<Record, Error> {
        pipeline::Next::entry(&self.services)
            .create(&self.ctx, data)
            .await
    }

    /// Update a record by primary key.
    pub async fn update(&self, id: impl Into<Value>, data: Record) -> Result<(), Error> {
        pipeline::Next::entry(&self.services)
            .update(&self.ctx, id.into(), data)
            .await
    }

    /// Delete a record by primary key. With soft deletion enabled this
    /// writes the deletion timestamp instead of removing the row.
    pub async fn delete(&self, id: impl Into<Value>) -> Result<(), Error> {
        pipeline::Next::entry(&self.services)
            .delete(&self.ctx, id.into())
            .await
    }

    /// Clear a soft-deleted record's deletion timestamp.
    pub async fn restore(&self, id: impl Into<Value>) -> Result<(), Error> {
        let column = self.services.def.deleted_at_column().to_string();
        let data = crate::record::record_from([(column, Value::Null)]);
        self.update(id, data).await
    }

    /// Physically delete a record even when soft deletion is enabled.
    pub async fn force_delete(&self, id: impl Into<Value>) -> Result<(), Error> {
        let mut ctx = self.ctx.clone();
        ctx.force_delete = true;
        pipeline::Next::entry(&self.services)
            .delete(&ctx, id.into())
            .await
    }

    // ---- relations ----

    /// Build the descriptor for a named relation.
    pub fn relation(&self, name: &str) -> Result<Box<dyn Relation>, Error> {
        relations::build(&self.services.core, &self.services.def, name)
    }

    /// Lazily load relations onto an already-fetched record. With no
    /// names given, the paths configured via [`with`](Self::with) load.
    pub async fn load(&self, record: &mut Record, relations: &[&str]) -> Result<(), Error> {
        let names: Vec<String> = if relations.is_empty() {
            self.ctx.eager.clone()
        } else {
            relations.iter().map(|s| s.to_string()).collect()
        };
        let mut records = vec![std::mem::take(record)];
        behaviors::eager::load_paths(&self.services, &names, &mut records).await?;
        *record = records.pop().unwrap_or_default();
        Ok(())
    }

    // ---- pivot maintenance (many-to-many) ----

    fn pivot_parts(&self, relation: &str) -> Result<(String, String, String, String), Error> {
        match self.services.def.relation_def(relation) {
            Some(RelationDef::BelongsToMany {
                related,
                pivot_table,
                pivot_local,
                pivot_related,
                ..
            }) => Ok((related, pivot_table, pivot_local, pivot_related)),
            Some(_) => Err(RelationError::NotAPivotRelation {
                relation: relation.to_string(),
            }
            .into()),
            None => Err(RelationError::NotDefined {
                model: self.services.def.name().to_string(),
                relation: relation.to_string(),
            }
            .into()),
        }
    }

    /// Link this model's `id` to each related id through the relation's
    /// pivot table.
    pub async fn attach(
        &self,
        relation: &str,
        id: impl Into<Value>,
        related_ids: &[Value],
    ) -> Result<(), Error> {
        let (related, pivot_table, pivot_local, pivot_related) = self.pivot_parts(relation)?;
        let (_, conn) = relations::related_parts(&self.services.core, relation, &related)?;
        pivot::attach(&conn, &pivot_table, &pivot_local, &pivot_related, &id.into(), related_ids)
            .await
    }

    /// Remove every pivot link of `id` for the relation.
    pub async fn detach(&self, relation: &str, id: impl Into<Value>) -> Result<(), Error> {
        let (related, pivot_table, pivot_local, _) = self.pivot_parts(relation)?;
        let (_, conn) = relations::related_parts(&self.services.core, relation, &related)?;
        pivot::detach(&conn, &pivot_table, &pivot_local, &id.into()).await
    }

    /// Replace the pivot links of `id` with exactly `related_ids`.
    pub async fn sync(
        &self,
        relation: &str,
        id: impl Into<Value>,
        related_ids: &[Value],
    ) -> Result<(), Error> {
        let (related, pivot_table, pivot_local, pivot_related) = self.pivot_parts(relation)?;
        let (_, conn) = relations::related_parts(&self.services.core, relation, &related)?;
        pivot::sync(&conn, &pivot_table, &pivot_local, &pivot_related, &id.into(), related_ids)
            .await
    }

    // ---- cache maintenance ----

    /// Drop every cached read for this model.
    pub async fn invalidate_cache(&self) {
        self.services
            .core
            .registry()
            .clear_model(self.services.core.cache(), self.services.def.name())
            .await;
    }

    /// Drop the cached reads of one operation group (`"find"`, `"all"`).
    pub async fn invalidate_cache_group(&self, group: &str) {
        self.services
            .core
            .registry()
            .clear_group(self.services.core.cache(), self.services.def.name(), group)
            .await;
    }

    // ---- serialization ----

    /// Serializable view of a record: hidden and internal fields
    /// stripped, relation values sanitized.
    pub fn to_object(&self, record: &Record) -> Record {
        serialize::to_object(&self.services.def, record)
    }

    /// JSON string of the serializable view.
    pub fn to_json(&self, record: &Record) -> String {
        serialize::to_json(&self.services.def, record)
    }
}
