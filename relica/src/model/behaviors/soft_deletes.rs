// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Soft-delete stage
//!
//! When enabled on the model, `delete` becomes a timestamp write to the
//! configured column, issued against the inner stages; reads filter
//! deleted rows unless the call widened visibility. `force_delete`
//! bypasses the conversion and physically deletes.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::super::pipeline::{Behavior, CallContext, Next, TrashedVisibility};
use crate::error::Error;
use crate::record::{record_from, Record};

pub struct SoftDeletes;

pub(crate) fn is_deleted(record: &Record, column: &str) -> bool {
    record.get(column).map_or(false, |value| !value.is_null())
}

fn visible(record: &Record, column: &str, visibility: TrashedVisibility) -> bool {
    match visibility {
        TrashedVisibility::Exclude => !is_deleted(record, column),
        TrashedVisibility::With => true,
        TrashedVisibility::Only => is_deleted(record, column),
    }
}

#[async_trait]
impl Behavior for SoftDeletes {
    fn name(&self) -> &'static str {
        "soft-deletes"
    }

    async fn find(
        &self,
        ctx: &CallContext,
        id: Value,
        next: Next<'_>,
    ) -> Result<Option<Record>, Error> {
        let def = next.services().def.clone();
        let record = next.find(ctx, id).await?;
        if !def.soft_deletes_enabled() {
            return Ok(record);
        }
        Ok(record.filter(|r| visible(r, def.deleted_at_column(), ctx.trashed)))
    }

    async fn all(&self, ctx: &CallContext, next: Next<'_>) -> Result<Vec<Record>, Error> {
        let def = next.services().def.clone();
        let records = next.all(ctx).await?;
        if !def.soft_deletes_enabled() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| visible(r, def.deleted_at_column(), ctx.trashed))
            .collect())
    }

    async fn delete(&self, ctx: &CallContext, id: Value, next: Next<'_>) -> Result<(), Error> {
        let def = next.services().def.clone();
        if !def.soft_deletes_enabled() || ctx.force_delete {
            return next.delete(ctx, id).await;
        }
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let data = record_from([(def.deleted_at_column(), Value::String(timestamp))]);
        next.update(ctx, id, data).await
    }
}
