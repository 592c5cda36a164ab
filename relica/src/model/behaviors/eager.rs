// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Eager-loading stage
//!
//! Attaches relation data to fetched records after the inner stages
//! return. Each first-level path segment resolves to one batched
//! `match_parents` call over the whole record set; for nested paths
//! (`"posts.comments"`) the freshly attached related records become the
//! parent set for the remaining segments. This stage sits outside the
//! query cache, so records served from cache are re-hydrated too.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::super::pipeline::{Behavior, CallContext, ModelServices, Next};
use super::super::ModelDef;
use crate::error::Error;
use crate::record::Record;
use crate::relations::{self, RelationError};

pub struct EagerLoading;

/// How a parent's attachment looked before it was detached for nested
/// loading, so it can be reattached in the same shape.
enum Shape {
    /// Single related object (`true`) or null/absent (`false`).
    One(bool),
    /// Array of related objects with this many elements.
    Many(usize),
    /// Non-object attachment left in place.
    Untouched,
}

/// Load every requested path over a record set.
pub(crate) async fn load_paths(
    sv: &ModelServices,
    paths: &[String],
    records: &mut Vec<Record>,
) -> Result<(), Error> {
    for path in paths {
        load_path(sv, sv.def.clone(), records, path).await?;
    }
    Ok(())
}

/// Resolve one dot-separated path against a parent set, recursing into
/// the related records for nested segments.
fn load_path<'a>(
    sv: &'a ModelServices,
    def: Arc<ModelDef>,
    records: &'a mut Vec<Record>,
    path: &'a str,
) -> Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>> {
    Box::pin(async move {
        if records.is_empty() {
            return Ok(());
        }
        let (segment, rest) = match path.split_once('.') {
            Some((segment, rest)) => (segment, Some(rest)),
            None => (path, None),
        };

        let relation_def = def.relation_def(segment).ok_or_else(|| RelationError::NotDefined {
            model: def.name().to_string(),
            relation: segment.to_string(),
        })?;
        let relation = relations::build(&sv.core, &def, segment)?;
        relation.match_parents(records).await?;

        let Some(rest) = rest else {
            return Ok(());
        };

        // Nested segments need a statically-known related model.
        let related_name =
            relation_def
                .related_model()
                .ok_or_else(|| RelationError::NestedUnderPolymorphic {
                    relation: segment.to_string(),
                })?;
        let related_def = sv.core.model_def(related_name).ok_or_else(|| {
            RelationError::UnknownRelatedModel {
                relation: segment.to_string(),
                model: related_name.to_string(),
            }
        })?;

        // Detach the related records into a flat parent set, remembering
        // each parent's attachment shape for reassembly.
        let mut shapes = Vec::with_capacity(records.len());
        let mut related: Vec<Record> = Vec::new();
        for record in records.iter_mut() {
            match record.remove(segment) {
                Some(Value::Array(items)) => {
                    let mut count = 0;
                    for item in items {
                        if let Value::Object(map) = item {
                            related.push(map);
                            count += 1;
                        }
                    }
                    shapes.push(Shape::Many(count));
                }
                Some(Value::Object(map)) => {
                    related.push(map);
                    shapes.push(Shape::One(true));
                }
                Some(Value::Null) | None => shapes.push(Shape::One(false)),
                Some(other) => {
                    record.insert(segment.to_string(), other);
                    shapes.push(Shape::Untouched);
                }
            }
        }

        load_path(sv, related_def, &mut related, rest).await?;

        // Reattach in the recorded shapes; the counts above guarantee
        // the iterator yields enough elements.
        let mut hydrated = related.into_iter();
        for (record, shape) in records.iter_mut().zip(shapes) {
            match shape {
                Shape::Many(count) => {
                    let items: Vec<Value> = hydrated
                        .by_ref()
                        .take(count)
                        .map(Value::Object)
                        .collect();
                    record.insert(segment.to_string(), Value::Array(items));
                }
                Shape::One(true) => {
                    let item = hydrated.next().map(Value::Object).unwrap_or(Value::Null);
                    record.insert(segment.to_string(), item);
                }
                Shape::One(false) => {
                    record.insert(segment.to_string(), Value::Null);
                }
                Shape::Untouched => {}
            }
        }
        Ok(())
    })
}

#[async_trait]
impl Behavior for EagerLoading {
    fn name(&self) -> &'static str {
        "eager-loading"
    }

    async fn find(
        &self,
        ctx: &CallContext,
        id: Value,
        next: Next<'_>,
    ) -> Result<Option<Record>, Error> {
        let sv = next.services();
        let record = next.find(ctx, id).await?;
        match record {
            Some(record) if !ctx.eager.is_empty() => {
                let mut records = vec![record];
                load_paths(sv, &ctx.eager, &mut records).await?;
                Ok(records.pop())
            }
            other => Ok(other),
        }
    }

    async fn all(&self, ctx: &CallContext, next: Next<'_>) -> Result<Vec<Record>, Error> {
        let sv = next.services();
        let mut records = next.all(ctx).await?;
        if !ctx.eager.is_empty() {
            load_paths(sv, &ctx.eager, &mut records).await?;
        }
        Ok(records)
    }
}
