// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relation descriptors and batch loading
//!
//! Each relation variant implements two operations: `get_results` fetches
//! related data for one already-loaded parent (lazy access), and
//! `match_parents` batch-fetches for a whole parent set in a single
//! membership-filtered query, then groups and attaches results by join
//! key. The batch path is what eager loading rides to avoid one query
//! per parent.
//!
//! Relation metadata is declared on the model definition; the attachment
//! name is always explicit. Descriptors are transient: built fresh per
//! call, holding no connection state of their own.

mod belongs_to;
mod belongs_to_many;
mod has_many;
mod has_one;
mod morph_many;
mod morph_one;
mod morph_to;
pub(crate) mod pivot;

pub use belongs_to::BelongsTo;
pub use belongs_to_many::BelongsToMany;
pub use has_many::HasMany;
pub use has_one::HasOne;
pub use morph_many::MorphMany;
pub use morph_one::MorphOne;
pub use morph_to::MorphTo;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::connection::{ConnectionHandle, Filter};
use crate::error::Error;
use crate::model::ModelDef;
use crate::orm::OrmCore;
use crate::record::{key_string, Record};

/// Relation resolution failures indicate programming errors and are
/// fatal, thrown immediately.
#[derive(Debug, Error)]
pub enum RelationError {
    #[error("relation '{relation}' is not defined on model '{model}'")]
    NotDefined { model: String, relation: String },

    #[error("relation '{relation}' targets unregistered model '{model}'")]
    UnknownRelatedModel { relation: String, model: String },

    #[error("no model registered for morph type '{type_value}'")]
    UnknownMorphTarget { type_value: String },

    #[error("relation '{relation}' cannot be nested under a polymorphic relation")]
    NestedUnderPolymorphic { relation: String },

    #[error("relation '{relation}' does not support pivot operations")]
    NotAPivotRelation { relation: String },
}

/// Declarative relation metadata stored on a model definition, keyed by
/// the explicit attachment name.
#[derive(Debug, Clone)]
pub enum RelationDef {
    HasOne {
        related: String,
        foreign_key: String,
        local_key: String,
    },
    HasMany {
        related: String,
        foreign_key: String,
        local_key: String,
    },
    BelongsTo {
        related: String,
        foreign_key: String,
        owner_key: String,
    },
    BelongsToMany {
        related: String,
        pivot_table: String,
        /// Pivot column referencing the parent.
        pivot_local: String,
        /// Pivot column referencing the related model.
        pivot_related: String,
        local_key: String,
        related_key: String,
    },
    MorphOne {
        related: String,
        /// Discriminator column on the related table.
        morph_type: String,
        /// Parent-reference column on the related table.
        morph_id: String,
        /// Discriminator value identifying this parent model.
        type_value: String,
        local_key: String,
    },
    MorphMany {
        related: String,
        morph_type: String,
        morph_id: String,
        type_value: String,
        local_key: String,
    },
    MorphTo {
        /// Discriminator column on the parent.
        morph_type: String,
        /// Target-id column on the parent.
        morph_id: String,
    },
}

impl RelationDef {
    pub fn has_one(related: &str, foreign_key: &str, local_key: &str) -> Self {
        RelationDef::HasOne {
            related: related.into(),
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
        }
    }

    pub fn has_many(related: &str, foreign_key: &str, local_key: &str) -> Self {
        RelationDef::HasMany {
            related: related.into(),
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
        }
    }

    pub fn belongs_to(related: &str, foreign_key: &str, owner_key: &str) -> Self {
        RelationDef::BelongsTo {
            related: related.into(),
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
        }
    }

    pub fn belongs_to_many(
        related: &str,
        pivot_table: &str,
        pivot_local: &str,
        pivot_related: &str,
    ) -> Self {
        RelationDef::BelongsToMany {
            related: related.into(),
            pivot_table: pivot_table.into(),
            pivot_local: pivot_local.into(),
            pivot_related: pivot_related.into(),
            local_key: "id".into(),
            related_key: "id".into(),
        }
    }

    pub fn morph_one(related: &str, morph_type: &str, morph_id: &str, type_value: &str) -> Self {
        RelationDef::MorphOne {
            related: related.into(),
            morph_type: morph_type.into(),
            morph_id: morph_id.into(),
            type_value: type_value.into(),
            local_key: "id".into(),
        }
    }

    pub fn morph_many(related: &str, morph_type: &str, morph_id: &str, type_value: &str) -> Self {
        RelationDef::MorphMany {
            related: related.into(),
            morph_type: morph_type.into(),
            morph_id: morph_id.into(),
            type_value: type_value.into(),
            local_key: "id".into(),
        }
    }

    pub fn morph_to(morph_type: &str, morph_id: &str) -> Self {
        RelationDef::MorphTo {
            morph_type: morph_type.into(),
            morph_id: morph_id.into(),
        }
    }

    /// Statically-known related model name, if any. Polymorphic targets
    /// vary per row and return `None`.
    pub fn related_model(&self) -> Option<&str> {
        match self {
            RelationDef::HasOne { related, .. }
            | RelationDef::HasMany { related, .. }
            | RelationDef::BelongsTo { related, .. }
            | RelationDef::BelongsToMany { related, .. }
            | RelationDef::MorphOne { related, .. }
            | RelationDef::MorphMany { related, .. } => Some(related),
            RelationDef::MorphTo { .. } => None,
        }
    }
}

/// A relation bound to a parent model, ready to fetch.
#[async_trait]
pub trait Relation: Send + Sync {
    /// Attachment name: the property related data is stored under.
    fn name(&self) -> &str;

    /// Fetch related data for a single parent record.
    async fn get_results(&self, parent: &Record) -> Result<Value, Error>;

    /// Batch-fetch related data for a parent set and attach each
    /// parent's slice under the relation name.
    async fn match_parents(&self, parents: &mut [Record]) -> Result<(), Error>;
}

/// Build the descriptor for a named relation of `def`.
pub(crate) fn build(
    core: &Arc<OrmCore>,
    def: &ModelDef,
    name: &str,
) -> Result<Box<dyn Relation>, Error> {
    let relation = def.relation_def(name).ok_or_else(|| RelationError::NotDefined {
        model: def.name().to_string(),
        relation: name.to_string(),
    })?;

    Ok(match relation {
        RelationDef::HasOne {
            related,
            foreign_key,
            local_key,
        } => Box::new(HasOne::new(core.clone(), name, related, foreign_key, local_key)),
        RelationDef::HasMany {
            related,
            foreign_key,
            local_key,
        } => Box::new(HasMany::new(core.clone(), name, related, foreign_key, local_key)),
        RelationDef::BelongsTo {
            related,
            foreign_key,
            owner_key,
        } => Box::new(BelongsTo::new(core.clone(), name, related, foreign_key, owner_key)),
        RelationDef::BelongsToMany {
            related,
            pivot_table,
            pivot_local,
            pivot_related,
            local_key,
            related_key,
        } => Box::new(BelongsToMany::new(
            core.clone(),
            name,
            related,
            pivot_table,
            pivot_local,
            pivot_related,
            local_key,
            related_key,
        )),
        RelationDef::MorphOne {
            related,
            morph_type,
            morph_id,
            type_value,
            local_key,
        } => Box::new(MorphOne::new(
            core.clone(),
            name,
            related,
            morph_type,
            morph_id,
            type_value,
            local_key,
        )),
        RelationDef::MorphMany {
            related,
            morph_type,
            morph_id,
            type_value,
            local_key,
        } => Box::new(MorphMany::new(
            core.clone(),
            name,
            related,
            morph_type,
            morph_id,
            type_value,
            local_key,
        )),
        RelationDef::MorphTo { morph_type, morph_id } => {
            Box::new(MorphTo::new(core.clone(), name, morph_type, morph_id))
        }
    })
}

/// Resolve a related model's definition and connection.
pub(crate) fn related_parts(
    core: &OrmCore,
    relation: &str,
    related: &str,
) -> Result<(Arc<ModelDef>, ConnectionHandle), Error> {
    let def = core
        .model_def(related)
        .ok_or_else(|| RelationError::UnknownRelatedModel {
            relation: relation.to_string(),
            model: related.to_string(),
        })?;
    let conn = core.connection_for(&def)?;
    Ok((def, conn))
}

/// Run a filtered select against either backend family.
pub(crate) async fn fetch_records(
    conn: &ConnectionHandle,
    table: &str,
    filter: &Filter,
) -> Result<Vec<Record>, Error> {
    match conn {
        ConnectionHandle::Sql(sql) => {
            let stmt = match filter.to_sql() {
                Some((where_sql, params)) => {
                    return Ok(sql
                        .query(&format!("SELECT * FROM {} WHERE {}", table, where_sql), &params)
                        .await?);
                }
                None => format!("SELECT * FROM {}", table),
            };
            Ok(sql.query(&stmt, &[]).await?)
        }
        ConnectionHandle::Document(doc) => Ok(doc.find(table, filter).await?),
    }
}

/// Single-row variant of [`fetch_records`].
pub(crate) async fn fetch_one(
    conn: &ConnectionHandle,
    table: &str,
    filter: &Filter,
) -> Result<Option<Record>, Error> {
    match conn {
        ConnectionHandle::Sql(sql) => {
            let rows = match filter.to_sql() {
                Some((where_sql, params)) => {
                    sql.query(
                        &format!("SELECT * FROM {} WHERE {} LIMIT 1", table, where_sql),
                        &params,
                    )
                    .await?
                }
                None => {
                    sql.query(&format!("SELECT * FROM {} LIMIT 1", table), &[])
                        .await?
                }
            };
            Ok(rows.into_iter().next())
        }
        ConnectionHandle::Document(doc) => Ok(doc.find_one(table, filter).await?),
    }
}

/// Distinct join-key values of a parent set, in first-seen order.
pub(crate) fn collect_keys(parents: &[Record], key: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for parent in parents {
        if let Some(value) = parent.get(key) {
            if let Some(canonical) = key_string(value) {
                if seen.insert(canonical) {
                    values.push(value.clone());
                }
            }
        }
    }
    values
}

/// Group rows by the canonical text form of a key column.
pub(crate) fn group_by(rows: Vec<Record>, key: &str) -> HashMap<String, Vec<Record>> {
    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for row in rows {
        if let Some(canonical) = row.get(key).and_then(key_string) {
            groups.entry(canonical).or_default().push(row);
        }
    }
    groups
}

/// Attach one value per parent, looked up by the parent's `key` column:
/// `make` turns the parent's group (possibly empty) into the attached
/// value.
pub(crate) fn attach_grouped<F>(
    parents: &mut [Record],
    name: &str,
    key: &str,
    groups: &HashMap<String, Vec<Record>>,
    make: F,
) where
    F: Fn(Option<&Vec<Record>>) -> Value,
{
    for parent in parents {
        let group = parent
            .get(key)
            .and_then(key_string)
            .and_then(|canonical| groups.get(&canonical));
        parent.insert(name.to_string(), make(group));
    }
}

/// First row of a group as an object, or null: the has-one/belongs-to
/// attachment shape.
pub(crate) fn first_or_null(group: Option<&Vec<Record>>) -> Value {
    group
        .and_then(|rows| rows.first())
        .map(|row| Value::Object(row.clone()))
        .unwrap_or(Value::Null)
}

/// Whole group as an array (empty, never null): the has-many shape.
pub(crate) fn all_or_empty(group: Option<&Vec<Record>>) -> Value {
    Value::Array(
        group
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default(),
    )
}
