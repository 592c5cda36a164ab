// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Polymorphic inverse relation: the parent row names its target.
//!
//! The parent carries a discriminator column and a target-id column;
//! each discriminator value maps to a different target model, so batch
//! loading groups parents by type first and runs one membership query
//! per distinct type. Targets resolve through the morph registry built
//! at startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{fetch_one, fetch_records, RelationError, Relation};
use crate::connection::Filter;
use crate::error::Error;
use crate::orm::OrmCore;
use crate::record::{key_string, Record};

pub struct MorphTo {
    core: Arc<OrmCore>,
    name: String,
    morph_type: String,
    morph_id: String,
}

impl MorphTo {
    pub(crate) fn new(core: Arc<OrmCore>, name: &str, morph_type: String, morph_id: String) -> Self {
        Self {
            core,
            name: name.to_string(),
            morph_type,
            morph_id,
        }
    }

    fn target_for(&self, type_value: &str) -> Result<Arc<crate::model::ModelDef>, Error> {
        self.core
            .morph_target(type_value)
            .ok_or_else(|| {
                RelationError::UnknownMorphTarget {
                    type_value: type_value.to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl Relation for MorphTo {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_results(&self, parent: &Record) -> Result<Value, Error> {
        let type_value = parent
            .get(&self.morph_type)
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let target_id = parent.get(&self.morph_id).filter(|v| !v.is_null());

        let (Some(type_value), Some(target_id)) = (type_value, target_id) else {
            return Ok(Value::Null);
        };

        let def = self.target_for(&type_value)?;
        let conn = self.core.connection_for(&def)?;
        let filter = Filter::new().eq(def.primary_key(), target_id.clone());
        let row = fetch_one(&conn, def.table(), &filter).await?;
        Ok(row.map(Value::Object).unwrap_or(Value::Null))
    }

    async fn match_parents(&self, parents: &mut [Record]) -> Result<(), Error> {
        if parents.is_empty() {
            return Ok(());
        }

        // Group parents by their discriminator value first.
        let mut ids_by_type: HashMap<String, Vec<Value>> = HashMap::new();
        for parent in parents.iter() {
            let type_value = parent.get(&self.morph_type).and_then(|v| v.as_str());
            let target_id = parent.get(&self.morph_id).filter(|v| !v.is_null());
            if let (Some(type_value), Some(target_id)) = (type_value, target_id) {
                let ids = ids_by_type.entry(type_value.to_string()).or_default();
                if !ids.iter().any(|known| known == target_id) {
                    ids.push(target_id.clone());
                }
            }
        }

        // One batched query per distinct target type.
        let mut rows_by_type: HashMap<String, HashMap<String, Record>> = HashMap::new();
        for (type_value, ids) in ids_by_type {
            let def = self.target_for(&type_value)?;
            let conn = self.core.connection_for(&def)?;
            let filter = Filter::new().is_in(def.primary_key(), ids);
            let rows = fetch_records(&conn, def.table(), &filter).await?;

            let mut by_id = HashMap::new();
            for row in rows {
                if let Some(canonical) = row.get(def.primary_key()).and_then(key_string) {
                    by_id.insert(canonical, row);
                }
            }
            rows_by_type.insert(type_value, by_id);
        }

        for parent in parents.iter_mut() {
            let attached = {
                let type_value = parent.get(&self.morph_type).and_then(|v| v.as_str());
                let target_key = parent.get(&self.morph_id).and_then(key_string);
                match (type_value, target_key) {
                    (Some(type_value), Some(target_key)) => rows_by_type
                        .get(type_value)
                        .and_then(|by_id| by_id.get(&target_key))
                        .map(|row| Value::Object(row.clone()))
                        .unwrap_or(Value::Null),
                    _ => Value::Null,
                }
            };
            parent.insert(self.name.clone(), attached);
        }
        Ok(())
    }
}
