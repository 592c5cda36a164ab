// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Polymorphic one-to-one relation.
//!
//! Like has-one, with an additional discriminator column on the related
//! table: only rows whose type column equals this parent model's
//! declared type value are considered.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    attach_grouped, collect_keys, fetch_one, fetch_records, first_or_null, group_by,
    related_parts, Relation,
};
use crate::connection::Filter;
use crate::error::Error;
use crate::orm::OrmCore;
use crate::record::Record;

pub struct MorphOne {
    core: Arc<OrmCore>,
    name: String,
    related: String,
    morph_type: String,
    morph_id: String,
    type_value: String,
    local_key: String,
}

impl MorphOne {
    pub(crate) fn new(
        core: Arc<OrmCore>,
        name: &str,
        related: String,
        morph_type: String,
        morph_id: String,
        type_value: String,
        local_key: String,
    ) -> Self {
        Self {
            core,
            name: name.to_string(),
            related,
            morph_type,
            morph_id,
            type_value,
            local_key,
        }
    }
}

#[async_trait]
impl Relation for MorphOne {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_results(&self, parent: &Record) -> Result<Value, Error> {
        let Some(local) = parent.get(&self.local_key).filter(|v| !v.is_null()) else {
            return Ok(Value::Null);
        };
        let (def, conn) = related_parts(&self.core, &self.name, &self.related)?;
        let filter = Filter::new()
            .eq(&self.morph_id, local.clone())
            .eq(&self.morph_type, Value::String(self.type_value.clone()));
        let row = fetch_one(&conn, def.table(), &filter).await?;
        Ok(row.map(Value::Object).unwrap_or(Value::Null))
    }

    async fn match_parents(&self, parents: &mut [Record]) -> Result<(), Error> {
        if parents.is_empty() {
            return Ok(());
        }
        let (def, conn) = related_parts(&self.core, &self.name, &self.related)?;
        let keys = collect_keys(parents, &self.local_key);
        let rows = if keys.is_empty() {
            Vec::new()
        } else {
            let filter = Filter::new()
                .is_in(&self.morph_id, keys)
                .eq(&self.morph_type, Value::String(self.type_value.clone()));
            fetch_records(&conn, def.table(), &filter).await?
        };
        let groups = group_by(rows, &self.morph_id);
        attach_grouped(parents, &self.name, &self.local_key, &groups, first_or_null);
        Ok(())
    }
}
