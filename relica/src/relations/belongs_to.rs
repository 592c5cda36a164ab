// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Inverse relation: the parent carries the foreign key, the related
//! row is looked up by its own key (typically the primary key).

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

pub struct BelongsTo {
    core: Arc<OrmCore>,
    name: String,
    related: String,
    /// Column on the parent referencing the related row.
    foreign_key: String,
    /// Column on the related row being referenced.
    owner_key: String,
}

impl BelongsTo {
    pub(crate) fn new(
        core: Arc<OrmCore>,
        name: &str,
        related: String,
        foreign_key: String,
        owner_key: String,
    ) -> Self {
        Self {
            core,
            name: name.to_string(),
            related,
            foreign_key,
            owner_key,
        }
    }
}

#[async_trait]
impl Relation for BelongsTo {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_results(&self, parent: &Record) -> Result<Value, Error> {
        let Some(reference) = parent.get(&self.foreign_key).filter(|v| !v.is_null()) else {
            return Ok(Value::Null);
        };
        let (def, conn) = related_parts(&self.core, &self.name, &self.related)?;
        let filter = Filter::new().eq(&self.owner_key, reference.clone());
        let row = fetch_one(&conn, def.table(), &filter).await?;
        Ok(row.map(Value::Object).unwrap_or(Value::Null))
    }

    async fn match_parents(&self, parents: &mut [Record]) -> Result<(), Error> {
        if parents.is_empty() {
            return Ok(());
        }
        let (def, conn) = related_parts(&self.core, &self.name, &self.related)?;
        let keys = collect_keys(parents, &self.foreign_key);
        let rows = if keys.is_empty() {
            Vec::new()
        } else {
            let filter = Filter::new().is_in(&self.owner_key, keys);
            fetch_records(&conn, def.table(), &filter).await?
        };
        let groups = group_by(rows, &self.owner_key);
        attach_grouped(parents, &self.name, &self.foreign_key, &groups, first_or_null);
        Ok(())
    }
}
