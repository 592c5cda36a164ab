// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! One-to-many relation: many related rows share one parent.
//!
//! Every parent receives the full group of rows whose foreign key
//! equals its local key value, in no guaranteed order; parents without
//! matches get an empty array, never null.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    all_or_empty, attach_grouped, collect_keys, fetch_records, group_by, related_parts, Relation,
};
use crate::connection::Filter;
use crate::error::Error;
use crate::orm::OrmCore;
use crate::record::Record;

pub struct HasMany {
    core: Arc<OrmCore>,
    name: String,
    related: String,
    foreign_key: String,
    local_key: String,
}

impl HasMany {
    pub(crate) fn new(
        core: Arc<OrmCore>,
        name: &str,
        related: String,
        foreign_key: String,
        local_key: String,
    ) -> Self {
        Self {
            core,
            name: name.to_string(),
            related,
            foreign_key,
            local_key,
        }
    }
}

#[async_trait]
impl Relation for HasMany {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_results(&self, parent: &Record) -> Result<Value, Error> {
        let Some(local) = parent.get(&self.local_key).filter(|v| !v.is_null()) else {
            return Ok(Value::Array(Vec::new()));
        };
        let (def, conn) = related_parts(&self.core, &self.name, &self.related)?;
        let filter = Filter::new().eq(&self.foreign_key, local.clone());
        let rows = fetch_records(&conn, def.table(), &filter).await?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
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
            let filter = Filter::new().is_in(&self.foreign_key, keys);
            fetch_records(&conn, def.table(), &filter).await?
        };
        let groups = group_by(rows, &self.foreign_key);
        attach_grouped(parents, &self.name, &self.local_key, &groups, all_or_empty);
        Ok(())
    }
}
