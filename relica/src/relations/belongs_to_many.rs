// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Many-to-many relation through a pivot table.
//!
//! Batch loading joins the related table to the pivot in one query (SQL)
//! or two membership-filtered fetches (document backends) and groups by
//! the pivot's parent-reference column. The pivot table is assumed to
//! live on the related model's connection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{all_or_empty, attach_grouped, collect_keys, related_parts, Relation};
use crate::connection::{ConnectionHandle, Filter};
use crate::error::Error;
use crate::orm::OrmCore;
use crate::record::{key_string, Record};

/// Synthetic column carrying the pivot's parent reference through the
/// join; stripped from rows before attachment.
const PIVOT_KEY: &str = "pivot_parent_key";

pub struct BelongsToMany {
    core: Arc<OrmCore>,
    name: String,
    related: String,
    pivot_table: String,
    pivot_local: String,
    pivot_related: String,
    local_key: String,
    related_key: String,
}

impl BelongsToMany {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        core: Arc<OrmCore>,
        name: &str,
        related: String,
        pivot_table: String,
        pivot_local: String,
        pivot_related: String,
        local_key: String,
        related_key: String,
    ) -> Self {
        Self {
            core,
            name: name.to_string(),
            related,
            pivot_table,
            pivot_local,
            pivot_related,
            local_key,
            related_key,
        }
    }

    fn join_sql(&self, related_table: &str, where_clause: &str) -> String {
        format!(
            "SELECT r.*, p.{} AS {} FROM {} AS r INNER JOIN {} AS p ON p.{} = r.{} WHERE {}",
            self.pivot_local,
            PIVOT_KEY,
            related_table,
            self.pivot_table,
            self.pivot_related,
            self.related_key,
            where_clause,
        )
    }

    /// Document-backend path: fetch matching pivot rows, then the
    /// related rows they reference, and stitch the groups in memory.
    async fn document_groups(
        &self,
        conn: &ConnectionHandle,
        related_table: &str,
        parent_keys: Vec<Value>,
    ) -> Result<HashMap<String, Vec<Record>>, Error> {
        let ConnectionHandle::Document(doc) = conn else {
            unreachable!("document_groups called with a SQL handle");
        };

        let pivot_filter = Filter::new().is_in(&self.pivot_local, parent_keys);
        let pivot_rows = doc.find(&self.pivot_table, &pivot_filter).await?;

        let mut related_ids = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for row in &pivot_rows {
            if let Some(id) = row.get(&self.pivot_related) {
                if let Some(canonical) = key_string(id) {
                    if seen.insert(canonical) {
                        related_ids.push(id.clone());
                    }
                }
            }
        }

        let related_rows = if related_ids.is_empty() {
            Vec::new()
        } else {
            let filter = Filter::new().is_in(&self.related_key, related_ids);
            doc.find(related_table, &filter).await?
        };

        let mut by_key: HashMap<String, Record> = HashMap::new();
        for row in related_rows {
            if let Some(canonical) = row.get(&self.related_key).and_then(key_string) {
                by_key.insert(canonical, row);
            }
        }

        let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
        for pivot in &pivot_rows {
            let parent = pivot.get(&self.pivot_local).and_then(key_string);
            let related = pivot.get(&self.pivot_related).and_then(key_string);
            if let (Some(parent), Some(related)) = (parent, related) {
                if let Some(row) = by_key.get(&related) {
                    groups.entry(parent).or_default().push(row.clone());
                }
            }
        }
        Ok(groups)
    }
}

#[async_trait]
impl Relation for BelongsToMany {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_results(&self, parent: &Record) -> Result<Value, Error> {
        let Some(local) = parent.get(&self.local_key).filter(|v| !v.is_null()) else {
            return Ok(Value::Array(Vec::new()));
        };
        let (def, conn) = related_parts(&self.core, &self.name, &self.related)?;

        let rows = match &conn {
            ConnectionHandle::Sql(sql) => {
                let stmt = self.join_sql(def.table(), &format!("p.{} = ?", self.pivot_local));
                let mut rows = sql.query(&stmt, &[local.clone()]).await?;
                for row in &mut rows {
                    row.remove(PIVOT_KEY);
                }
                rows
            }
            ConnectionHandle::Document(_) => {
                let groups = self
                    .document_groups(&conn, def.table(), vec![local.clone()])
                    .await?;
                key_string(local)
                    .and_then(|canonical| groups.get(&canonical).cloned())
                    .unwrap_or_default()
            }
        };
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }

    async fn match_parents(&self, parents: &mut [Record]) -> Result<(), Error> {
        if parents.is_empty() {
            return Ok(());
        }
        let (def, conn) = related_parts(&self.core, &self.name, &self.related)?;
        let parent_keys = collect_keys(parents, &self.local_key);

        let groups = if parent_keys.is_empty() {
            HashMap::new()
        } else {
            match &conn {
                ConnectionHandle::Sql(sql) => {
                    let placeholders = vec!["?"; parent_keys.len()].join(", ");
                    let stmt = self.join_sql(
                        def.table(),
                        &format!("p.{} IN ({})", self.pivot_local, placeholders),
                    );
                    let rows = sql.query(&stmt, &parent_keys).await?;
                    let mut groups = super::group_by(rows, PIVOT_KEY);
                    for group in groups.values_mut() {
                        for row in group {
                            row.remove(PIVOT_KEY);
                        }
                    }
                    groups
                }
                ConnectionHandle::Document(_) => {
                    self.document_groups(&conn, def.table(), parent_keys).await?
                }
            }
        };

        attach_grouped(parents, &self.name, &self.local_key, &groups, all_or_empty);
        Ok(())
    }
}
