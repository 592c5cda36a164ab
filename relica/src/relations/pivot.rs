// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pivot table maintenance for many-to-many relations.

use serde_json::Value;

use crate::connection::{ConnectionHandle, Filter};
use crate::error::Error;
use crate::record::{record_from, Record};

/// Link a parent to each of `related_ids` in the pivot table.
pub(crate) async fn attach(
    conn: &ConnectionHandle,
    pivot_table: &str,
    pivot_local: &str,
    pivot_related: &str,
    parent_id: &Value,
    related_ids: &[Value],
) -> Result<(), Error> {
    match conn {
        ConnectionHandle::Sql(sql) => {
            let stmt = format!(
                "INSERT INTO {} ({}, {}) VALUES (?, ?)",
                pivot_table, pivot_local, pivot_related
            );
            for related_id in related_ids {
                sql.execute(&stmt, &[parent_id.clone(), related_id.clone()])
                    .await?;
            }
        }
        ConnectionHandle::Document(doc) => {
            let rows: Vec<Record> = related_ids
                .iter()
                .map(|related_id| {
                    record_from([
                        (pivot_local, parent_id.clone()),
                        (pivot_related, related_id.clone()),
                    ])
                })
                .collect();
            if !rows.is_empty() {
                doc.insert_many(pivot_table, rows).await?;
            }
        }
    }
    Ok(())
}

/// Remove every pivot link of a parent.
pub(crate) async fn detach(
    conn: &ConnectionHandle,
    pivot_table: &str,
    pivot_local: &str,
    parent_id: &Value,
) -> Result<(), Error> {
    match conn {
        ConnectionHandle::Sql(sql) => {
            let stmt = format!("DELETE FROM {} WHERE {} = ?", pivot_table, pivot_local);
            sql.execute(&stmt, &[parent_id.clone()]).await?;
        }
        ConnectionHandle::Document(doc) => {
            let filter = Filter::new().eq(pivot_local, parent_id.clone());
            doc.delete_many(pivot_table, &filter).await?;
        }
    }
    Ok(())
}

/// Replace a parent's pivot links with exactly `related_ids`.
pub(crate) async fn sync(
    conn: &ConnectionHandle,
    pivot_table: &str,
    pivot_local: &str,
    pivot_related: &str,
    parent_id: &Value,
    related_ids: &[Value],
) -> Result<(), Error> {
    detach(conn, pivot_table, pivot_local, parent_id).await?;
    attach(conn, pivot_table, pivot_local, pivot_related, parent_id, related_ids).await
}
