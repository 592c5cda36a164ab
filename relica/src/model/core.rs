// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Driver-agnostic CRUD core
//!
//! The innermost pipeline stage: issues the actual data-access calls
//! against the model's connection, dispatching on the handle family.
//! SQL text here is deliberately simple parametrized statements; the
//! document path maps onto collection operations. Data-source errors
//! propagate unmodified.

use serde_json::Value;

use super::pipeline::ModelServices;
use crate::connection::{ConnectionHandle, Filter};
use crate::error::Error;
use crate::record::Record;

pub(crate) async fn find(sv: &ModelServices, id: &Value) -> Result<Option<Record>, Error> {
    let table = sv.def.table();
    let pk = sv.def.primary_key();

    match &sv.conn {
        ConnectionHandle::Sql(sql) => {
            let stmt = format!("SELECT * FROM {} WHERE {} = ?", table, pk);
            let rows = sql.query(&stmt, &[id.clone()]).await?;
            Ok(rows.into_iter().next())
        }
        ConnectionHandle::Document(doc) => {
            let filter = Filter::new().eq(pk, id.clone());
            Ok(doc.find_one(table, &filter).await?)
        }
    }
}

pub(crate) async fn all(sv: &ModelServices) -> Result<Vec<Record>, Error> {
    let table = sv.def.table();

    match &sv.conn {
        ConnectionHandle::Sql(sql) => {
            let stmt = format!("SELECT * FROM {}", table);
            Ok(sql.query(&stmt, &[]).await?)
        }
        ConnectionHandle::Document(doc) => Ok(doc.find(table, &Filter::new()).await?),
    }
}

pub(crate) async fn create(sv: &ModelServices, data: Record) -> Result<Record, Error> {
    let table = sv.def.table();
    let pk = sv.def.primary_key();

    match &sv.conn {
        ConnectionHandle::Sql(sql) => {
            let columns: Vec<&str> = data.keys().map(String::as_str).collect();
            let placeholders = vec!["?"; columns.len()].join(", ");
            let stmt = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders
            );
            let params: Vec<Value> = data.values().cloned().collect();
            let result = sql.execute(&stmt, &params).await?;

            let mut record = data;
            if let Some(id) = result.last_insert_id {
                if !record.contains_key(pk) {
                    record.insert(pk.to_string(), id);
                }
            }
            Ok(record)
        }
        ConnectionHandle::Document(doc) => {
            let mut record = data.clone();
            let id = doc.insert_one(table, data).await?;
            if !record.contains_key(pk) {
                record.insert(pk.to_string(), id);
            }
            Ok(record)
        }
    }
}

pub(crate) async fn update(sv: &ModelServices, id: &Value, data: Record) -> Result<(), Error> {
    let table = sv.def.table();
    let pk = sv.def.primary_key();

    match &sv.conn {
        ConnectionHandle::Sql(sql) => {
            let set_clause: Vec<String> =
                data.keys().map(|column| format!("{} = ?", column)).collect();
            let stmt = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                table,
                set_clause.join(", "),
                pk
            );
            let mut params: Vec<Value> = data.values().cloned().collect();
            params.push(id.clone());
            sql.execute(&stmt, &params).await?;
            Ok(())
        }
        ConnectionHandle::Document(doc) => {
            let filter = Filter::new().eq(pk, id.clone());
            doc.update_one(table, &filter, data).await?;
            Ok(())
        }
    }
}

pub(crate) async fn delete(sv: &ModelServices, id: &Value) -> Result<(), Error> {
    let table = sv.def.table();
    let pk = sv.def.primary_key();

    match &sv.conn {
        ConnectionHandle::Sql(sql) => {
            let stmt = format!("DELETE FROM {} WHERE {} = ?", table, pk);
            sql.execute(&stmt, &[id.clone()]).await?;
            Ok(())
        }
        ConnectionHandle::Document(doc) => {
            let filter = Filter::new().eq(pk, id.clone());
            doc.delete_one(table, &filter).await?;
            Ok(())
        }
    }
}
