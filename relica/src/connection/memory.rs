// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory document connection for development and testing
//!
//! Collections are plain vectors of records with an auto-increment id
//! sequence. Every operation bumps an atomic counter so tests can assert
//! call-count contracts (batched relation loading, cache short-circuits)
//! without instrumenting a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::{ConnectionError, DocumentConnection, Filter};
use crate::record::Record;

#[derive(Default)]
struct Table {
    rows: Vec<Record>,
    next_id: u64,
}

/// Snapshot of per-operation call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub find: u64,
    pub find_one: u64,
    pub insert: u64,
    pub update: u64,
    pub delete: u64,
}

impl OpCounts {
    /// Total row-returning operations.
    pub fn reads(&self) -> u64 {
        self.find + self.find_one
    }
}

#[derive(Default)]
pub struct MemoryConnection {
    tables: RwLock<HashMap<String, Table>>,
    finds: AtomicU64,
    find_ones: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current operation counts.
    pub fn op_counts(&self) -> OpCounts {
        OpCounts {
            find: self.finds.load(Ordering::Relaxed),
            find_one: self.find_ones.load(Ordering::Relaxed),
            insert: self.inserts.load(Ordering::Relaxed),
            update: self.updates.load(Ordering::Relaxed),
            delete: self.deletes.load(Ordering::Relaxed),
        }
    }

    /// Number of rows currently stored in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.tables
            .read()
            .get(collection)
            .map_or(0, |t| t.rows.len())
    }
}

#[async_trait]
impl DocumentConnection for MemoryConnection {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Record>, ConnectionError> {
        self.finds.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read();
        Ok(tables.get(collection).map_or_else(Vec::new, |table| {
            table
                .rows
                .iter()
                .filter(|row| filter.matches(row))
                .cloned()
                .collect()
        }))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, ConnectionError> {
        self.find_ones.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read();
        Ok(tables
            .get(collection)
            .and_then(|table| table.rows.iter().find(|row| filter.matches(row)).cloned()))
    }

    async fn insert_one(&self, collection: &str, doc: Record) -> Result<Value, ConnectionError> {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.write();
        let table = tables.entry(collection.to_string()).or_default();

        let mut doc = doc;
        let id = match doc.get("id") {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                table.next_id += 1;
                let id = Value::from(table.next_id);
                doc.insert("id".to_string(), id.clone());
                id
            }
        };
        table.rows.push(doc);
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Record>,
    ) -> Result<u64, ConnectionError> {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.write();
        let table = tables.entry(collection.to_string()).or_default();
        let count = docs.len() as u64;
        for mut doc in docs {
            if !doc.get("id").map_or(false, |id| !id.is_null()) {
                table.next_id += 1;
                doc.insert("id".to_string(), Value::from(table.next_id));
            }
            table.rows.push(doc);
        }
        Ok(count)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Record,
    ) -> Result<u64, ConnectionError> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(collection) else {
            return Ok(0);
        };
        if let Some(row) = table.rows.iter_mut().find(|row| filter.matches(row)) {
            for (key, value) in changes {
                row.insert(key, value);
            }
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<u64, ConnectionError> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(collection) else {
            return Ok(0);
        };
        if let Some(pos) = table.rows.iter().position(|row| filter.matches(row)) {
            table.rows.remove(pos);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<u64, ConnectionError> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(collection) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|row| !filter.matches(row));
        Ok((before - table.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record_from;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let conn = MemoryConnection::new();
        let id1 = conn
            .insert_one("users", record_from([("name", json!("ada"))]))
            .await
            .unwrap();
        let id2 = conn
            .insert_one("users", record_from([("name", json!("grace"))]))
            .await
            .unwrap();
        assert_eq!(id1, json!(1));
        assert_eq!(id2, json!(2));
        assert_eq!(conn.len("users"), 2);
    }

    #[tokio::test]
    async fn test_update_merges_and_counts_ops() {
        let conn = MemoryConnection::new();
        conn.insert_one("users", record_from([("name", json!("ada"))]))
            .await
            .unwrap();

        let n = conn
            .update_one(
                "users",
                &Filter::new().eq("id", json!(1)),
                record_from([("name", json!("lovelace")), ("age", json!(36))]),
            )
            .await
            .unwrap();
        assert_eq!(n, 1);

        let row = conn
            .find_one("users", &Filter::new().eq("id", json!(1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name"), Some(&json!("lovelace")));
        assert_eq!(row.get("age"), Some(&json!(36)));

        let counts = conn.op_counts();
        assert_eq!(counts.insert, 1);
        assert_eq!(counts.update, 1);
        assert_eq!(counts.find_one, 1);
    }

    #[tokio::test]
    async fn test_delete_many_with_membership_filter() {
        let conn = MemoryConnection::new();
        for name in ["a", "b", "c"] {
            conn.insert_one("tags", record_from([("name", json!(name))]))
                .await
                .unwrap();
        }
        let removed = conn
            .delete_many("tags", &Filter::new().is_in("id", vec![json!(1), json!(3)]))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(conn.len("tags"), 1);
    }
}
