// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection collaborator contract
//!
//! The ORM does not open connections itself. It receives already-open,
//! driver-specific handles through a lookup-by-name registry and treats
//! them as opaque: SQL backends expose parametrized query execution,
//! document backends expose collection operations. Everything else about
//! a backend (pooling, transactions, dialects) lives outside this crate.

mod factory;
mod memory;

pub use factory::ConnectionRegistry;
pub use memory::{MemoryConnection, OpCounts};

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;
use crate::record::{values_equal, Record};

/// Supported backend driver families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverKind {
    MySql,
    Postgres,
    Sqlite,
    Mongo,
    /// In-process document backend for development and testing.
    Memory,
}

impl DriverKind {
    /// Whether this driver speaks SQL (as opposed to collections).
    pub fn is_sql(&self) -> bool {
        matches!(self, DriverKind::MySql | DriverKind::Postgres | DriverKind::Sqlite)
    }
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(DriverKind::MySql),
            "pg" | "postgres" => Ok(DriverKind::Postgres),
            "sqlite" => Ok(DriverKind::Sqlite),
            "mongo" => Ok(DriverKind::Mongo),
            "memory" => Ok(DriverKind::Memory),
            _ => Err(ConfigError::UnsupportedDriver { name: s.to_string() }),
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DriverKind::MySql => "mysql",
            DriverKind::Postgres => "pg",
            DriverKind::Sqlite => "sqlite",
            DriverKind::Mongo => "mongo",
            DriverKind::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Error type for connection lookup and data-source operations.
///
/// Data-source errors are propagated unmodified to the caller; no layer
/// of the model pipeline catches them.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection '{0}' is not registered")]
    NotRegistered(String),

    #[error("{op} failed on '{table}': {message}")]
    Query {
        op: &'static str,
        table: String,
        message: String,
    },
}

impl ConnectionError {
    pub fn query(op: &'static str, table: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectionError::Query {
            op,
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Result of a mutating SQL statement.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Auto-generated id of the inserted row, when the backend reports one.
    pub last_insert_id: Option<Value>,
}

/// A parametrized SQL backend.
#[async_trait]
pub trait SqlConnection: Send + Sync {
    /// Run a row-returning statement.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, ConnectionError>;

    /// Run a mutating statement.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult, ConnectionError>;
}

/// A collection-oriented document backend.
#[async_trait]
pub trait DocumentConnection: Send + Sync {
    async fn find(&self, collection: &str, filter: &Filter)
        -> Result<Vec<Record>, ConnectionError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, ConnectionError>;

    /// Insert one document, returning its id.
    async fn insert_one(&self, collection: &str, doc: Record) -> Result<Value, ConnectionError>;

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Record>,
    ) -> Result<u64, ConnectionError>;

    /// Merge `changes` into the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Record,
    ) -> Result<u64, ConnectionError>;

    async fn delete_one(&self, collection: &str, filter: &Filter)
        -> Result<u64, ConnectionError>;

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<u64, ConnectionError>;
}

/// An open connection handle, dispatched on by the CRUD core and the
/// relation descriptors.
#[derive(Clone)]
pub enum ConnectionHandle {
    Sql(Arc<dyn SqlConnection>),
    Document(Arc<dyn DocumentConnection>),
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionHandle::Sql(_) => write!(f, "ConnectionHandle::Sql"),
            ConnectionHandle::Document(_) => write!(f, "ConnectionHandle::Document"),
        }
    }
}

/// A conjunction of equality and membership clauses.
///
/// This is the whole filter language the ORM needs: primary-key lookups
/// and the IN-style membership filters used by relation batch loading.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
enum Clause {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.clauses.push(Clause::Eq(field.into(), value));
        self
    }

    pub fn is_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.clauses.push(Clause::In(field.into(), values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether a record satisfies every clause.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, value) => {
                record.get(field).map_or(value.is_null(), |v| values_equal(v, value))
            }
            Clause::In(field, values) => record
                .get(field)
                .map_or(false, |v| values.iter().any(|candidate| values_equal(v, candidate))),
        })
    }

    /// Render as a SQL WHERE clause with `?` placeholders.
    ///
    /// Returns `None` when the filter is empty (no WHERE needed).
    pub fn to_sql(&self) -> Option<(String, Vec<Value>)> {
        if self.clauses.is_empty() {
            return None;
        }
        let mut fragments = Vec::with_capacity(self.clauses.len());
        let mut params = Vec::new();
        for clause in &self.clauses {
            match clause {
                Clause::Eq(field, value) => {
                    fragments.push(format!("{} = ?", field));
                    params.push(value.clone());
                }
                Clause::In(field, values) => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    fragments.push(format!("{} IN ({})", field, placeholders));
                    params.extend(values.iter().cloned());
                }
            }
        }
        Some((fragments.join(" AND "), params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_driver_kind_parsing() {
        assert_eq!("mysql".parse::<DriverKind>().unwrap(), DriverKind::MySql);
        assert_eq!("pg".parse::<DriverKind>().unwrap(), DriverKind::Postgres);
        assert_eq!("postgres".parse::<DriverKind>().unwrap(), DriverKind::Postgres);
        assert_eq!("MEMORY".parse::<DriverKind>().unwrap(), DriverKind::Memory);
        assert!("oracle".parse::<DriverKind>().is_err());
    }

    #[test]
    fn test_filter_matching() {
        let record = crate::record::record_from([
            ("id", json!(1)),
            ("user_id", json!(7)),
            ("kind", json!("post")),
        ]);

        assert!(Filter::new().matches(&record));
        assert!(Filter::new().eq("user_id", json!(7)).matches(&record));
        assert!(!Filter::new().eq("user_id", json!(8)).matches(&record));
        assert!(Filter::new()
            .is_in("id", vec![json!(1), json!(2)])
            .eq("kind", json!("post"))
            .matches(&record));
        assert!(!Filter::new().is_in("id", vec![json!(3)]).matches(&record));
    }

    #[test]
    fn test_filter_null_semantics() {
        let record = crate::record::record_from([("deleted_at", Value::Null)]);
        // An absent field matches an explicit null equality clause.
        assert!(Filter::new().eq("deleted_at", Value::Null).matches(&record));
        assert!(Filter::new().eq("missing", Value::Null).matches(&record));
    }

    #[test]
    fn test_filter_to_sql() {
        let (where_clause, params) = Filter::new()
            .eq("user_id", json!(7))
            .is_in("id", vec![json!(1), json!(2)])
            .to_sql()
            .unwrap();
        assert_eq!(where_clause, "user_id = ? AND id IN (?, ?)");
        assert_eq!(params, vec![json!(7), json!(1), json!(2)]);
        assert!(Filter::new().to_sql().is_none());
    }
}
