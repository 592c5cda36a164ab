// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Global scope stage
//!
//! Named predicates over result sets, applied to every read. A scope
//! receives the records that survived the scopes before it and returns
//! the filtered set.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use super::super::pipeline::{Behavior, CallContext, Next};
use crate::error::Error;
use crate::record::Record;

pub type ScopeFn = Arc<dyn Fn(Vec<Record>) -> Vec<Record> + Send + Sync>;

/// Ordered, named scope table; add and remove at any time.
#[derive(Default)]
pub struct ScopeRegistry {
    scopes: RwLock<Vec<(String, ScopeFn)>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a global scope. Re-adding a name replaces the previous scope
    /// in place.
    pub fn add<F>(&self, name: impl Into<String>, scope: F)
    where
        F: Fn(Vec<Record>) -> Vec<Record> + Send + Sync + 'static,
    {
        let name = name.into();
        let scope: ScopeFn = Arc::new(scope);
        let mut scopes = self.scopes.write();
        if let Some(existing) = scopes.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = scope;
        } else {
            scopes.push((name, scope));
        }
    }

    pub fn remove(&self, name: &str) {
        self.scopes.write().retain(|(n, _)| n != name);
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.read().is_empty()
    }

    /// Run every scope over the record set, in registration order.
    pub(crate) fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let scopes: Vec<ScopeFn> = self
            .scopes
            .read()
            .iter()
            .map(|(_, scope)| scope.clone())
            .collect();
        scopes.into_iter().fold(records, |acc, scope| scope(acc))
    }
}

pub struct Scopes;

#[async_trait]
impl Behavior for Scopes {
    fn name(&self) -> &'static str {
        "scopes"
    }

    async fn find(
        &self,
        ctx: &CallContext,
        id: Value,
        next: Next<'_>,
    ) -> Result<Option<Record>, Error> {
        let def = next.services().def.clone();
        let record = next.find(ctx, id).await?;
        match record {
            Some(record) if !def.scopes().is_empty() => {
                Ok(def.scopes().apply(vec![record]).into_iter().next())
            }
            other => Ok(other),
        }
    }

    async fn all(&self, ctx: &CallContext, next: Next<'_>) -> Result<Vec<Record>, Error> {
        let def = next.services().def.clone();
        let records = next.all(ctx).await?;
        if def.scopes().is_empty() {
            Ok(records)
        } else {
            Ok(def.scopes().apply(records))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record_from;
    use serde_json::json;

    #[test]
    fn test_scopes_apply_in_registration_order() {
        let registry = ScopeRegistry::new();
        registry.add("active", |records| {
            records
                .into_iter()
                .filter(|r| r.get("active") == Some(&json!(true)))
                .collect()
        });
        registry.add("adults", |records| {
            records
                .into_iter()
                .filter(|r| r.get("age").and_then(Value::as_i64).unwrap_or(0) >= 18)
                .collect()
        });

        let records = vec![
            record_from([("active", json!(true)), ("age", json!(30))]),
            record_from([("active", json!(false)), ("age", json!(40))]),
            record_from([("active", json!(true)), ("age", json!(12))]),
        ];
        let filtered = registry.apply(records);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get("age"), Some(&json!(30)));
    }

    #[test]
    fn test_remove_and_replace() {
        let registry = ScopeRegistry::new();
        registry.add("none", |_| Vec::new());
        assert!(registry.apply(vec![record_from([("a", json!(1))])]).is_empty());

        registry.add("none", |records| records);
        assert_eq!(registry.apply(vec![record_from([("a", json!(1))])]).len(), 1);

        registry.remove("none");
        assert!(registry.is_empty());
    }
}
