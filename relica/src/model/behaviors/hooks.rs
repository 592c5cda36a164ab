// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lifecycle hook stage
//!
//! Fires creating/created, updating/updated, deleting/deleted events
//! around the mutating operations. Listeners run in registration order
//! and are awaited; they observe the operation's inputs and, for
//! `created`, the record produced by the inner stages.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::super::pipeline::{Behavior, CallContext, Next};
use crate::error::Error;
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

#[derive(Debug, Clone)]
pub enum HookPayload {
    Creating { data: Record },
    Created { record: Record },
    Updating { id: Value, data: Record },
    Updated { id: Value, data: Record },
    Deleting { id: Value },
    Deleted { id: Value },
}

pub type HookFn =
    Arc<dyn Fn(HookPayload) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Per-model listener table, internally synchronized so listeners can
/// be registered after the model definition is shared.
#[derive(Default)]
pub struct HookRegistry {
    listeners: Mutex<HashMap<HookEvent, Vec<HookFn>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a lifecycle event.
    pub fn on<F, Fut>(&self, event: HookEvent, listener: F)
    where
        F: Fn(HookPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let wrapped: HookFn = Arc::new(move |payload| Box::pin(listener(payload)));
        self.listeners.lock().entry(event).or_default().push(wrapped);
    }

    pub fn has_listeners(&self, event: HookEvent) -> bool {
        self.listeners
            .lock()
            .get(&event)
            .map_or(false, |list| !list.is_empty())
    }

    /// Fire an event; listeners are awaited outside the lock.
    pub(crate) async fn fire(&self, event: HookEvent, payload: HookPayload) {
        let listeners: Vec<HookFn> = self
            .listeners
            .lock()
            .get(&event)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener(payload.clone()).await;
        }
    }
}

pub struct Hooks;

#[async_trait]
impl Behavior for Hooks {
    fn name(&self) -> &'static str {
        "hooks"
    }

    async fn create(
        &self,
        ctx: &CallContext,
        data: Record,
        next: Next<'_>,
    ) -> Result<Record, Error> {
        let hooks = next.services().def.hooks();
        hooks
            .fire(HookEvent::Creating, HookPayload::Creating { data: data.clone() })
            .await;
        let record = next.create(ctx, data).await?;
        hooks
            .fire(
                HookEvent::Created,
                HookPayload::Created {
                    record: record.clone(),
                },
            )
            .await;
        Ok(record)
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: Value,
        data: Record,
        next: Next<'_>,
    ) -> Result<(), Error> {
        let hooks = next.services().def.hooks();
        hooks
            .fire(
                HookEvent::Updating,
                HookPayload::Updating {
                    id: id.clone(),
                    data: data.clone(),
                },
            )
            .await;
        next.update(ctx, id.clone(), data.clone()).await?;
        hooks
            .fire(HookEvent::Updated, HookPayload::Updated { id, data })
            .await;
        Ok(())
    }

    async fn delete(&self, ctx: &CallContext, id: Value, next: Next<'_>) -> Result<(), Error> {
        let hooks = next.services().def.hooks();
        hooks
            .fire(HookEvent::Deleting, HookPayload::Deleting { id: id.clone() })
            .await;
        next.delete(ctx, id.clone()).await?;
        hooks
            .fire(HookEvent::Deleted, HookPayload::Deleted { id })
            .await;
        Ok(())
    }
}
