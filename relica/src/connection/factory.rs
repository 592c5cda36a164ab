// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lookup-by-name registry of open connection handles
//!
//! Handles are registered once at startup. Resolving a name that was
//! never registered is a fatal configuration-level error, surfaced
//! immediately to the caller.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{ConnectionError, ConnectionHandle};

#[derive(Default)]
pub struct ConnectionRegistry {
    handles: RwLock<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-open handle under a connection name.
    /// Re-registering a name replaces the previous handle.
    pub fn register(&self, name: impl Into<String>, handle: ConnectionHandle) {
        let name = name.into();
        log::debug!("registering connection '{}'", name);
        self.handles.write().insert(name, handle);
    }

    /// Resolve a connection by name.
    pub fn get(&self, name: &str) -> Result<ConnectionHandle, ConnectionError> {
        self.handles
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectionError::NotRegistered(name.to_string()))
    }

    /// Names of all registered connections.
    pub fn names(&self) -> Vec<String> {
        self.handles.read().keys().cloned().collect()
    }
}
