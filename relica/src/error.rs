// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Top-level error type
//!
//! Configuration and connection-lookup failures are fatal at the point
//! of resolution; data-source errors propagate unmodified; relation
//! resolution failures indicate programming errors. Cache-tier errors
//! appear here only when the cache API is called directly — the model
//! layer swallows them.

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::connection::ConnectionError;
use crate::relations::RelationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Relation(#[from] RelationError),

    #[error("model '{0}' is not registered")]
    ModelNotRegistered(String),
}

pub type Result<T> = std::result::Result<T, Error>;
