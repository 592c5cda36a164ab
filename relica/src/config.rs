// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database and cache configuration
//!
//! Configuration is read once at startup. Connection settings map a
//! connection name to driver parameters; cache settings select which
//! cache tiers to wire up. There is no live reconfiguration.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors are fatal at the point of resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported driver: {name}. Valid options: mysql, pg, sqlite, mongo, memory")]
    UnsupportedDriver { name: String },

    #[error("connection '{0}' is not configured")]
    UnknownConnection(String),
}

/// Settings for a single named connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Driver name; must parse as a [`DriverKind`](crate::connection::DriverKind).
    pub driver: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// File path for embedded drivers.
    pub path: Option<String>,
    /// Connection URI for document stores.
    pub uri: Option<String>,
}

impl ConnectionSettings {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            path: None,
            uri: None,
        }
    }
}

/// Static mapping from connection name to driver parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Name of the connection used when a model does not pick one.
    pub default_connection: String,
    pub connections: HashMap<String, ConnectionSettings>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let mut connections = HashMap::new();
        connections.insert("memory".to_string(), ConnectionSettings::new("memory"));
        Self {
            default_connection: "memory".to_string(),
            connections,
        }
    }
}

impl DatabaseConfig {
    /// Read connection settings from the environment once.
    ///
    /// `DB_CONNECTION` selects the default; per-driver variables fill in
    /// credentials with development-friendly fallbacks.
    pub fn from_env() -> Self {
        let mut connections = HashMap::new();

        let mut mysql = ConnectionSettings::new("mysql");
        mysql.host = Some(env::var("DB_HOST").unwrap_or_else(|_| "localhost".into()));
        mysql.user = Some(env::var("DB_USER").unwrap_or_else(|_| "root".into()));
        mysql.password = Some(env::var("DB_PASSWORD").unwrap_or_default());
        mysql.database = Some(env::var("DB_NAME").unwrap_or_else(|_| "test_db".into()));
        connections.insert("mysql".to_string(), mysql);

        let mut pg = ConnectionSettings::new("pg");
        pg.host = Some(env::var("PG_HOST").unwrap_or_else(|_| "localhost".into()));
        pg.port = env::var("PG_PORT").ok().and_then(|p| p.parse().ok()).or(Some(5432));
        pg.user = Some(env::var("PG_USER").unwrap_or_else(|_| "postgres".into()));
        pg.password = Some(env::var("PG_PASSWORD").unwrap_or_default());
        pg.database = Some(env::var("PG_NAME").unwrap_or_else(|_| "test_db".into()));
        connections.insert("pg".to_string(), pg);

        let mut sqlite = ConnectionSettings::new("sqlite");
        sqlite.path = Some(env::var("SQLITE_PATH").unwrap_or_else(|_| "./data.sqlite".into()));
        connections.insert("sqlite".to_string(), sqlite);

        let mut mongo = ConnectionSettings::new("mongo");
        mongo.uri =
            Some(env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into()));
        mongo.database = Some(env::var("MONGO_DB").unwrap_or_else(|_| "relica_db".into()));
        connections.insert("mongo".to_string(), mongo);

        connections.insert("memory".to_string(), ConnectionSettings::new("memory"));

        Self {
            default_connection: env::var("DB_CONNECTION").unwrap_or_else(|_| "mysql".into()),
            connections,
        }
    }

    /// Check every configured driver name parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use crate::connection::DriverKind;

        for settings in self.connections.values() {
            settings.driver.parse::<DriverKind>()?;
        }
        if !self.connections.contains_key(&self.default_connection) {
            return Err(ConfigError::UnknownConnection(
                self.default_connection.clone(),
            ));
        }
        Ok(())
    }

    /// Resolve the driver kind for a named connection.
    pub fn driver(&self, name: &str) -> Result<crate::connection::DriverKind, ConfigError> {
        let settings = self
            .connections
            .get(name)
            .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))?;
        settings.driver.parse()
    }
}

/// Which cache tiers to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    /// Single in-process tier.
    Memory,
    /// Single file-backed tier.
    File,
    /// Remote tier falling back to file, then process memory.
    FallbackChain,
}

/// Cache wiring selected by deployment environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub mode: CacheMode,
    /// Directory for the file tier.
    pub dir: String,
    /// `host:port` of the remote cache service.
    pub memcached_addr: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            mode: CacheMode::Memory,
            dir: ".cache".to_string(),
            memcached_addr: "127.0.0.1:11211".to_string(),
        }
    }
}

impl CacheSettings {
    /// Select cache wiring from `APP_ENV`: development gets the in-process
    /// tier, staging the file tier, production the full fallback chain.
    pub fn from_env() -> Self {
        let env_name = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let dir = env::var("CACHE_DIR").unwrap_or_else(|_| ".cache".into());
        let host = env::var("MEMCACHED_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = env::var("MEMCACHED_PORT").unwrap_or_else(|_| "11211".into());

        let mode = match env_name.as_str() {
            "staging" => CacheMode::File,
            "production" => CacheMode::FallbackChain,
            _ => CacheMode::Memory,
        };
        log::debug!("cache settings: env={} mode={:?}", env_name, mode);

        Self {
            mode,
            dir,
            memcached_addr: format!("{}:{}", host, port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        DatabaseConfig::default().validate().unwrap();
    }

    #[test]
    fn test_unknown_driver_is_rejected() {
        let mut config = DatabaseConfig::default();
        config
            .connections
            .insert("bad".to_string(), ConnectionSettings::new("oracle"));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedDriver { .. }));
    }

    #[test]
    fn test_missing_default_connection_is_rejected() {
        let mut config = DatabaseConfig::default();
        config.default_connection = "nope".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownConnection(_)));
    }
}
