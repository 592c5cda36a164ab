// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! File-backed cache driver
//!
//! One JSON file per key under a cache directory. Keys are hex-encoded
//! into file names, so arbitrary key characters are safe. Entries carry
//! their own absolute expiry and survive process restarts; expired files
//! are unlinked when touched.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::super::{CacheDriver, CacheEntry, CacheError};

const FILE_SUFFIX: &str = ".json";

pub struct FileCacheDriver {
    dir: PathBuf,
}

impl FileCacheDriver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}", hex::encode(key), FILE_SUFFIX))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CacheDriver for FileCacheDriver {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.file_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                // Corrupt entry: drop it and treat as a miss.
                log::warn!("discarding corrupt cache file {}: {}", path.display(), err);
                let _ = tokio::fs::remove_file(&path).await;
                return Ok(None);
            }
        };

        if entry.is_expired() {
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = CacheEntry::new(value.clone(), ttl_secs);
        let raw = serde_json::to_vec(&entry)?;
        tokio::fs::write(self.file_path(key), raw).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.file_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let _ = tokio::fs::remove_file(&path).await;
            }
        }
        Ok(())
    }
}
