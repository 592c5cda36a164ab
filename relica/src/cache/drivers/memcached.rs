// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Remote cache driver speaking the memcached text protocol
//!
//! A minimal client over a single TCP connection: `get`, `set`,
//! `delete`, `flush_all`. Values are stored as JSON. The server enforces
//! expiry itself (`exptime` is passed through on `set`), so expired
//! entries are invisible here by construction. The connection is opened
//! lazily and dropped on any protocol or I/O error; the next operation
//! reconnects.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::super::{CacheDriver, CacheError};

pub struct MemcachedCacheDriver {
    addr: String,
    stream: Mutex<Option<BufStream<TcpStream>>>,
}

impl MemcachedCacheDriver {
    /// `addr` is `host:port`, e.g. `"127.0.0.1:11211"`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: Mutex::new(None),
        }
    }

    async fn read_line(stream: &mut BufStream<TcpStream>) -> Result<String, CacheError> {
        let mut line = String::new();
        let n = stream.read_line(&mut line).await?;
        if n == 0 {
            return Err(CacheError::driver("memcached", "connection closed by server"));
        }
        Ok(line.trim_end().to_string())
    }

    async fn get_inner(
        stream: &mut BufStream<TcpStream>,
        key: &str,
    ) -> Result<Option<Value>, CacheError> {
        stream.write_all(format!("get {}\r\n", key).as_bytes()).await?;
        stream.flush().await?;

        let header = Self::read_line(stream).await?;
        if header == "END" {
            return Ok(None);
        }

        let bytes: usize = header
            .strip_prefix("VALUE ")
            .and_then(|rest| rest.split_whitespace().nth(2))
            .and_then(|len| len.parse().ok())
            .ok_or_else(|| {
                CacheError::driver("memcached", format!("unexpected response: {}", header))
            })?;

        // Data block plus trailing \r\n, then the END line.
        let mut buf = vec![0u8; bytes + 2];
        stream.read_exact(&mut buf).await?;
        let tail = Self::read_line(stream).await?;
        if tail != "END" {
            return Err(CacheError::driver(
                "memcached",
                format!("expected END, got: {}", tail),
            ));
        }

        let value = serde_json::from_slice(&buf[..bytes])?;
        Ok(Some(value))
    }

    async fn set_inner(
        stream: &mut BufStream<TcpStream>,
        key: &str,
        value: &Value,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_vec(value)?;
        stream
            .write_all(format!("set {} 0 {} {}\r\n", key, ttl_secs, payload.len()).as_bytes())
            .await?;
        stream.write_all(&payload).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;

        let reply = Self::read_line(stream).await?;
        if reply == "STORED" {
            Ok(())
        } else {
            Err(CacheError::driver(
                "memcached",
                format!("set not stored: {}", reply),
            ))
        }
    }

    async fn delete_inner(
        stream: &mut BufStream<TcpStream>,
        key: &str,
    ) -> Result<(), CacheError> {
        stream.write_all(format!("delete {}\r\n", key).as_bytes()).await?;
        stream.flush().await?;

        let reply = Self::read_line(stream).await?;
        match reply.as_str() {
            "DELETED" | "NOT_FOUND" => Ok(()),
            other => Err(CacheError::driver(
                "memcached",
                format!("delete failed: {}", other),
            )),
        }
    }

    async fn clear_inner(stream: &mut BufStream<TcpStream>) -> Result<(), CacheError> {
        stream.write_all(b"flush_all\r\n").await?;
        stream.flush().await?;

        let reply = Self::read_line(stream).await?;
        if reply == "OK" {
            Ok(())
        } else {
            Err(CacheError::driver(
                "memcached",
                format!("flush_all failed: {}", reply),
            ))
        }
    }
}

/// Run `op` on the guarded stream, connecting lazily and dropping the
/// connection on failure so the next call starts clean.
macro_rules! with_connection {
    ($self:expr, $stream:ident, $op:expr) => {{
        let mut guard = $self.stream.lock().await;
        if guard.is_none() {
            let connected = TcpStream::connect(&$self.addr).await.map(BufStream::new)?;
            *guard = Some(connected);
        }
        let $stream = guard.as_mut().expect("connection established above");
        let result = $op;
        if result.is_err() {
            *guard = None;
        }
        result
    }};
}

#[async_trait]
impl CacheDriver for MemcachedCacheDriver {
    fn name(&self) -> &'static str {
        "memcached"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        with_connection!(self, stream, Self::get_inner(stream, key).await)
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        with_connection!(self, stream, Self::set_inner(stream, key, value, ttl_secs).await)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        with_connection!(self, stream, Self::delete_inner(stream, key).await)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        with_connection!(self, stream, Self::clear_inner(stream).await)
    }
}
