// ABOUTME: Key-value store abstraction for session lists and the revoked-token blacklist
// ABOUTME: Pluggable backends (in-memory, Redis) selected from configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! # Key-Value Store
//!
//! The session concurrency limiter keeps one list per user/client pair and the
//! principal revocation service writes `jti:<value>` markers. Both only need a
//! small subset of Redis semantics, captured by [`KeyValueStore`].
//!
//! ```rust,no_run
//! use inhibitor::kv::{memory::InMemoryStore, KeyValueStore, StoreConfig};
//! use std::time::Duration;
//! # async fn example() -> Result<(), inhibitor::errors::AppError> {
//! let store = InMemoryStore::new(&StoreConfig::default());
//! store.rpush("user:1:web:tokens", "{}").await?;
//! store.expire("user:1:web:tokens", Duration::from_secs(60)).await?;
//! let entries = store.lrange_all("user:1:web:tokens").await?;
//! assert_eq!(entries.len(), 1);
//! # Ok(())
//! # }
//! ```

/// Backend selection
pub mod factory;
/// In-memory implementation
pub mod memory;
/// Redis implementation
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::CacheBackendConfig;
use crate::errors::AppResult;

pub use factory::KeyValueStoreFactory;

/// Subset of Redis commands used by the server
///
/// Values are UTF-8 strings. A key holds either a string or a list; list
/// operations on a string key fail with a storage error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `GET`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// `SETEX`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Many `SETEX` with the same TTL in a single round trip
    ///
    /// # Errors
    ///
    /// Returns an error if the batch fails
    async fn set_ex_many(&self, entries: &[(String, String)], ttl: Duration) -> AppResult<()>;

    /// `EXISTS`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// `DEL`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Remaining TTL, `None` when the key is missing or has no expiry
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>>;

    /// `LRANGE key 0 -1`
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-list value
    async fn lrange_all(&self, key: &str) -> AppResult<Vec<String>>;

    /// `LPOP key count`, oldest entries first
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-list value
    async fn lpop(&self, key: &str, count: usize) -> AppResult<Vec<String>>;

    /// `RPUSH`, returns the new list length
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-list value
    async fn rpush(&self, key: &str, value: &str) -> AppResult<usize>;

    /// `EXPIRE`, returns whether the key existed
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Backend liveness
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not answer
    async fn health_check(&self) -> AppResult<()>;

    /// Human-readable backend name
    fn backend_name(&self) -> &'static str;
}

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of keys held by the in-memory backend
    pub max_entries: usize,
    /// Redis URL, in-memory backend when absent
    pub redis_url: Option<String>,
    /// Interval of the in-memory expiry sweep
    pub cleanup_interval: Duration,
    /// Run the expiry sweep in the background
    pub enable_background_cleanup: bool,
    /// Redis connection tuning
    pub redis_connection: RedisConnectionConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            redis_url: None,
            cleanup_interval: Duration::from_secs(60),
            enable_background_cleanup: false,
            redis_connection: RedisConnectionConfig::default(),
        }
    }
}

impl From<&CacheBackendConfig> for StoreConfig {
    fn from(config: &CacheBackendConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            redis_url: config.redis_url.clone(),
            cleanup_interval: config.cleanup_interval,
            enable_background_cleanup: true,
            redis_connection: RedisConnectionConfig::default(),
        }
    }
}

/// Redis connection timeouts and retry policy
#[derive(Debug, Clone)]
pub struct RedisConnectionConfig {
    /// Connect timeout
    pub connection_timeout_secs: u64,
    /// Per-command response timeout
    pub response_timeout_secs: u64,
    /// Reconnection attempts of the connection manager
    pub reconnection_retries: usize,
    /// Backoff exponent base
    pub retry_exponent_base: u64,
    /// Backoff cap
    pub max_retry_delay_ms: u64,
    /// Attempts made before startup fails
    pub initial_connection_retries: u32,
    /// First backoff delay
    pub initial_retry_delay_ms: u64,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 5,
            response_timeout_secs: 3,
            reconnection_retries: 6,
            retry_exponent_base: 2,
            max_retry_delay_ms: 5_000,
            initial_connection_retries: 3,
            initial_retry_delay_ms: 250,
        }
    }
}
