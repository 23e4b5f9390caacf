// ABOUTME: Redis key-value store with connection management, retries, and pipelined writes
// ABOUTME: Shares session lists and the revoked-token blacklist across server instances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisError};
use tokio::time::sleep;
use tracing::{info, warn};

use super::{KeyValueStore, RedisConnectionConfig, StoreConfig};
use crate::errors::{AppError, AppResult};

fn store_error(operation: &str, e: &RedisError) -> AppError {
    AppError::storage(format!("Redis {operation} failed: {e}"))
}

/// Redis-backed store
///
/// Uses `ConnectionManager` for automatic reconnection; clones share the
/// underlying multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or every connection attempt fails
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| AppError::config("Redis URL is required for Redis store backend"))?;
        let conn_config = &config.redis_connection;

        info!(
            "Connecting to Redis (timeout={}s, response_timeout={}s, retries={})",
            conn_config.connection_timeout_secs,
            conn_config.response_timeout_secs,
            conn_config.initial_connection_retries
        );

        let client = Client::open(redis_url.as_str())
            .map_err(|e| AppError::config(format!("Invalid Redis URL: {e}")))?;
        let manager = Self::connect_with_retry(&client, conn_config).await?;

        info!("Successfully connected to Redis");
        Ok(Self { manager })
    }

    /// Connect with exponential backoff
    async fn connect_with_retry(
        client: &Client,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries)
            .set_exponent_base(conn_config.retry_exponent_base)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let mut delay_ms = conn_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await
            {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {attempt} retries");
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {delay_ms}ms: {e}",
                            attempt + 1,
                            max_retries + 1,
                        );
                        sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(conn_config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::storage(format!(
            "Failed to connect to Redis after {} attempts: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(|e| store_error("GET", &e))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| store_error("SETEX", &e))
    }

    async fn set_ex_many(&self, entries: &[(String, String)], ttl: Duration) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let seconds = ttl.as_secs().max(1);
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            pipe.set_ex(key, value, seconds).ignore();
        }
        let mut conn = self.manager.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_error("pipelined SETEX", &e))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        conn.exists(key)
            .await
            .map_err(|e| store_error("EXISTS", &e))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| store_error("DEL", &e))
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let mut conn = self.manager.clone();
        let seconds: i64 = conn.ttl(key).await.map_err(|e| store_error("TTL", &e))?;
        // -2 missing key, -1 no expiry
        Ok((seconds >= 0).then(|| Duration::from_secs(seconds.unsigned_abs())))
    }

    async fn lrange_all(&self, key: &str) -> AppResult<Vec<String>> {
        let mut conn = self.manager.clone();
        conn.lrange(key, 0, -1)
            .await
            .map_err(|e| store_error("LRANGE", &e))
    }

    async fn lpop(&self, key: &str, count: usize) -> AppResult<Vec<String>> {
        let Some(count) = NonZeroUsize::new(count) else {
            return Ok(Vec::new());
        };
        let mut conn = self.manager.clone();
        let popped: Option<Vec<String>> = conn
            .lpop(key, Some(count))
            .await
            .map_err(|e| store_error("LPOP", &e))?;
        Ok(popped.unwrap_or_default())
    }

    async fn rpush(&self, key: &str, value: &str) -> AppResult<usize> {
        let mut conn = self.manager.clone();
        conn.rpush(key, value)
            .await
            .map_err(|e| store_error("RPUSH", &e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        conn.expire(key, seconds)
            .await
            .map_err(|e| store_error("EXPIRE", &e))
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| store_error("PING", &e))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
