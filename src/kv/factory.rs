// ABOUTME: Key-value store factory for configuration-based backend selection
// ABOUTME: Returns a shared trait object used by sessions and the blacklist
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use tracing::info;

use super::memory::InMemoryStore;
use super::redis::RedisStore;
use super::{KeyValueStore, StoreConfig};
use crate::errors::AppResult;

/// Builds the configured backend
pub struct KeyValueStoreFactory;

impl KeyValueStoreFactory {
    /// Redis when a URL is configured, in-memory otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if Redis is configured but unreachable
    pub async fn create(config: &StoreConfig) -> AppResult<Arc<dyn KeyValueStore>> {
        if config.redis_url.is_some() {
            let store = RedisStore::new(config).await?;
            return Ok(Arc::new(store));
        }

        info!(
            "Initializing in-memory key-value store (max entries: {})",
            config.max_entries
        );
        Ok(Arc::new(InMemoryStore::new(config)))
    }
}
