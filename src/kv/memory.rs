// ABOUTME: In-memory key-value store with TTL support and list values, recency-ordered by an LRU map
// ABOUTME: Live entries are never evicted: a full store drops expired keys first, then grows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreConfig};
use crate::errors::{AppError, AppResult};

type Store = Arc<RwLock<LruCache<String, Entry>>>;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|at| at.checked_duration_since(Instant::now()))
    }
}

fn wrong_type(key: &str) -> AppError {
    AppError::storage(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

/// In-memory store with a soft capacity and background cleanup
///
/// `max_entries` sizes the map, but an entry is only ever removed once its TTL
/// has passed or it is deleted: revoked token ids and session lists must stay
/// visible for their full lifetime. Inserting into a full map first sweeps
/// expired entries and otherwise doubles the capacity.
///
/// The cleanup task shares the `Arc<RwLock<LruCache>>` and is stopped when the
/// last clone is dropped.
#[derive(Clone)]
pub struct InMemoryStore {
    store: Store,
    shutdown_tx: Option<Arc<mpsc::Sender<()>>>,
}

impl InMemoryStore {
    /// Capacity used when the configuration asks for zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    const GROWTH_FACTOR: NonZeroUsize = match NonZeroUsize::new(2) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create the store, spawning the cleanup task when enabled
    ///
    /// Must be called inside a Tokio runtime when background cleanup is enabled.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        let store: Store = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = if config.enable_background_cleanup {
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
            let store_clone = Arc::clone(&store);
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut ticker = interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            Self::cleanup_expired(&store_clone).await;
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("Key-value cleanup task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self { store, shutdown_tx }
    }

    /// Remove all expired entries
    async fn cleanup_expired(store: &Store) {
        let removed = Self::purge_expired(&mut *store.write().await);
        if removed > 0 {
            debug!("Cleaned up {removed} expired key-value entries");
        }
    }

    fn purge_expired(guard: &mut LruCache<String, Entry>) -> usize {
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, v)| v.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            guard.pop(key);
        }
        expired.len()
    }

    /// Insert without ever pushing out a live entry
    fn insert(guard: &mut LruCache<String, Entry>, key: String, entry: Entry) {
        if !guard.contains(&key) && guard.len() >= guard.cap().get() {
            Self::purge_expired(guard);
            if guard.len() >= guard.cap().get() {
                let grown = guard.cap().saturating_mul(Self::GROWTH_FACTOR);
                warn!(
                    entries = guard.len(),
                    capacity = grown.get(),
                    "In-memory key-value store is full of live entries; growing capacity"
                );
                guard.resize(grown);
            }
        }
        guard.put(key, entry);
    }

    /// Live entry for a key, evicting it first if expired
    fn live<'a>(guard: &'a mut LruCache<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        if guard.peek(key).is_some_and(Entry::is_expired) {
            guard.pop(key);
            return None;
        }
        guard.get_mut(key)
    }
}

impl Drop for InMemoryStore {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Only the last clone holds the final sender reference
            if Arc::strong_count(&tx) == 1 {
                let _ = tx.try_send(());
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut guard = self.store.write().await;
        match Self::live(&mut guard, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        Self::insert(
            &mut *self.store.write().await,
            key.to_owned(),
            Entry {
                value: Value::Text(value.to_owned()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_ex_many(&self, entries: &[(String, String)], ttl: Duration) -> AppResult<()> {
        let expires_at = Some(Instant::now() + ttl);
        let mut guard = self.store.write().await;
        for (key, value) in entries {
            Self::insert(
                &mut guard,
                key.clone(),
                Entry {
                    value: Value::Text(value.clone()),
                    expires_at,
                },
            );
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut guard = self.store.write().await;
        Ok(Self::live(&mut guard, key).is_some())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.store.write().await.pop(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let mut guard = self.store.write().await;
        Ok(Self::live(&mut guard, key).and_then(|entry| entry.remaining_ttl()))
    }

    async fn lrange_all(&self, key: &str) -> AppResult<Vec<String>> {
        let mut guard = self.store.write().await;
        match Self::live(&mut guard, key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(items),
                ..
            }) => Ok(items.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn lpop(&self, key: &str, count: usize) -> AppResult<Vec<String>> {
        let mut guard = self.store.write().await;
        let popped = match Self::live(&mut guard, key) {
            None => return Ok(Vec::new()),
            Some(Entry {
                value: Value::List(items),
                ..
            }) => {
                let take = count.min(items.len());
                items.drain(..take).collect::<Vec<_>>()
            }
            Some(_) => return Err(wrong_type(key)),
        };
        // Redis deletes lists that become empty
        if guard
            .peek(key)
            .is_some_and(|e| matches!(&e.value, Value::List(items) if items.is_empty()))
        {
            guard.pop(key);
        }
        Ok(popped)
    }

    async fn rpush(&self, key: &str, value: &str) -> AppResult<usize> {
        let mut guard = self.store.write().await;
        if let Some(entry) = Self::live(&mut guard, key) {
            return match &mut entry.value {
                Value::List(items) => {
                    items.push_back(value.to_owned());
                    Ok(items.len())
                }
                Value::Text(_) => Err(wrong_type(key)),
            };
        }
        Self::insert(
            &mut guard,
            key.to_owned(),
            Entry {
                value: Value::List(VecDeque::from([value.to_owned()])),
                expires_at: None,
            },
        );
        Ok(1)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let mut guard = self.store.write().await;
        Ok(Self::live(&mut guard, key).map_or(false, |entry| {
            entry.expires_at = Some(Instant::now() + ttl);
            true
        }))
    }

    async fn health_check(&self) -> AppResult<()> {
        let _guard = self.store.read().await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
