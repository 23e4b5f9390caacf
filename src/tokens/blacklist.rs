// ABOUTME: Revoked-jti blacklist stored in the shared key-value store
// ABOUTME: Written in one pipelined batch during principal-wide revocation, read by bearer auth
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;
use std::time::Duration;

use inhibitor_core::constants::keys::{jti_key, JTI_REVOKED_VALUE};
use tracing::debug;

use crate::errors::AppResult;
use crate::kv::KeyValueStore;

/// `jti:<value>` entries with a fixed TTL
#[derive(Clone)]
pub struct TokenBlacklist {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl TokenBlacklist {
    /// Blacklist over `store` whose entries expire after `ttl`
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mark every jti as revoked in a single batch, returning how many were written
    ///
    /// # Errors
    ///
    /// Returns an error if the batch write fails
    pub async fn revoke_all(&self, jtis: &[String]) -> AppResult<usize> {
        if jtis.is_empty() {
            return Ok(0);
        }
        let entries: Vec<(String, String)> = jtis
            .iter()
            .map(|jti| (jti_key(jti), JTI_REVOKED_VALUE.to_owned()))
            .collect();
        self.store.set_ex_many(&entries, self.ttl).await?;
        debug!(count = entries.len(), ttl_secs = self.ttl.as_secs(), "Blacklisted token ids");
        Ok(entries.len())
    }

    /// Whether a jti was revoked
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        self.store.exists(&jti_key(jti)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::InMemoryStore;
    use crate::kv::StoreConfig;

    #[tokio::test]
    async fn test_revoke_all_writes_prefixed_keys_with_ttl() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new(&StoreConfig::default()));
        let blacklist = TokenBlacklist::new(store.clone(), Duration::from_secs(86_400));

        let written = blacklist
            .revoke_all(&["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert!(blacklist.is_revoked("a").await.unwrap());
        assert!(!blacklist.is_revoked("c").await.unwrap());
        assert_eq!(store.get("jti:b").await.unwrap().as_deref(), Some("true"));

        let ttl = store.ttl("jti:a").await.unwrap().unwrap();
        assert!(ttl.as_secs() > 86_000);
        assert_eq!(blacklist.revoke_all(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_revoked_ids_survive_a_full_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new(&StoreConfig::default()));
        let blacklist = TokenBlacklist::new(store.clone(), Duration::from_secs(86_400));
        blacklist.revoke_all(&["victim".to_owned()]).await.unwrap();

        for i in 0..10_000 {
            store
                .set_ex(&format!("other:{i}"), "x", Duration::from_secs(3600))
                .await
                .unwrap();
        }
        assert!(blacklist.is_revoked("victim").await.unwrap());
    }
}
