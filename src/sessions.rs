// ABOUTME: Per-user, per-client session cap enforced after each successful login
// ABOUTME: Evicts the oldest sessions FIFO and removes their authorizations from the store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inhibitor_core::constants::keys::{session_key, SESSION_FALLBACK_TTL_SECS};
use inhibitor_core::models::SessionEntry;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::database::AuthorizationStore;
use crate::errors::{AppError, AppResult};
use crate::events::{LoginEventHandler, LoginSucceeded};
use crate::kv::KeyValueStore;

/// Outcome of registering one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRegistration {
    /// Entries popped from the front of the list
    pub evicted: usize,
    /// Authorizations removed for the evicted entries
    pub revoked: usize,
    /// List length after the append
    pub active_sessions: usize,
}

/// Session concurrency limiter backed by a key-value list per (user, client)
pub struct SessionConcurrencyLimiter {
    store: Arc<dyn KeyValueStore>,
    authorizations: Arc<dyn AuthorizationStore>,
    config: SessionConfig,
}

impl SessionConcurrencyLimiter {
    /// Limiter using the caps in `config`
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        authorizations: Arc<dyn AuthorizationStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            authorizations,
            config,
        }
    }

    /// Cap for `client_id`
    #[must_use]
    pub fn cap_for(&self, client_id: &str) -> usize {
        self.config.cap_for(client_id)
    }

    /// Sessions currently recorded for the pair, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be read or an entry is not valid JSON
    pub async fn sessions(&self, user_id: i64, client_id: &str) -> AppResult<Vec<SessionEntry>> {
        self.store
            .lrange_all(&session_key(user_id, client_id))
            .await?
            .iter()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| {
                    AppError::serialization(format!("Invalid session entry: {e}"))
                })
            })
            .collect()
    }

    /// Record a new session, evicting the oldest ones beyond the cap
    ///
    /// # Errors
    ///
    /// Returns an error if a key-value operation fails. Eviction is best
    /// effort: missing authorizations, unreadable entries and authorization
    /// store failures are logged and the new session is still recorded.
    pub async fn register(&self, event: &LoginSucceeded) -> AppResult<SessionRegistration> {
        let key = session_key(event.account_id, &event.client_id);
        let cap = self.cap_for(&event.client_id);
        let current = self.store.lrange_all(&key).await?.len();

        let mut evicted = 0;
        let mut revoked = 0;
        if current >= cap {
            let evict_count = current - cap + 1;
            let popped = self.store.lpop(&key, evict_count).await?;
            evicted = popped.len();
            for raw in popped {
                match self.revoke_entry(&raw).await {
                    Ok(true) => revoked += 1,
                    Ok(false) => {}
                    Err(e) => warn!(
                        account_id = event.account_id,
                        client_id = %event.client_id,
                        "Evicted session left its authorization in place: {e}"
                    ),
                }
            }
            info!(
                account_id = event.account_id,
                client_id = %event.client_id,
                cap,
                evicted,
                revoked,
                "Session cap reached; evicted oldest sessions"
            );
        }

        let entry = SessionEntry {
            access_token: event.access_token.clone(),
            refresh_token: event.refresh_token.clone(),
            created_at: event.occurred_at.timestamp_millis(),
        };
        let serialized = serde_json::to_string(&entry)
            .map_err(|e| AppError::serialization(format!("Session entry: {e}")))?;
        let active_sessions = self.store.rpush(&key, &serialized).await?;

        let ttl_secs = event
            .access_token_ttl_secs
            .filter(|secs| *secs > 0)
            .map_or(SESSION_FALLBACK_TTL_SECS, i64::unsigned_abs);
        self.store.expire(&key, Duration::from_secs(ttl_secs)).await?;

        debug!(
            account_id = event.account_id,
            client_id = %event.client_id,
            active_sessions,
            ttl_secs,
            "Session registered"
        );
        Ok(SessionRegistration {
            evicted,
            revoked,
            active_sessions,
        })
    }

    async fn revoke_entry(&self, raw: &str) -> AppResult<bool> {
        let entry: SessionEntry = match serde_json::from_str(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable session entry: {e}");
                return Ok(false);
            }
        };
        match self
            .authorizations
            .find_by_refresh_token(&entry.refresh_token)
            .await?
        {
            Some(authorization) => self.authorizations.remove(&authorization.id).await,
            None => {
                debug!("Evicted session has no authorization left");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl LoginEventHandler for SessionConcurrencyLimiter {
    fn name(&self) -> &'static str {
        "session_concurrency_limiter"
    }

    async fn handle(&self, event: &LoginSucceeded) -> AppResult<()> {
        self.register(event).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use chrono::Utc;
    use inhibitor_core::models::{
        Authorization, AuthorizationAttributes, IssuedToken, TokenMetadata,
    };

    use super::*;
    use crate::config::DatabaseUrl;
    use crate::database::Database;
    use crate::kv::memory::InMemoryStore;
    use crate::kv::StoreConfig;

    async fn fixture(caps: &[(&str, usize)]) -> (SessionConcurrencyLimiter, Arc<Database>) {
        let db = Arc::new(Database::new(&DatabaseUrl::Memory).await.unwrap());
        let store = Arc::new(InMemoryStore::new(&StoreConfig::default()));
        let config = SessionConfig {
            default_cap: 3,
            client_caps: caps
                .iter()
                .map(|(c, n)| ((*c).to_owned(), *n))
                .collect::<HashMap<_, _>>(),
        };
        (
            SessionConcurrencyLimiter::new(store, db.clone(), config),
            db,
        )
    }

    async fn login(
        limiter: &SessionConcurrencyLimiter,
        db: &Database,
        n: usize,
        client_id: &str,
    ) -> SessionRegistration {
        let now = Utc::now();
        let refresh = format!("refresh-{n}");
        let authorization = Authorization {
            id: format!("auth-{n}"),
            registered_client_id: "client-row".to_owned(),
            principal_name: "alice".to_owned(),
            grant_type: "origin_password".to_owned(),
            authorized_scopes: BTreeSet::new(),
            attributes: AuthorizationAttributes::default(),
            access_token: None,
            refresh_token: Some(IssuedToken {
                value: refresh.clone(),
                issued_at: now,
                expires_at: None,
                metadata: TokenMetadata::default(),
            }),
            id_token: None,
        };
        db.save(&authorization).await.unwrap();
        limiter
            .register(&LoginSucceeded {
                account_id: 7,
                client_id: client_id.to_owned(),
                access_token: format!("access-{n}"),
                refresh_token: refresh,
                access_token_ttl_secs: Some(60),
                correlation_id: format!("req_{n}"),
                occurred_at: now,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_default_cap_evicts_oldest_on_fourth_login() {
        let (limiter, db) = fixture(&[]).await;
        for n in 1..=3 {
            assert_eq!(login(&limiter, &db, n, "inhibitor").await.evicted, 0);
        }
        let fourth = login(&limiter, &db, 4, "inhibitor").await;
        assert_eq!(fourth.evicted, 1);
        assert_eq!(fourth.revoked, 1);
        assert_eq!(fourth.active_sessions, 3);

        assert!(db.find_by_id("auth-1").await.unwrap().is_none());
        assert!(db.find_by_id("auth-2").await.unwrap().is_some());
        let sessions = limiter.sessions(7, "inhibitor").await.unwrap();
        assert_eq!(sessions.first().unwrap().refresh_token, "refresh-2");
        assert_eq!(sessions.last().unwrap().refresh_token, "refresh-4");
    }

    #[tokio::test]
    async fn test_cap_of_one_keeps_latest_session() {
        let (limiter, db) = fixture(&[("single", 1)]).await;
        for n in 1..=3 {
            login(&limiter, &db, n, "single").await;
        }
        let sessions = limiter.sessions(7, "single").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].access_token, "access-3");
        assert!(db.find_by_id("auth-1").await.unwrap().is_none());
        assert!(db.find_by_id("auth-2").await.unwrap().is_none());
        assert!(db.find_by_id("auth-3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_authorization_is_not_fatal() {
        let (limiter, db) = fixture(&[("single", 1)]).await;
        login(&limiter, &db, 1, "single").await;
        db.remove("auth-1").await.unwrap();
        let second = login(&limiter, &db, 2, "single").await;
        assert_eq!(second.evicted, 1);
        assert_eq!(second.revoked, 0);
    }

    /// Authorization store whose refresh-token lookups always fail
    struct FailingLookups(Arc<Database>);

    #[async_trait]
    impl AuthorizationStore for FailingLookups {
        async fn save(&self, authorization: &Authorization) -> AppResult<()> {
            self.0.save(authorization).await
        }

        async fn save_if_refresh_token_matches(
            &self,
            authorization: &Authorization,
            expected_refresh_token: &str,
        ) -> AppResult<bool> {
            self.0
                .save_if_refresh_token_matches(authorization, expected_refresh_token)
                .await
        }

        async fn find_by_id(&self, id: &str) -> AppResult<Option<Authorization>> {
            self.0.find_by_id(id).await
        }

        async fn find_by_refresh_token(&self, _token: &str) -> AppResult<Option<Authorization>> {
            Err(AppError::database("connection lost"))
        }

        async fn find_by_principal_name(
            &self,
            principal_name: &str,
        ) -> AppResult<Vec<Authorization>> {
            self.0.find_by_principal_name(principal_name).await
        }

        async fn remove(&self, id: &str) -> AppResult<bool> {
            self.0.remove(id).await
        }

        async fn remove_all_by_principal_name(&self, principal_name: &str) -> AppResult<u64> {
            self.0.remove_all_by_principal_name(principal_name).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_during_eviction_still_records_session() {
        let (_, db) = fixture(&[]).await;
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new(&StoreConfig::default()));
        let limiter = SessionConcurrencyLimiter::new(
            store.clone(),
            Arc::new(FailingLookups(db.clone())),
            SessionConfig {
                default_cap: 1,
                client_caps: HashMap::new(),
            },
        );

        login(&limiter, &db, 1, "inhibitor").await;
        let second = login(&limiter, &db, 2, "inhibitor").await;
        assert_eq!(second.evicted, 1);
        assert_eq!(second.revoked, 0);
        assert_eq!(second.active_sessions, 1);

        let sessions = limiter.sessions(7, "inhibitor").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].refresh_token, "refresh-2");
        assert!(store.ttl(&session_key(7, "inhibitor")).await.unwrap().is_some());
    }
}
