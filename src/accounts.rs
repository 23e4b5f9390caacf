// ABOUTME: Loads user principals and verifies account passwords with bcrypt
// ABOUTME: Blank passwords fail closed unless the legacy pass-through flag is enabled
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use inhibitor_core::models::{Account, AccountStatus, UserPrincipal};
use tokio::task;
use tracing::warn;

use crate::database::AccountStore;
use crate::errors::{AppError, AppResult};

/// Outcome of a password comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// Hash matched
    Matched,
    /// Hash did not match, or a side was blank with the legacy flag off
    Mismatched,
    /// A side was blank and the legacy flag let it through
    LegacyBlankPass,
}

impl PasswordCheck {
    /// Whether authentication may proceed
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Matched | Self::LegacyBlankPass)
    }
}

/// User lookup and credential checks
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    allow_blank_password_legacy: bool,
}

impl AccountService {
    /// Service over `store`
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, allow_blank_password_legacy: bool) -> Self {
        Self {
            store,
            allow_blank_password_legacy,
        }
    }

    /// Principal for a login name
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails
    pub async fn load_user_by_username(&self, username: &str) -> AppResult<Option<UserPrincipal>> {
        Ok(self
            .store
            .find_account_by_username(username)
            .await?
            .as_ref()
            .map(UserPrincipal::from_account))
    }

    /// Principal for an account id
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails
    pub async fn load_user_by_id(&self, id: i64) -> AppResult<Option<UserPrincipal>> {
        Ok(self
            .store
            .find_account_by_id(id)
            .await?
            .as_ref()
            .map(UserPrincipal::from_account))
    }

    /// Account by id
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails
    pub async fn find_account(&self, id: i64) -> AppResult<Option<Account>> {
        self.store.find_account_by_id(id).await
    }

    /// Create an account with a bcrypt-hashed password
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails or the username is taken
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        name: Option<&str>,
        status: AccountStatus,
    ) -> AppResult<Account> {
        let hash = hash_password(password).await?;
        self.store
            .create_account(username, Some(&hash), name, status)
            .await
    }

    /// Compare a supplied password against the principal's stored hash
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is malformed or the verification task panics
    pub async fn check_password(
        &self,
        principal: &UserPrincipal,
        supplied: Option<&str>,
    ) -> AppResult<PasswordCheck> {
        let stored = principal
            .password_hash
            .as_deref()
            .filter(|h| !h.trim().is_empty());
        let supplied = supplied.filter(|p| !p.trim().is_empty());

        let (Some(stored), Some(supplied)) = (stored, supplied) else {
            if self.allow_blank_password_legacy {
                warn!(
                    username = %principal.username,
                    "Blank password accepted by legacy compatibility flag"
                );
                return Ok(PasswordCheck::LegacyBlankPass);
            }
            return Ok(PasswordCheck::Mismatched);
        };

        let stored = stored.to_owned();
        let supplied = supplied.to_owned();
        let matched = task::spawn_blocking(move || bcrypt::verify(&supplied, &stored))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AppError::crypto(format!("Stored password hash is invalid: {e}")))?;

        Ok(if matched {
            PasswordCheck::Matched
        } else {
            PasswordCheck::Mismatched
        })
    }
}

/// bcrypt hash with the default cost
///
/// # Errors
///
/// Returns an error if hashing fails
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_owned();
    task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::crypto(format!("Password hashing failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseUrl;
    use crate::database::Database;

    async fn service(legacy: bool) -> AccountService {
        let db = Database::new(&DatabaseUrl::Memory).await.unwrap();
        AccountService::new(Arc::new(db), legacy)
    }

    #[tokio::test]
    async fn test_password_check() {
        let service = service(false).await;
        let account = service
            .create_account("alice", "secret", Some("Alice"), AccountStatus::Activate)
            .await
            .unwrap();
        let principal = service
            .load_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.user_id, account.id);

        assert_eq!(
            service
                .check_password(&principal, Some("secret"))
                .await
                .unwrap(),
            PasswordCheck::Matched
        );
        assert_eq!(
            service.check_password(&principal, Some("nope")).await.unwrap(),
            PasswordCheck::Mismatched
        );
        assert_eq!(
            service.check_password(&principal, Some("  ")).await.unwrap(),
            PasswordCheck::Mismatched
        );
    }

    #[tokio::test]
    async fn test_blank_password_legacy_flag() {
        let strict = service(false).await;
        let legacy = service(true).await;
        let principal = UserPrincipal {
            user_id: 1,
            username: "legacy".to_owned(),
            name: None,
            status: AccountStatus::Activate,
            authorities: vec![],
            password_hash: None,
        };

        assert!(!strict
            .check_password(&principal, Some("anything"))
            .await
            .unwrap()
            .is_accepted());
        assert_eq!(
            legacy.check_password(&principal, None).await.unwrap(),
            PasswordCheck::LegacyBlankPass
        );
    }
}
