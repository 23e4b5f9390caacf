// ABOUTME: Account records and the UserPrincipal projection used during authentication
// ABOUTME: A blocked account collapses the locked, disabled, and expired checks into one flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use serde::{Deserialize, Serialize};

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Account may sign in
    Activate,
    /// Account is blocked
    Block,
}

impl AccountStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "ACTIVATE",
            Self::Block => "BLOCK",
        }
    }

    /// Parse the storage representation, unknown values are treated as blocked
    #[must_use]
    pub fn from_str_or_blocked(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ACTIVATE") {
            Self::Activate
        } else {
            Self::Block
        }
    }
}

/// Stored user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Numeric account id
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// bcrypt hash, may be absent for legacy accounts
    pub password_hash: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Lifecycle status
    pub status: AccountStatus,
}

/// Authenticated principal materialized from an [`Account`]
///
/// Serialized into authorization attributes without the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrincipal {
    /// Account id
    pub user_id: i64,
    /// Login name
    pub username: String,
    /// Display name
    pub name: Option<String>,
    /// Lifecycle status at authentication time
    pub status: AccountStatus,
    /// Granted authorities
    pub authorities: Vec<String>,
    /// Never persisted
    #[serde(skip)]
    pub password_hash: Option<String>,
}

impl UserPrincipal {
    /// Authority granted to every account
    pub const ROLE_USER: &'static str = "ROLE_USER";

    /// Build the principal for an account
    #[must_use]
    pub fn from_account(account: &Account) -> Self {
        Self {
            user_id: account.id,
            username: account.username.clone(),
            name: account.name.clone(),
            status: account.status,
            authorities: vec![Self::ROLE_USER.to_owned()],
            password_hash: account.password_hash.clone(),
        }
    }

    /// Whether the account is not locked
    #[must_use]
    pub fn is_account_non_locked(&self) -> bool {
        self.status != AccountStatus::Block
    }

    /// Whether the account is enabled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status != AccountStatus::Block
    }

    /// Whether the account has not expired
    #[must_use]
    pub fn is_account_non_expired(&self) -> bool {
        self.status != AccountStatus::Block
    }

    /// Credentials never expire
    #[must_use]
    pub const fn is_credentials_non_expired(&self) -> bool {
        true
    }
}
