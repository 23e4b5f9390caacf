// ABOUTME: SQLite persistence for registered clients, authorizations, and accounts
// ABOUTME: Store traits decouple grant logic from the sqlx adapter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! # Database Management
//!
//! `Database` owns the sqlx pool, runs idempotent migrations, and implements the
//! three store traits the authorization server depends on.

mod accounts;
mod authorizations;
mod clients;

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use inhibitor_core::models::{Account, AccountStatus, Authorization, RegisteredClient};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::config::DatabaseUrl;
use crate::errors::{AppError, AppResult};

/// Persistence of issued grants
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Insert or replace an authorization by id
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the refresh token value is already in use
    async fn save(&self, authorization: &Authorization) -> AppResult<()>;

    /// Replace the stored record only if it still carries `expected_refresh_token`
    ///
    /// Returns `false` when another request rotated the token first.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    async fn save_if_refresh_token_matches(
        &self,
        authorization: &Authorization,
        expected_refresh_token: &str,
    ) -> AppResult<bool>;

    /// Look up by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Authorization>>;

    /// Look up by refresh token value
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded
    async fn find_by_refresh_token(&self, token: &str) -> AppResult<Option<Authorization>>;

    /// All authorizations of a principal
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded
    async fn find_by_principal_name(&self, principal_name: &str) -> AppResult<Vec<Authorization>>;

    /// Delete by id, returns whether a row existed
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    async fn remove(&self, id: &str) -> AppResult<bool>;

    /// Delete every authorization of a principal in one statement
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    async fn remove_all_by_principal_name(&self, principal_name: &str) -> AppResult<u64>;
}

/// Persistence of client registrations
#[async_trait]
pub trait RegisteredClientStore: Send + Sync {
    /// Insert or replace a client by internal id
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the client id is taken by another record
    async fn save_client(&self, client: &RegisteredClient) -> AppResult<()>;

    /// Look up by internal id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded
    async fn find_client_by_id(&self, id: &str) -> AppResult<Option<RegisteredClient>>;

    /// Look up by public client id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded
    async fn find_client_by_client_id(&self, client_id: &str)
        -> AppResult<Option<RegisteredClient>>;

    /// Every registered client ordered by client id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded
    async fn list_clients(&self) -> AppResult<Vec<RegisteredClient>>;
}

/// Read access to user accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up by login name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    async fn find_account_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    /// Look up by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    async fn find_account_by_id(&self, id: i64) -> AppResult<Option<Account>>;

    /// Create an account, returning it with its generated id
    ///
    /// # Errors
    ///
    /// Returns an error if the username is taken or the insert fails
    async fn create_account(
        &self,
        username: &str,
        password_hash: Option<&str>,
        name: Option<&str>,
        status: AccountStatus,
    ) -> AppResult<Account>;
}

/// Database manager for clients, authorizations, and accounts
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect and run migrations
    ///
    /// In-memory databases use a single connection so every query sees the same schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails
    pub async fn new(url: &DatabaseUrl) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&url.to_connection_string())?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options)
                .await?
        };

        let db = Self { pool };
        db.migrate().await?;
        info!("Database initialized: {url}");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Round-trip a trivial query
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot serve a connection
    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any `CREATE` statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_clients().await?;
        self.migrate_authorizations().await?;
        self.migrate_accounts().await?;
        Ok(())
    }
}

/// Encode a string set as a JSON array
fn encode_set(set: &BTreeSet<String>) -> AppResult<String> {
    Ok(serde_json::to_string(set)?)
}

/// Decode a JSON array column, tolerating empty strings
fn decode_set(raw: &str) -> AppResult<BTreeSet<String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| AppError::serialization(format!("Corrupt set column: {e}")))
}
