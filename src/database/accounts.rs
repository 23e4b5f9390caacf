// ABOUTME: Account table and its sqlx adapter
// ABOUTME: Accounts are read during authentication and by principal-wide revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use async_trait::async_trait;
use inhibitor_core::models::{Account, AccountStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{AccountStore, Database};
use crate::errors::{AppError, AppResult, ErrorCode};

impl Database {
    pub(super) async fn migrate_accounts(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT,
                name TEXT,
                status TEXT NOT NULL DEFAULT 'ACTIVATE',
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_account(row: &SqliteRow) -> AppResult<Account> {
        Ok(Account {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password")?,
            name: row.try_get("name")?,
            status: AccountStatus::from_str_or_blocked(&row.try_get::<String, _>("status")?),
        })
    }
}

#[async_trait]
impl AccountStore for Database {
    async fn find_account_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        sqlx::query("SELECT id, username, password, name, status FROM account WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::row_to_account)
            .transpose()
    }

    async fn find_account_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        sqlx::query("SELECT id, username, password, name, status FROM account WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::row_to_account)
            .transpose()
    }

    async fn create_account(
        &self,
        username: &str,
        password_hash: Option<&str>,
        name: Option<&str>,
        status: AccountStatus,
    ) -> AppResult<Account> {
        let result = sqlx::query(
            "INSERT INTO account (username, password, name, status) VALUES ($1, $2, $3, $4)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(name)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                AppError::new(
                    ErrorCode::ResourceAlreadyExists,
                    format!("Account {username} already exists"),
                )
            } else {
                AppError::from(e)
            }
        })?;

        Ok(Account {
            id: result.last_insert_rowid(),
            username: username.to_owned(),
            password_hash: password_hash.map(ToOwned::to_owned),
            name: name.map(ToOwned::to_owned),
            status,
        })
    }
}
