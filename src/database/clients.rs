// ABOUTME: Registered client table and its sqlx adapter
// ABOUTME: Settings are stored as JSON, sets as JSON arrays
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inhibitor_core::models::{ClientSettings, RegisteredClient, TokenSettings};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{decode_set, encode_set, Database, RegisteredClientStore};
use crate::errors::AppResult;

const CLIENT_COLUMNS: &str = "id, client_id, client_id_issued_at, client_secret, client_name, \
     client_authentication_methods, authorization_grant_types, redirect_uris, scopes, \
     client_settings, token_settings";

impl Database {
    pub(super) async fn migrate_clients(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS registered_client (
                id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL UNIQUE,
                client_id_issued_at DATETIME NOT NULL,
                client_secret TEXT,
                client_name TEXT NOT NULL,
                client_authentication_methods TEXT NOT NULL,
                authorization_grant_types TEXT NOT NULL,
                redirect_uris TEXT NOT NULL DEFAULT '[]',
                scopes TEXT NOT NULL,
                client_settings TEXT NOT NULL,
                token_settings TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_client(row: &SqliteRow) -> AppResult<RegisteredClient> {
        let client_settings: ClientSettings =
            serde_json::from_str(&row.try_get::<String, _>("client_settings")?)?;
        let token_settings: TokenSettings =
            serde_json::from_str(&row.try_get::<String, _>("token_settings")?)?;

        Ok(RegisteredClient {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            client_id_issued_at: row.try_get::<DateTime<Utc>, _>("client_id_issued_at")?,
            client_secret_hash: row.try_get("client_secret")?,
            client_name: row.try_get("client_name")?,
            authentication_methods: decode_set(
                &row.try_get::<String, _>("client_authentication_methods")?,
            )?,
            grant_types: decode_set(&row.try_get::<String, _>("authorization_grant_types")?)?,
            redirect_uris: decode_set(&row.try_get::<String, _>("redirect_uris")?)?,
            scopes: decode_set(&row.try_get::<String, _>("scopes")?)?,
            client_settings,
            token_settings,
        })
    }
}

#[async_trait]
impl RegisteredClientStore for Database {
    async fn save_client(&self, client: &RegisteredClient) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO registered_client (
                id, client_id, client_id_issued_at, client_secret, client_name,
                client_authentication_methods, authorization_grant_types, redirect_uris, scopes,
                client_settings, token_settings
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT(id) DO UPDATE SET
                client_id = excluded.client_id,
                client_secret = excluded.client_secret,
                client_name = excluded.client_name,
                client_authentication_methods = excluded.client_authentication_methods,
                authorization_grant_types = excluded.authorization_grant_types,
                redirect_uris = excluded.redirect_uris,
                scopes = excluded.scopes,
                client_settings = excluded.client_settings,
                token_settings = excluded.token_settings
            ",
        )
        .bind(&client.id)
        .bind(&client.client_id)
        .bind(client.client_id_issued_at)
        .bind(&client.client_secret_hash)
        .bind(&client.client_name)
        .bind(encode_set(&client.authentication_methods)?)
        .bind(encode_set(&client.grant_types)?)
        .bind(encode_set(&client.redirect_uris)?)
        .bind(encode_set(&client.scopes)?)
        .bind(serde_json::to_string(&client.client_settings)?)
        .bind(serde_json::to_string(&client.token_settings)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_client_by_id(&self, id: &str) -> AppResult<Option<RegisteredClient>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM registered_client WHERE id = $1");
        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::row_to_client)
            .transpose()
    }

    async fn find_client_by_client_id(
        &self,
        client_id: &str,
    ) -> AppResult<Option<RegisteredClient>> {
        let query =
            format!("SELECT {CLIENT_COLUMNS} FROM registered_client WHERE client_id = $1");
        sqlx::query(&query)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::row_to_client)
            .transpose()
    }

    async fn list_clients(&self) -> AppResult<Vec<RegisteredClient>> {
        let query =
            format!("SELECT {CLIENT_COLUMNS} FROM registered_client ORDER BY client_id");
        sqlx::query(&query)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::row_to_client)
            .collect()
    }
}
