// ABOUTME: Authorization table with indexes on client, principal, and refresh token
// ABOUTME: Conditional update guards refresh token rotation against concurrent refreshes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inhibitor_core::models::{Authorization, AuthorizationAttributes, IssuedToken, TokenMetadata};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};

use super::{decode_set, encode_set, AuthorizationStore, Database};
use crate::errors::{AppError, AppResult, ErrorCode};

const AUTHORIZATION_COLUMNS: &str = "id, registered_client_id, principal_name, \
     authorization_grant_type, authorized_scopes, attributes, \
     access_token_value, access_token_issued_at, access_token_expires_at, access_token_metadata, \
     refresh_token_value, refresh_token_issued_at, refresh_token_expires_at, refresh_token_metadata, \
     oidc_id_token_value, oidc_id_token_issued_at, oidc_id_token_expires_at, oidc_id_token_metadata";

/// Column values of one token slot
struct TokenColumns {
    value: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    metadata: Option<String>,
}

impl TokenColumns {
    fn encode(token: Option<&IssuedToken>) -> AppResult<Self> {
        let Some(token) = token else {
            return Ok(Self {
                value: None,
                issued_at: None,
                expires_at: None,
                metadata: None,
            });
        };
        Ok(Self {
            value: Some(token.value.clone()),
            issued_at: Some(token.issued_at),
            expires_at: token.expires_at,
            metadata: Some(serde_json::to_string(&token.metadata)?),
        })
    }

    fn decode(row: &SqliteRow, prefix: &str) -> AppResult<Option<IssuedToken>> {
        let Some(value) = row.try_get::<Option<String>, _>(format!("{prefix}_value").as_str())?
        else {
            return Ok(None);
        };
        let issued_at = row
            .try_get::<Option<DateTime<Utc>>, _>(format!("{prefix}_issued_at").as_str())?
            .ok_or_else(|| AppError::database(format!("{prefix}_issued_at is missing")))?;
        let expires_at =
            row.try_get::<Option<DateTime<Utc>>, _>(format!("{prefix}_expires_at").as_str())?;
        let metadata = row
            .try_get::<Option<String>, _>(format!("{prefix}_metadata").as_str())?
            .map(|raw| serde_json::from_str::<TokenMetadata>(&raw))
            .transpose()?
            .unwrap_or_default();
        Ok(Some(IssuedToken {
            value,
            issued_at,
            expires_at,
            metadata,
        }))
    }

    fn bind<'q>(
        self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(self.value)
            .bind(self.issued_at)
            .bind(self.expires_at)
            .bind(self.metadata)
    }
}

impl Database {
    pub(super) async fn migrate_authorizations(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS authorization (
                id TEXT PRIMARY KEY,
                registered_client_id TEXT NOT NULL,
                principal_name TEXT NOT NULL,
                authorization_grant_type TEXT NOT NULL,
                authorized_scopes TEXT NOT NULL DEFAULT '[]',
                attributes TEXT NOT NULL,
                access_token_value TEXT,
                access_token_issued_at DATETIME,
                access_token_expires_at DATETIME,
                access_token_metadata TEXT,
                refresh_token_value TEXT,
                refresh_token_issued_at DATETIME,
                refresh_token_expires_at DATETIME,
                refresh_token_metadata TEXT,
                oidc_id_token_value TEXT,
                oidc_id_token_issued_at DATETIME,
                oidc_id_token_expires_at DATETIME,
                oidc_id_token_metadata TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_authorization_registered_client_id \
             ON authorization(registered_client_id)",
            "CREATE INDEX IF NOT EXISTS idx_authorization_principal_name \
             ON authorization(principal_name)",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_authorization_refresh_token_value \
             ON authorization(refresh_token_value)",
            "CREATE INDEX IF NOT EXISTS idx_authorization_refresh_token_expires_at \
             ON authorization(refresh_token_expires_at)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn row_to_authorization(row: &SqliteRow) -> AppResult<Authorization> {
        let attributes: AuthorizationAttributes =
            serde_json::from_str(&row.try_get::<String, _>("attributes")?)?;
        Ok(Authorization {
            id: row.try_get("id")?,
            registered_client_id: row.try_get("registered_client_id")?,
            principal_name: row.try_get("principal_name")?,
            grant_type: row.try_get("authorization_grant_type")?,
            authorized_scopes: decode_set(&row.try_get::<String, _>("authorized_scopes")?)?,
            attributes,
            access_token: TokenColumns::decode(row, "access_token")?,
            refresh_token: TokenColumns::decode(row, "refresh_token")?,
            id_token: TokenColumns::decode(row, "oidc_id_token")?,
        })
    }

    async fn find_one(&self, column: &str, value: &str) -> AppResult<Option<Authorization>> {
        let query =
            format!("SELECT {AUTHORIZATION_COLUMNS} FROM authorization WHERE {column} = $1");
        sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::row_to_authorization)
            .transpose()
    }
}

/// Map a unique-index violation on the refresh token to a conflict
fn map_write_error(error: sqlx::Error) -> AppError {
    let unique = error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AppError::new(
            ErrorCode::ResourceAlreadyExists,
            "Refresh token value already in use",
        )
    } else {
        AppError::from(error)
    }
}

#[async_trait]
impl AuthorizationStore for Database {
    async fn save(&self, authorization: &Authorization) -> AppResult<()> {
        let query = sqlx::query(
            r"
            INSERT INTO authorization (
                id, registered_client_id, principal_name, authorization_grant_type,
                authorized_scopes, attributes,
                access_token_value, access_token_issued_at, access_token_expires_at, access_token_metadata,
                refresh_token_value, refresh_token_issued_at, refresh_token_expires_at, refresh_token_metadata,
                oidc_id_token_value, oidc_id_token_issued_at, oidc_id_token_expires_at, oidc_id_token_metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT(id) DO UPDATE SET
                authorized_scopes = excluded.authorized_scopes,
                attributes = excluded.attributes,
                access_token_value = excluded.access_token_value,
                access_token_issued_at = excluded.access_token_issued_at,
                access_token_expires_at = excluded.access_token_expires_at,
                access_token_metadata = excluded.access_token_metadata,
                refresh_token_value = excluded.refresh_token_value,
                refresh_token_issued_at = excluded.refresh_token_issued_at,
                refresh_token_expires_at = excluded.refresh_token_expires_at,
                refresh_token_metadata = excluded.refresh_token_metadata,
                oidc_id_token_value = excluded.oidc_id_token_value,
                oidc_id_token_issued_at = excluded.oidc_id_token_issued_at,
                oidc_id_token_expires_at = excluded.oidc_id_token_expires_at,
                oidc_id_token_metadata = excluded.oidc_id_token_metadata
            ",
        )
        .bind(&authorization.id)
        .bind(&authorization.registered_client_id)
        .bind(&authorization.principal_name)
        .bind(&authorization.grant_type)
        .bind(encode_set(&authorization.authorized_scopes)?)
        .bind(serde_json::to_string(&authorization.attributes)?);

        let query = TokenColumns::encode(authorization.access_token.as_ref())?.bind(query);
        let query = TokenColumns::encode(authorization.refresh_token.as_ref())?.bind(query);
        let query = TokenColumns::encode(authorization.id_token.as_ref())?.bind(query);

        query.execute(&self.pool).await.map_err(map_write_error)?;
        Ok(())
    }

    async fn save_if_refresh_token_matches(
        &self,
        authorization: &Authorization,
        expected_refresh_token: &str,
    ) -> AppResult<bool> {
        let query = sqlx::query(
            r"
            UPDATE authorization SET
                principal_name = $1,
                authorized_scopes = $2,
                attributes = $3,
                access_token_value = $4,
                access_token_issued_at = $5,
                access_token_expires_at = $6,
                access_token_metadata = $7,
                refresh_token_value = $8,
                refresh_token_issued_at = $9,
                refresh_token_expires_at = $10,
                refresh_token_metadata = $11,
                oidc_id_token_value = $12,
                oidc_id_token_issued_at = $13,
                oidc_id_token_expires_at = $14,
                oidc_id_token_metadata = $15
            WHERE id = $16 AND refresh_token_value = $17
            ",
        )
        .bind(&authorization.principal_name)
        .bind(encode_set(&authorization.authorized_scopes)?)
        .bind(serde_json::to_string(&authorization.attributes)?);

        let query = TokenColumns::encode(authorization.access_token.as_ref())?.bind(query);
        let query = TokenColumns::encode(authorization.refresh_token.as_ref())?.bind(query);
        let query = TokenColumns::encode(authorization.id_token.as_ref())?.bind(query);

        let result = query
            .bind(&authorization.id)
            .bind(expected_refresh_token)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Authorization>> {
        self.find_one("id", id).await
    }

    async fn find_by_refresh_token(&self, token: &str) -> AppResult<Option<Authorization>> {
        self.find_one("refresh_token_value", token).await
    }

    async fn find_by_principal_name(&self, principal_name: &str) -> AppResult<Vec<Authorization>> {
        let query = format!(
            "SELECT {AUTHORIZATION_COLUMNS} FROM authorization WHERE principal_name = $1"
        );
        sqlx::query(&query)
            .bind(principal_name)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::row_to_authorization)
            .collect()
    }

    async fn remove(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM authorization WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_all_by_principal_name(&self, principal_name: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM authorization WHERE principal_name = $1")
            .bind(principal_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
