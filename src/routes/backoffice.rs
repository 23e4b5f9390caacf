// ABOUTME: Backoffice administration of registered clients
// ABOUTME: Lists, registers, and adjusts token lifetimes of clients behind an admin-scoped bearer token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! Registered client administration routes
//!
//! Every handler requires a bearer token carrying the `admin` scope. Lifetimes are
//! exchanged in seconds.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use inhibitor_core::constants::tokens::{
    DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS,
};
use inhibitor_core::models::RegisteredClient;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::middleware::AuthenticatedPrincipal;
use crate::server::ServerResources;

/// Lifetime change request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExpiryRequest {
    /// Access token lifetime in seconds
    pub access_token_expiry: Option<i64>,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: Option<i64>,
}

/// Client registration request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClientRequest {
    /// Public client identifier
    pub client_id: String,
    /// Plain secret, stored as an argon2 hash
    pub client_secret: String,
    /// Scopes beyond `openid` and `profile`
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Access token lifetime in seconds
    pub access_token_expiry: Option<i64>,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: Option<i64>,
}

/// Lifetimes of one registered client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenExpiryResponse {
    /// Public client identifier
    pub client_id: String,
    /// Access token lifetime in seconds
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: i64,
}

impl From<&RegisteredClient> for ClientTokenExpiryResponse {
    fn from(client: &RegisteredClient) -> Self {
        Self {
            client_id: client.client_id.clone(),
            access_token_expiry: client.token_settings.access_token_ttl_secs,
            refresh_token_expiry: client.token_settings.refresh_token_ttl_secs,
        }
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::invalid_input(rejection.body_text()))
}

/// Backoffice client routes
pub struct BackofficeRoutes;

impl BackofficeRoutes {
    /// Create the registered client routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/backoffice/api/registered-clients",
                get(Self::handle_list_clients).post(Self::handle_register_client),
            )
            .route(
                "/backoffice/api/registered-clients/:client_id/token-expiry",
                patch(Self::handle_update_access_expiry),
            )
            .route(
                "/backoffice/api/registered-clients/:client_id/refresh-token-expiry",
                patch(Self::handle_update_refresh_expiry),
            )
            .with_state(resources)
    }

    async fn handle_list_clients(
        State(resources): State<Arc<ServerResources>>,
        principal: AuthenticatedPrincipal,
    ) -> AppResult<Json<Vec<ClientTokenExpiryResponse>>> {
        principal.require_admin()?;
        let clients = resources.clients.find_all().await?;
        Ok(Json(clients.iter().map(ClientTokenExpiryResponse::from).collect()))
    }

    async fn handle_register_client(
        State(resources): State<Arc<ServerResources>>,
        principal: AuthenticatedPrincipal,
        body: Result<Json<RegisterClientRequest>, JsonRejection>,
    ) -> AppResult<(StatusCode, Json<ClientTokenExpiryResponse>)> {
        let admin = principal.require_admin()?;
        let request = json_body(body)?;
        let scopes: Vec<&str> = request.scopes.iter().map(String::as_str).collect();

        let client = resources
            .clients
            .init_registered_client(
                &request.client_id,
                &request.client_secret,
                &scopes,
                request
                    .access_token_expiry
                    .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS),
                request
                    .refresh_token_expiry
                    .unwrap_or(DEFAULT_REFRESH_TOKEN_TTL_SECS),
            )
            .await?;
        info!(client_id = %client.client_id, by = %admin.sub, "Registered client via backoffice");
        Ok((
            StatusCode::CREATED,
            Json(ClientTokenExpiryResponse::from(&client)),
        ))
    }

    async fn handle_update_access_expiry(
        State(resources): State<Arc<ServerResources>>,
        principal: AuthenticatedPrincipal,
        Path(client_id): Path<String>,
        body: Result<Json<TokenExpiryRequest>, JsonRejection>,
    ) -> AppResult<Json<ClientTokenExpiryResponse>> {
        principal.require_admin()?;
        let ttl = json_body(body)?
            .access_token_expiry
            .ok_or_else(|| AppError::invalid_input("accessTokenExpiry is required"))?;
        let client = resources
            .clients
            .update_access_token_ttl(&client_id, ttl)
            .await?;
        Ok(Json(ClientTokenExpiryResponse::from(&client)))
    }

    async fn handle_update_refresh_expiry(
        State(resources): State<Arc<ServerResources>>,
        principal: AuthenticatedPrincipal,
        Path(client_id): Path<String>,
        body: Result<Json<TokenExpiryRequest>, JsonRejection>,
    ) -> AppResult<Json<ClientTokenExpiryResponse>> {
        principal.require_admin()?;
        let ttl = json_body(body)?
            .refresh_token_expiry
            .ok_or_else(|| AppError::invalid_input("refreshTokenExpiry is required"))?;
        let client = resources
            .clients
            .update_refresh_token_ttl(&client_id, ttl)
            .await?;
        Ok(Json(ClientTokenExpiryResponse::from(&client)))
    }
}
