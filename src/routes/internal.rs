// ABOUTME: Bearer-protected internal endpoints for account-wide token revocation
// ABOUTME: Admin-scoped revocation by account id and self-service revocation for the caller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::delete;
use axum::{Json, Router};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::middleware::{AuthenticatedPrincipal, RequestId};
use crate::oauth2_server::PrincipalRevocation;
use crate::server::ServerResources;

/// Internal token-revocation routes
pub struct InternalRoutes;

impl InternalRoutes {
    /// Create the internal routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/internal/accounts/:account_id/tokens",
                delete(Self::handle_revoke_account_tokens),
            )
            .route("/api/internal/me/tokens", delete(Self::handle_revoke_my_tokens))
            .with_state(resources)
    }

    /// Handle DELETE /api/internal/accounts/{accountId}/tokens
    async fn handle_revoke_account_tokens(
        State(resources): State<Arc<ServerResources>>,
        request_id: RequestId,
        principal: AuthenticatedPrincipal,
        Path(account_id): Path<String>,
    ) -> AppResult<Json<PrincipalRevocation>> {
        let admin = principal.require_admin()?;
        let account_id: i64 = account_id.parse().map_err(|_| {
            AppError::invalid_input(format!("Account id {account_id} is not numeric"))
                .with_request_id(request_id.as_str())
        })?;

        let revocation = resources
            .principal_revocation
            .revoke_by_account_id(account_id)
            .await
            .map_err(|e| e.with_request_id(request_id.as_str()))?;

        AppLogger::log_security_event(
            "admin_token_revocation",
            "info",
            &format!(
                "account {account_id}: {} authorizations, {} jtis",
                revocation.revoked_authorizations, revocation.blacklisted_tokens
            ),
            &admin.sub,
        );
        Ok(Json(revocation))
    }

    /// Handle DELETE /api/internal/me/tokens
    async fn handle_revoke_my_tokens(
        State(resources): State<Arc<ServerResources>>,
        request_id: RequestId,
        principal: AuthenticatedPrincipal,
    ) -> AppResult<Json<PrincipalRevocation>> {
        let revocation = resources
            .principal_revocation
            .revoke_by_username(&principal.0.sub)
            .await
            .map_err(|e| e.with_request_id(request_id.as_str()))?;
        info!(
            principal = %revocation.principal,
            request_id = %request_id.as_str(),
            "Caller revoked all of their tokens"
        );
        Ok(Json(revocation))
    }
}
