// ABOUTME: Bearer token authentication for the internal and backoffice APIs
// ABOUTME: Verifies RS256 access tokens against the JWKS and rejects blacklisted jtis
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use inhibitor_core::constants::scopes::ADMIN;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::server::ServerResources;
use crate::tokens::{AccessTokenClaims, JwksManager, TokenBlacklist};

/// Verifies bearer access tokens
#[derive(Clone)]
pub struct BearerAuthenticator {
    keys: Arc<JwksManager>,
    blacklist: TokenBlacklist,
    issuer: Option<String>,
}

impl BearerAuthenticator {
    /// Creates a new bearer authenticator
    #[must_use]
    pub fn new(keys: Arc<JwksManager>, blacklist: TokenBlacklist, issuer: Option<String>) -> Self {
        Self {
            keys,
            blacklist,
            issuer,
        }
    }

    /// Verify signature, expiry, and issuer, then consult the blacklist
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for a bad token and `AuthRevoked` for a blacklisted jti
    pub async fn authenticate(&self, token: &str) -> AppResult<AccessTokenClaims> {
        let claims: AccessTokenClaims = self.keys.verify(token, self.issuer.as_deref())?;
        if let Some(jti) = claims.jti.as_deref() {
            if self.blacklist.is_revoked(jti).await? {
                warn!(sub = %claims.sub, jti, "Rejected blacklisted access token");
                return Err(AppError::auth_revoked());
            }
        }
        debug!(sub = %claims.sub, "Bearer token accepted");
        Ok(claims)
    }
}

/// Claims of a verified, non-revoked bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub AccessTokenClaims);

impl AuthenticatedPrincipal {
    /// Require a scope
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the scope is absent
    pub fn require_scope(&self, scope: &str) -> AppResult<&AccessTokenClaims> {
        if self.0.has_scope(scope) {
            Ok(&self.0)
        } else {
            Err(AppError::permission_denied(format!(
                "Scope {scope} is required"
            )))
        }
    }

    /// Require the `admin` scope
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the token is not admin-scoped
    pub fn require_admin(&self) -> AppResult<&AccessTokenClaims> {
        self.require_scope(ADMIN)
    }
}

#[async_trait]
impl FromRequestParts<Arc<ServerResources>> for AuthenticatedPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        resources: &Arc<ServerResources>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, resources)
                .await
                .map_err(|_| AppError::auth_required())?;
        resources
            .bearer
            .authenticate(bearer.token())
            .await
            .map(Self)
    }
}
