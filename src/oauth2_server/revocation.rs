// ABOUTME: RFC 7009 token revocation for refresh tokens issued to the calling client
// ABOUTME: Unknown tokens succeed silently; access tokens are stateless and are not looked up
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use inhibitor_core::constants::token_type_hints::{ACCESS_TOKEN, REFRESH_TOKEN};
use tracing::{info, trace};

use super::context::GrantContext;
use super::models::{OAuth2Error, RevocationRequest};
use crate::database::AuthorizationStore;

/// What a revocation request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationOutcome {
    /// The authorization was deleted
    Revoked,
    /// Nothing matched; still a success
    NotFound,
    /// Access token hint; nothing to delete
    Ignored,
}

/// Revocation endpoint logic
#[derive(Clone)]
pub struct TokenRevocationService {
    authorizations: Arc<dyn AuthorizationStore>,
}

impl TokenRevocationService {
    /// Creates a new revocation service
    #[must_use]
    pub fn new(authorizations: Arc<dyn AuthorizationStore>) -> Self {
        Self { authorizations }
    }

    /// Revoke `request.token` on behalf of the authenticated client
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` for a missing or unsupported hint and
    /// `invalid_client` when the token belongs to another client
    pub async fn revoke(
        &self,
        request: &RevocationRequest,
        context: &GrantContext,
    ) -> Result<RevocationOutcome, OAuth2Error> {
        let found = match request.token_type_hint.as_deref() {
            Some(ACCESS_TOKEN) => {
                trace!("Access token revocation is a no-op");
                return Ok(RevocationOutcome::Ignored);
            }
            Some(REFRESH_TOKEN) => {
                self.authorizations
                    .find_by_refresh_token(&request.token)
                    .await?
            }
            _ => {
                return Err(OAuth2Error::invalid_request(
                    "OAuth 2.0 Parameter: token_type_hint",
                ))
            }
        };

        let Some(authorization) = found else {
            trace!("Token not found; revocation still succeeds");
            return Ok(RevocationOutcome::NotFound);
        };

        if authorization.registered_client_id != context.client.id {
            return Err(OAuth2Error::invalid_client());
        }

        self.authorizations.remove(&authorization.id).await?;
        info!(
            authorization_id = %authorization.id,
            client_id = %context.client.client_id,
            "Refresh token revoked"
        );
        Ok(RevocationOutcome::Revoked)
    }
}
