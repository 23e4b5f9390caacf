// ABOUTME: origin_refresh_token grant: new access token, refresh token rotation, ID token renewal
// ABOUTME: Rotation is a conditional update so a consumed refresh token can only be redeemed once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use async_trait::async_trait;
use inhibitor_core::constants::grant_types::REFRESH_TOKEN;
use inhibitor_core::constants::scopes::OPENID;
use inhibitor_core::models::IssuedToken;
use serde_json::Value;
use tracing::{info, warn};

use super::{check_refresh_ownership, effective_scopes, stored_principal};
use crate::accounts::AccountService;
use crate::database::AuthorizationStore;
use crate::oauth2_server::context::GrantContext;
use crate::oauth2_server::dispatch::GrantProvider;
use crate::oauth2_server::models::{GrantRequest, OAuth2Error, RefreshGrantRequest, TokenResult};
use crate::tokens::{IdTokenParams, TokenGenerator};

/// Refresh grant provider
pub struct RefreshGrantProvider {
    accounts: AccountService,
    authorizations: Arc<dyn AuthorizationStore>,
    tokens: Arc<TokenGenerator>,
}

impl RefreshGrantProvider {
    /// Creates a new refresh grant provider
    #[must_use]
    pub fn new(
        accounts: AccountService,
        authorizations: Arc<dyn AuthorizationStore>,
        tokens: Arc<TokenGenerator>,
    ) -> Self {
        Self {
            accounts,
            authorizations,
            tokens,
        }
    }

    async fn refresh(
        &self,
        request: RefreshGrantRequest,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error> {
        let found = self
            .authorizations
            .find_by_refresh_token(&request.refresh_token)
            .await?;
        let authorization = check_refresh_ownership(found, context)?;

        let current_refresh = authorization
            .refresh_token
            .clone()
            .filter(|t| t.is_active(context.now))
            .ok_or_else(|| OAuth2Error::invalid_grant("Refresh token is no longer active"))?;

        let scopes = effective_scopes(&request.scopes, &authorization.authorized_scopes)?;

        let stored = stored_principal(&authorization)?;
        let principal = self
            .accounts
            .load_user_by_id(stored.user_id)
            .await?
            .ok_or_else(OAuth2Error::user_not_found)?;

        let token_context = context.token_context(&principal, &scopes, REFRESH_TOKEN);
        let access_token = self
            .tokens
            .generate_access_token(&token_context, context.now)?;

        let refresh_token = if context.client.token_settings.reuse_refresh_tokens {
            current_refresh
        } else {
            self.tokens
                .generate_refresh_token(&token_context, context.now)?
        };

        let id_token = if authorization.authorized_scopes.contains(OPENID) {
            let params = previous_id_token_params(authorization.id_token.as_ref());
            Some(
                self.tokens
                    .generate_id_token(&token_context, &params, context.now)?,
            )
        } else {
            None
        };

        let mut updated = authorization.clone();
        updated.principal_name.clone_from(&principal.username);
        updated.access_token = Some(access_token.clone());
        updated.refresh_token = Some(refresh_token.clone());
        if id_token.is_some() {
            updated.id_token.clone_from(&id_token);
        }

        let saved = self
            .authorizations
            .save_if_refresh_token_matches(&updated, &request.refresh_token)
            .await?;
        if !saved {
            warn!(
                authorization_id = %authorization.id,
                client_id = %context.client.client_id,
                "Concurrent refresh lost the rotation race"
            );
            return Err(OAuth2Error::invalid_grant(
                "Refresh token was already redeemed",
            ));
        }

        info!(
            authorization_id = %authorization.id,
            client_id = %context.client.client_id,
            rotated = !context.client.token_settings.reuse_refresh_tokens,
            "Refresh grant succeeded"
        );

        Ok(TokenResult {
            client_id: context.client.client_id.clone(),
            provider_id: principal.user_id,
            scopes,
            access_token,
            refresh_token: Some(refresh_token),
            id_token,
        })
    }
}

/// `sid` and `auth_time` carried over from the previous ID token
fn previous_id_token_params(previous: Option<&IssuedToken>) -> IdTokenParams {
    let Some(previous) = previous else {
        return IdTokenParams::default();
    };
    IdTokenParams {
        nonce: None,
        sid: previous
            .claim("sid")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        auth_time: previous.claim("auth_time").and_then(Value::as_i64),
    }
}

#[async_trait]
impl GrantProvider for RefreshGrantProvider {
    async fn authenticate(
        &self,
        request: GrantRequest,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error> {
        match request {
            GrantRequest::Refresh(request) => self.refresh(request, context).await,
            GrantRequest::Password(_) | GrantRequest::Reissue(_) => {
                Err(OAuth2Error::unsupported_grant_type())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use inhibitor_core::models::TokenMetadata;
    use serde_json::{json, Map};

    use super::*;

    #[test]
    fn test_previous_id_token_params() {
        let mut claims = Map::new();
        claims.insert("sid".to_owned(), json!("session-1"));
        claims.insert("auth_time".to_owned(), json!(1_700_000_000));
        let token = IssuedToken {
            value: "id".to_owned(),
            issued_at: Utc::now(),
            expires_at: None,
            metadata: TokenMetadata {
                claims: Some(claims),
                ..TokenMetadata::default()
            },
        };
        let params = previous_id_token_params(Some(&token));
        assert_eq!(params.sid.as_deref(), Some("session-1"));
        assert_eq!(params.auth_time, Some(1_700_000_000));
        assert!(previous_id_token_params(None).sid.is_none());
    }
}
