// ABOUTME: origin_password grant: resource-owner credentials exchanged for access, refresh, and ID tokens
// ABOUTME: Publishes a login-success event once the authorization is stored
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use async_trait::async_trait;
use inhibitor_core::constants::grant_types::ORIGIN_PASSWORD;
use inhibitor_core::constants::scopes::OPENID;
use inhibitor_core::models::{Authorization, AuthorizationAttributes, UserPrincipal};
use tracing::{info, warn};
use uuid::Uuid;

use super::require_grant_type;
use crate::accounts::AccountService;
use crate::database::AuthorizationStore;
use crate::events::{EventBus, LoginSucceeded};
use crate::oauth2_server::context::GrantContext;
use crate::oauth2_server::dispatch::GrantProvider;
use crate::oauth2_server::models::{GrantRequest, OAuth2Error, PasswordGrantRequest, TokenResult};
use crate::tokens::{IdTokenParams, TokenGenerator};

/// Password grant provider
pub struct PasswordGrantProvider {
    accounts: AccountService,
    authorizations: Arc<dyn AuthorizationStore>,
    tokens: Arc<TokenGenerator>,
    events: Option<Arc<EventBus>>,
}

impl PasswordGrantProvider {
    /// Provider publishing login events to `events` when set
    #[must_use]
    pub fn new(
        accounts: AccountService,
        authorizations: Arc<dyn AuthorizationStore>,
        tokens: Arc<TokenGenerator>,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            accounts,
            authorizations,
            tokens,
            events,
        }
    }

    fn pre_authentication_checks(principal: &UserPrincipal) -> Result<(), OAuth2Error> {
        if !principal.is_account_non_locked() {
            return Err(OAuth2Error::account_status("User account is locked"));
        }
        if !principal.is_enabled() {
            return Err(OAuth2Error::account_status("User is disabled"));
        }
        if !principal.is_account_non_expired() {
            return Err(OAuth2Error::account_status("User account has expired"));
        }
        Ok(())
    }

    async fn authenticate_password(
        &self,
        request: PasswordGrantRequest,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error> {
        let client = &context.client;
        require_grant_type(client, ORIGIN_PASSWORD)?;

        if !client.allows_scopes(&request.scopes) {
            return Err(OAuth2Error::invalid_scope(
                "Requested scope is not registered for the client",
            ));
        }

        let principal = self
            .accounts
            .load_user_by_username(&request.username)
            .await?
            .ok_or_else(OAuth2Error::user_not_found)?;

        Self::pre_authentication_checks(&principal)?;

        let check = self
            .accounts
            .check_password(&principal, request.password.as_deref())
            .await?;
        if !check.is_accepted() {
            warn!(
                username = %principal.username,
                client_id = %client.client_id,
                "Password mismatch"
            );
            return Err(OAuth2Error::incorrect_password());
        }

        if !principal.is_credentials_non_expired() {
            return Err(OAuth2Error::account_status("User credentials have expired"));
        }

        let scopes = request.scopes;
        let token_context = context.token_context(&principal, &scopes, ORIGIN_PASSWORD);
        let access_token = self
            .tokens
            .generate_access_token(&token_context, context.now)?;
        let refresh_token = self
            .tokens
            .generate_refresh_token(&token_context, context.now)?;

        let sid = Uuid::new_v4().to_string();
        let id_token = if scopes.contains(OPENID) {
            let params = IdTokenParams {
                nonce: request.nonce.clone(),
                sid: Some(sid.clone()),
                auth_time: Some(context.now.timestamp()),
            };
            Some(
                self.tokens
                    .generate_id_token(&token_context, &params, context.now)?,
            )
        } else {
            None
        };

        let authorization = Authorization {
            id: Uuid::new_v4().to_string(),
            registered_client_id: client.id.clone(),
            principal_name: principal.username.clone(),
            grant_type: ORIGIN_PASSWORD.to_owned(),
            authorized_scopes: scopes.clone(),
            attributes: AuthorizationAttributes {
                principal: Some(principal.clone()),
                grant_type: ORIGIN_PASSWORD.to_owned(),
                username: Some(request.username),
                requested_at: Some(context.now),
                nonce: request.nonce,
                sid: Some(sid),
            },
            access_token: Some(access_token.clone()),
            refresh_token: Some(refresh_token.clone()),
            id_token: id_token.clone(),
        };
        self.authorizations.save(&authorization).await?;

        info!(
            account_id = principal.user_id,
            client_id = %client.client_id,
            authorization_id = %authorization.id,
            "Password grant succeeded"
        );

        if let Some(events) = &self.events {
            events
                .publish(LoginSucceeded {
                    account_id: principal.user_id,
                    client_id: client.client_id.clone(),
                    access_token: access_token.value.clone(),
                    refresh_token: refresh_token.value.clone(),
                    access_token_ttl_secs: access_token.lifetime_secs(),
                    correlation_id: context.correlation_id.clone(),
                    occurred_at: context.now,
                })
                .await;
        }

        Ok(TokenResult {
            client_id: client.client_id.clone(),
            provider_id: principal.user_id,
            scopes,
            access_token,
            refresh_token: Some(refresh_token),
            id_token,
        })
    }
}

#[async_trait]
impl GrantProvider for PasswordGrantProvider {
    async fn authenticate(
        &self,
        request: GrantRequest,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error> {
        match request {
            GrantRequest::Password(request) => self.authenticate_password(request, context).await,
            GrantRequest::Refresh(_) | GrantRequest::Reissue(_) => {
                Err(OAuth2Error::unsupported_grant_type())
            }
        }
    }
}
