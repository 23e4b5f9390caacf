// ABOUTME: Token and revocation endpoint orchestration
// ABOUTME: Authenticates the client, builds the grant context, and dispatches to the grant registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use axum::http::HeaderMap;
use inhibitor_core::constants::grant_types::{
    ORIGIN_PASSWORD, ORIGIN_REFRESH_TOKEN, ORIGIN_REISSUE_TOKEN,
};

use super::client_auth::ClientAuthenticator;
use super::context::GrantContext;
use super::dispatch::GrantRegistry;
use super::errors::TokenEndpointError;
use super::grants::{
    PasswordGrantConverter, PasswordGrantProvider, RefreshGrantConverter, RefreshGrantProvider,
    ReissueGrantProvider,
};
use super::models::{RevocationRequest, TokenParameters, TokenResponse};
use super::revocation::{RevocationOutcome, TokenRevocationService};
use crate::accounts::AccountService;
use crate::database::{AuthorizationStore, RegisteredClientStore};
use crate::events::EventBus;
use crate::tokens::TokenGenerator;

/// OAuth 2.0 Authorization Server
pub struct OAuth2AuthorizationServer {
    authenticator: ClientAuthenticator,
    grants: GrantRegistry,
    revocation: TokenRevocationService,
}

impl OAuth2AuthorizationServer {
    /// Server with the three custom grants registered in order
    #[must_use]
    pub fn new(
        clients: Arc<dyn RegisteredClientStore>,
        authorizations: Arc<dyn AuthorizationStore>,
        accounts: AccountService,
        tokens: Arc<TokenGenerator>,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        let grants = GrantRegistry::new()
            .register(
                ORIGIN_PASSWORD,
                Arc::new(PasswordGrantConverter::new(ORIGIN_PASSWORD)),
                Arc::new(PasswordGrantProvider::new(
                    accounts.clone(),
                    authorizations.clone(),
                    tokens.clone(),
                    events,
                )),
            )
            .register(
                ORIGIN_REFRESH_TOKEN,
                Arc::new(RefreshGrantConverter::refresh(ORIGIN_REFRESH_TOKEN)),
                Arc::new(RefreshGrantProvider::new(
                    accounts,
                    authorizations.clone(),
                    tokens,
                )),
            )
            .register(
                ORIGIN_REISSUE_TOKEN,
                Arc::new(RefreshGrantConverter::reissue(ORIGIN_REISSUE_TOKEN)),
                Arc::new(ReissueGrantProvider::new(authorizations.clone())),
            );

        Self::with_registry(clients, authorizations, grants)
    }

    /// Server over an explicit grant registry
    #[must_use]
    pub fn with_registry(
        clients: Arc<dyn RegisteredClientStore>,
        authorizations: Arc<dyn AuthorizationStore>,
        grants: GrantRegistry,
    ) -> Self {
        Self {
            authenticator: ClientAuthenticator::new(clients),
            grants,
            revocation: TokenRevocationService::new(authorizations),
        }
    }

    /// Grant types accepted by the token endpoint
    #[must_use]
    pub fn grant_types(&self) -> Vec<&'static str> {
        self.grants.grant_types()
    }

    async fn grant_context(
        &self,
        headers: &HeaderMap,
        params: &TokenParameters,
        correlation_id: &str,
    ) -> Result<GrantContext, TokenEndpointError> {
        let client = self.authenticator.authenticate(headers, params).await?;
        Ok(
            GrantContext::new(client.client, client.method, correlation_id)
                .with_client_certificate(client.certificate),
        )
    }

    /// Handle token request (POST /oauth2/token)
    ///
    /// # Errors
    ///
    /// Returns `ClientAuthentication` when the client cannot be authenticated,
    /// otherwise the grant's OAuth2 error
    pub async fn token(
        &self,
        headers: &HeaderMap,
        params: &TokenParameters,
        correlation_id: &str,
    ) -> Result<TokenResponse, TokenEndpointError> {
        let context = self.grant_context(headers, params, correlation_id).await?;
        let result = self.grants.dispatch(params, &context).await?;
        Ok(TokenResponse::from_result(result, context.now))
    }

    /// Handle revocation request (POST /oauth2/revoke)
    ///
    /// # Errors
    ///
    /// Returns `ClientAuthentication` when the client cannot be authenticated,
    /// `invalid_request` for a missing token or unsupported hint, and
    /// `invalid_client` when the token belongs to another client
    pub async fn revoke(
        &self,
        headers: &HeaderMap,
        params: &TokenParameters,
        correlation_id: &str,
    ) -> Result<RevocationOutcome, TokenEndpointError> {
        let context = self.grant_context(headers, params, correlation_id).await?;
        let request = RevocationRequest {
            token: params.required("token")?.to_owned(),
            token_type_hint: params.single("token_type_hint")?.map(ToOwned::to_owned),
        };
        self.revocation
            .revoke(&request, &context)
            .await
            .map_err(TokenEndpointError::from)
    }
}

