// ABOUTME: origin_reissue_token grant: returns the tokens already stored for a refresh token
// ABOUTME: Nothing is regenerated; the ID token is not reissued
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{check_refresh_ownership, stored_principal};
use crate::database::AuthorizationStore;
use crate::oauth2_server::context::GrantContext;
use crate::oauth2_server::dispatch::GrantProvider;
use crate::oauth2_server::models::{GrantRequest, OAuth2Error, RefreshGrantRequest, TokenResult};

/// Reissue grant provider
pub struct ReissueGrantProvider {
    authorizations: Arc<dyn AuthorizationStore>,
}

impl ReissueGrantProvider {
    /// Creates a new reissue grant provider
    #[must_use]
    pub fn new(authorizations: Arc<dyn AuthorizationStore>) -> Self {
        Self { authorizations }
    }

    async fn reissue(
        &self,
        request: RefreshGrantRequest,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error> {
        let found = self
            .authorizations
            .find_by_refresh_token(&request.refresh_token)
            .await?;
        let authorization = check_refresh_ownership(found, context)?;

        let access_token = authorization
            .access_token
            .clone()
            .ok_or_else(|| OAuth2Error::invalid_grant("Authorization has no access token"))?;
        let refresh_token = authorization
            .refresh_token
            .clone()
            .ok_or_else(|| OAuth2Error::invalid_grant("Authorization has no refresh token"))?;
        let provider_id = stored_principal(&authorization)?.user_id;

        debug!(
            authorization_id = %authorization.id,
            "ID token is not reissued"
        );
        info!(
            authorization_id = %authorization.id,
            client_id = %context.client.client_id,
            "Reissue grant succeeded"
        );

        Ok(TokenResult {
            client_id: context.client.client_id.clone(),
            provider_id,
            scopes: authorization.authorized_scopes,
            access_token,
            refresh_token: Some(refresh_token),
            id_token: None,
        })
    }
}

#[async_trait]
impl GrantProvider for ReissueGrantProvider {
    async fn authenticate(
        &self,
        request: GrantRequest,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error> {
        match request {
            GrantRequest::Reissue(request) => self.reissue(request, context).await,
            GrantRequest::Password(_) | GrantRequest::Refresh(_) => {
                Err(OAuth2Error::unsupported_grant_type())
            }
        }
    }
}
