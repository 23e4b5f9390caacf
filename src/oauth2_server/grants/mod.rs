// ABOUTME: Custom grant types of the token endpoint: converters and shared provider checks
// ABOUTME: origin_password, origin_refresh_token, and origin_reissue_token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

/// `origin_password` provider
pub mod password;
/// `origin_refresh_token` provider
pub mod refresh;
/// `origin_reissue_token` provider
pub mod reissue;

use std::collections::BTreeSet;

use inhibitor_core::constants::grant_types::REFRESH_TOKEN;
use inhibitor_core::models::{Authorization, RegisteredClient, UserPrincipal};

use super::context::GrantContext;
use super::dispatch::GrantConverter;
use super::models::{
    GrantRequest, OAuth2Error, PasswordGrantRequest, RefreshGrantRequest, TokenParameters,
};

pub use password::PasswordGrantProvider;
pub use refresh::RefreshGrantProvider;
pub use reissue::ReissueGrantProvider;

/// Recognizes `grant_type=origin_password`
pub struct PasswordGrantConverter {
    grant_type: &'static str,
}

impl PasswordGrantConverter {
    /// Converter for `grant_type`
    #[must_use]
    pub const fn new(grant_type: &'static str) -> Self {
        Self { grant_type }
    }
}

impl GrantConverter for PasswordGrantConverter {
    fn convert(&self, params: &TokenParameters) -> Result<Option<GrantRequest>, OAuth2Error> {
        if params.first("grant_type") != Some(self.grant_type) {
            return Ok(None);
        }
        Ok(Some(GrantRequest::Password(PasswordGrantRequest {
            username: params.required("username")?.to_owned(),
            password: params.single("password")?.map(ToOwned::to_owned),
            scopes: params.scopes()?,
            nonce: params.single("nonce")?.map(ToOwned::to_owned),
        })))
    }
}

/// Recognizes a refresh-token based grant
pub struct RefreshGrantConverter {
    grant_type: &'static str,
    reissue: bool,
}

impl RefreshGrantConverter {
    /// `origin_refresh_token` style converter
    #[must_use]
    pub const fn refresh(grant_type: &'static str) -> Self {
        Self {
            grant_type,
            reissue: false,
        }
    }

    /// `origin_reissue_token` style converter
    #[must_use]
    pub const fn reissue(grant_type: &'static str) -> Self {
        Self {
            grant_type,
            reissue: true,
        }
    }
}

impl GrantConverter for RefreshGrantConverter {
    fn convert(&self, params: &TokenParameters) -> Result<Option<GrantRequest>, OAuth2Error> {
        if params.first("grant_type") != Some(self.grant_type) {
            return Ok(None);
        }
        let request = RefreshGrantRequest {
            refresh_token: params.required("refresh_token")?.to_owned(),
            scopes: params.scopes()?,
        };
        Ok(Some(if self.reissue {
            GrantRequest::Reissue(request)
        } else {
            GrantRequest::Refresh(request)
        }))
    }
}

/// The client must be registered for `grant_type`
pub(crate) fn require_grant_type(
    client: &RegisteredClient,
    grant_type: &str,
) -> Result<(), OAuth2Error> {
    if client.has_grant_type(grant_type) {
        Ok(())
    } else {
        Err(OAuth2Error::unauthorized_client(&format!(
            "Client is not authorized for grant type {grant_type}"
        )))
    }
}

/// Look up the authorization behind a refresh token and check its ownership
///
/// Covers the shared steps of the refresh and reissue grants: the token must
/// resolve, belong to the calling client, and the client must hold the
/// `refresh_token` grant.
pub(crate) fn check_refresh_ownership(
    authorization: Option<Authorization>,
    context: &GrantContext,
) -> Result<Authorization, OAuth2Error> {
    let authorization =
        authorization.ok_or_else(|| OAuth2Error::invalid_grant("Refresh token not found"))?;
    if authorization.registered_client_id != context.client.id {
        return Err(OAuth2Error::invalid_grant(
            "Refresh token was issued to another client",
        ));
    }
    require_grant_type(&context.client, REFRESH_TOKEN)?;
    Ok(authorization)
}

/// Requested scopes, or the authorized ones when none were requested
pub(crate) fn effective_scopes(
    requested: &BTreeSet<String>,
    authorized: &BTreeSet<String>,
) -> Result<BTreeSet<String>, OAuth2Error> {
    if requested.is_empty() {
        return Ok(authorized.clone());
    }
    if requested.is_subset(authorized) {
        Ok(requested.clone())
    } else {
        Err(OAuth2Error::invalid_scope(
            "Requested scope exceeds the authorized scope",
        ))
    }
}

/// Principal captured when the authorization was created
pub(crate) fn stored_principal(authorization: &Authorization) -> Result<&UserPrincipal, OAuth2Error> {
    authorization
        .attributes
        .principal
        .as_ref()
        .ok_or_else(|| OAuth2Error::invalid_request("Authorization has no principal"))
}
