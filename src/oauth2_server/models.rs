// ABOUTME: OAuth 2.0 token endpoint data models: parameters, typed grant requests, results, and errors
// ABOUTME: OAuth2Error carries the RFC 6749 error token and an optional internal response code
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::collections::{BTreeSet, HashMap};
use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
use inhibitor_core::constants::tokens::BEARER;
use inhibitor_core::models::IssuedToken;
use serde::{Deserialize, Serialize};

use super::errors::ResponseCode;

const RFC6749_TOKEN_ERRORS: &str = "https://datatracker.ietf.org/doc/html/rfc6749#section-5.2";

/// OAuth 2.0 Error Response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    pub error_description: Option<String>,
    /// URI for error information
    pub error_uri: Option<String>,
    /// Internal code overriding the mapping from `error`
    #[serde(skip)]
    pub response_code: Option<ResponseCode>,
}

impl OAuth2Error {
    fn new(error: &str, description: impl Into<String>, uri: &str) -> Self {
        Self {
            error: error.to_owned(),
            error_description: Some(description.into()),
            error_uri: Some(uri.to_owned()),
            response_code: None,
        }
    }

    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self::new("invalid_request", description, RFC6749_TOKEN_ERRORS)
    }

    /// Create an `invalid_client` error
    #[must_use]
    pub fn invalid_client() -> Self {
        Self::new(
            "invalid_client",
            "Client authentication failed",
            RFC6749_TOKEN_ERRORS,
        )
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(description: &str) -> Self {
        Self::new("invalid_grant", description, RFC6749_TOKEN_ERRORS)
    }

    /// Create an `invalid_scope` error
    #[must_use]
    pub fn invalid_scope(description: &str) -> Self {
        Self::new("invalid_scope", description, RFC6749_TOKEN_ERRORS)
    }

    /// Create an `unauthorized_client` error
    #[must_use]
    pub fn unauthorized_client(description: &str) -> Self {
        Self::new("unauthorized_client", description, RFC6749_TOKEN_ERRORS)
    }

    /// Create an `unsupported_grant_type` error
    #[must_use]
    pub fn unsupported_grant_type() -> Self {
        Self::new(
            "unsupported_grant_type",
            "Grant type not supported",
            RFC6749_TOKEN_ERRORS,
        )
    }

    /// Create a `server_error`; the description never carries internal details
    #[must_use]
    pub fn server_error() -> Self {
        Self::new(
            "server_error",
            "The authorization server encountered an unexpected condition",
            RFC6749_TOKEN_ERRORS,
        )
    }

    /// Unknown username
    #[must_use]
    pub fn user_not_found() -> Self {
        Self::new("invalid_grant", "User not found", RFC6749_TOKEN_ERRORS)
            .with_response_code(ResponseCode::UserNotFound)
    }

    /// Wrong password
    #[must_use]
    pub fn incorrect_password() -> Self {
        Self::new("invalid_grant", "Incorrect password", RFC6749_TOKEN_ERRORS)
            .with_response_code(ResponseCode::UserIncorrectPassword)
    }

    /// Account locked, disabled, expired, or with expired credentials
    #[must_use]
    pub fn account_status(description: &str) -> Self {
        Self::new("invalid_grant", description, RFC6749_TOKEN_ERRORS)
            .with_response_code(ResponseCode::UserAccountStatus)
    }

    /// Attach an internal response code
    #[must_use]
    pub const fn with_response_code(mut self, code: ResponseCode) -> Self {
        self.response_code = Some(code);
        self
    }
}

impl fmt::Display for OAuth2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {description}", self.error),
            None => f.write_str(&self.error),
        }
    }
}

impl StdError for OAuth2Error {}

/// Raw token endpoint parameters, multi-valued as sent
#[derive(Debug, Clone, Default)]
pub struct TokenParameters {
    values: HashMap<String, Vec<String>>,
}

impl TokenParameters {
    /// Collect decoded form pairs
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            values.entry(key).or_default().push(value);
        }
        Self { values }
    }

    /// First value of a parameter
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// A parameter that must appear at most once
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the parameter is repeated
    pub fn single(&self, name: &str) -> Result<Option<&str>, OAuth2Error> {
        match self.values.get(name).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([value]) => Ok(Some(value.as_str())),
            Some(_) => Err(OAuth2Error::invalid_request(&format!(
                "OAuth 2.0 Parameter: {name}"
            ))),
        }
    }

    /// A non-blank parameter that must appear exactly once
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the parameter is missing, blank, or repeated
    pub fn required(&self, name: &str) -> Result<&str, OAuth2Error> {
        self.single(name)?
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| OAuth2Error::invalid_request(&format!("OAuth 2.0 Parameter: {name}")))
    }

    /// Space-delimited `scope` parameter
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if `scope` is repeated
    pub fn scopes(&self) -> Result<BTreeSet<String>, OAuth2Error> {
        Ok(parse_scopes(self.single("scope")?.unwrap_or_default()))
    }
}

/// Split a space-delimited scope string
#[must_use]
pub fn parse_scopes(raw: &str) -> BTreeSet<String> {
    raw.split_whitespace().map(ToOwned::to_owned).collect()
}

/// `origin_password` request
#[derive(Debug, Clone)]
pub struct PasswordGrantRequest {
    /// Login name
    pub username: String,
    /// Supplied password, may be absent
    pub password: Option<String>,
    /// Requested scopes
    pub scopes: BTreeSet<String>,
    /// OIDC nonce
    pub nonce: Option<String>,
}

/// `origin_refresh_token` and `origin_reissue_token` request
#[derive(Debug, Clone)]
pub struct RefreshGrantRequest {
    /// Submitted refresh token
    pub refresh_token: String,
    /// Requested scope subset
    pub scopes: BTreeSet<String>,
}

/// Typed grant request produced by a converter
#[derive(Debug, Clone)]
pub enum GrantRequest {
    /// Password grant
    Password(PasswordGrantRequest),
    /// Refresh grant
    Refresh(RefreshGrantRequest),
    /// Reissue grant
    Reissue(RefreshGrantRequest),
}

/// Successful grant outcome
#[derive(Debug, Clone)]
pub struct TokenResult {
    /// Public client id
    pub client_id: String,
    /// Account id, returned as `provider_id`
    pub provider_id: i64,
    /// Scopes of the access token
    pub scopes: BTreeSet<String>,
    /// Access token
    pub access_token: IssuedToken,
    /// Refresh token
    pub refresh_token: Option<IssuedToken>,
    /// ID token when `openid` was granted
    pub id_token: Option<IssuedToken>,
}

/// Token endpoint success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token (JWT)
    pub access_token: String,
    /// Refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Public client id
    #[serde(rename = "clientId")]
    pub client_id: String,
    /// Space-delimited scopes
    pub scope: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    /// Account id
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// OIDC ID token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Render a grant result, with `expires_in` measured from `now`
    #[must_use]
    pub fn from_result(result: TokenResult, now: DateTime<Utc>) -> Self {
        let expires_in = result
            .access_token
            .expires_at
            .map_or(0, |exp| (exp - now).num_seconds().max(0));
        Self {
            access_token: result.access_token.value,
            refresh_token: result.refresh_token.map(|t| t.value),
            client_id: result.client_id,
            scope: result.scopes.into_iter().collect::<Vec<_>>().join(" "),
            token_type: BEARER.to_owned(),
            expires_in,
            user_id: result.provider_id,
            id_token: result.id_token.map(|t| t.value),
        }
    }
}

/// Revocation request body
#[derive(Debug, Clone, Deserialize)]
pub struct RevocationRequest {
    /// Token to revoke
    pub token: String,
    /// `access_token` or `refresh_token`
    pub token_type_hint: Option<String>,
}
