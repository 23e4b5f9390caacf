// ABOUTME: Internal response-code table and the failure handler for the token and revocation endpoints
// ABOUTME: Converts OAuth2 errors into the {status, error, description, code} JSON envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use super::models::OAuth2Error;
use crate::errors::{AppError, ErrorEnvelope};

/// Internal numeric codes surfaced in the `error` and `code` fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    /// Malformed or unmapped failure
    BadRequest,
    /// Stale, mismatched, or inactive grant
    InvalidGrant,
    /// Scope outside the client's registration
    InvalidScope,
    /// No converter recognized the grant type
    UnsupportedGrantType,
    /// Client authentication failed
    InvalidClient,
    /// Client not entitled to the grant type
    UnauthorizedClient,
    /// Unknown username
    UserNotFound,
    /// Wrong password
    UserIncorrectPassword,
    /// Locked, disabled, expired, or credentials expired
    UserAccountStatus,
    /// Token generation or binding failure
    ServerError,
}

impl ResponseCode {
    /// Numeric code as a string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "4000",
            Self::InvalidGrant => "4001",
            Self::InvalidScope => "4002",
            Self::UnsupportedGrantType => "4003",
            Self::InvalidClient => "4010",
            Self::UnauthorizedClient => "4011",
            Self::UserNotFound => "4100",
            Self::UserIncorrectPassword => "4101",
            Self::UserAccountStatus => "4102",
            Self::ServerError => "5000",
        }
    }

    /// Display-safe default description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::InvalidGrant => "The provided grant is invalid or expired",
            Self::InvalidScope => "The requested scope is invalid",
            Self::UnsupportedGrantType => "The grant type is not supported",
            Self::InvalidClient => "Client authentication failed",
            Self::UnauthorizedClient => "The client is not authorized for this grant type",
            Self::UserNotFound => "User not found",
            Self::UserIncorrectPassword => "Incorrect password",
            Self::UserAccountStatus => "The account cannot sign in",
            Self::ServerError => "Internal server error",
        }
    }

    /// Map an RFC 6749 error token, defaulting to `BadRequest`
    #[must_use]
    pub fn from_oauth2_error_code(error: &str) -> Self {
        match error {
            "invalid_grant" => Self::InvalidGrant,
            "invalid_scope" => Self::InvalidScope,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "invalid_client" => Self::InvalidClient,
            "unauthorized_client" => Self::UnauthorizedClient,
            "server_error" => Self::ServerError,
            _ => Self::BadRequest,
        }
    }
}

/// HTTP status for a grant failure
#[must_use]
pub fn grant_failure_status(error: &OAuth2Error) -> StatusCode {
    match error.error.as_str() {
        "invalid_client" => StatusCode::UNAUTHORIZED,
        "server_error" => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Envelope for a grant failure
#[must_use]
pub fn grant_failure_envelope(error: &OAuth2Error) -> ErrorEnvelope {
    let code = error
        .response_code
        .unwrap_or_else(|| ResponseCode::from_oauth2_error_code(&error.error));
    let description = error
        .error_description
        .clone()
        .unwrap_or_else(|| code.description().to_owned());
    ErrorEnvelope::new(
        grant_failure_status(error).as_u16(),
        code.as_str(),
        description,
        code.as_str(),
    )
}

/// Failures at the token and revocation endpoints
#[derive(Debug, Clone, Error)]
pub enum TokenEndpointError {
    /// Basic header missing or malformed, unknown client, or wrong secret
    #[error("client authentication failed")]
    ClientAuthentication,
    /// A grant provider or converter rejected the request
    #[error("grant rejected: {}", .0.error)]
    Grant(OAuth2Error),
}

impl From<OAuth2Error> for TokenEndpointError {
    fn from(error: OAuth2Error) -> Self {
        Self::Grant(error)
    }
}

impl From<AppError> for OAuth2Error {
    fn from(error: AppError) -> Self {
        error!(code = ?error.code, "Grant processing failed: {error}");
        Self::server_error()
    }
}

impl From<AppError> for TokenEndpointError {
    fn from(error: AppError) -> Self {
        Self::Grant(OAuth2Error::from(error))
    }
}

impl TokenEndpointError {
    /// Envelope and status
    #[must_use]
    pub fn envelope(&self) -> (StatusCode, ErrorEnvelope) {
        match self {
            Self::ClientAuthentication => (
                StatusCode::UNAUTHORIZED,
                ErrorEnvelope::new(401, "401", "invalid_client", "401"),
            ),
            Self::Grant(error) => (grant_failure_status(error), grant_failure_envelope(error)),
        }
    }
}

impl IntoResponse for TokenEndpointError {
    fn into_response(self) -> Response {
        let (status, envelope) = self.envelope();
        if status.is_server_error() {
            error!(status = status.as_u16(), code = %envelope.code, "Token endpoint failure");
        } else {
            warn!(
                status = status.as_u16(),
                code = %envelope.code,
                description = %envelope.description,
                "Token endpoint request rejected"
            );
        }
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_failure_mapping() {
        let (status, envelope) = TokenEndpointError::from(OAuth2Error::invalid_scope("x")).envelope();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.status, "400");
        assert_eq!(envelope.error, "4002");
        assert_eq!(envelope.code, "4002");
        assert_eq!(envelope.description, "x");

        let (status, envelope) = TokenEndpointError::from(OAuth2Error::invalid_client()).envelope();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(envelope.code, "4010");

        let (status, envelope) = TokenEndpointError::from(OAuth2Error::server_error()).envelope();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope.code, "5000");
    }

    #[test]
    fn test_account_errors_use_internal_codes() {
        let (status, envelope) =
            TokenEndpointError::from(OAuth2Error::account_status("User account is locked"))
                .envelope();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.code, "4102");
        assert_eq!(envelope.description, "User account is locked");

        let (_, envelope) = TokenEndpointError::from(OAuth2Error::user_not_found()).envelope();
        assert_eq!(envelope.error, "4100");
    }

    #[test]
    fn test_unmapped_error_defaults_to_bad_request() {
        let error = OAuth2Error {
            error: "temporarily_unavailable".to_owned(),
            error_description: None,
            error_uri: None,
            response_code: None,
        };
        let envelope = grant_failure_envelope(&error);
        assert_eq!(envelope.code, "4000");
        assert_eq!(envelope.description, "Bad request");
        assert_eq!(
            grant_failure_envelope(&OAuth2Error::invalid_request("missing")).code,
            "4000"
        );
    }

    #[test]
    fn test_client_authentication_failure_envelope() {
        let (status, envelope) = TokenEndpointError::ClientAuthentication.envelope();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            envelope,
            ErrorEnvelope::new(401, "401", "invalid_client", "401")
        );
    }

    #[test]
    fn test_server_error_hides_internal_detail() {
        let error = OAuth2Error::from(AppError::crypto("key file /etc/secret.pem unreadable"));
        let envelope = grant_failure_envelope(&error);
        assert!(!envelope.description.contains("secret.pem"));
    }
}
