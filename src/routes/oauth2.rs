// ABOUTME: Token and revocation endpoints of the authorization server
// ABOUTME: Parses form bodies into token parameters and renders success or the error envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! OAuth 2.0 server routes
//!
//! Both endpoints read `application/x-www-form-urlencoded` bodies. JSON bodies are
//! rewritten to form encoding by [`json_to_form_middleware`] before they get here.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, PRAGMA};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{middleware, Json, Router};
use tracing::debug;

use crate::logging::AppLogger;
use crate::middleware::{json_to_form_middleware, RequestId};
use crate::oauth2_server::{OAuth2Error, TokenEndpointError, TokenParameters};
use crate::server::ServerResources;

/// `OAuth2` routes implementation
pub struct OAuth2Routes;

impl OAuth2Routes {
    /// Create the token and revocation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/oauth2/token", post(Self::handle_token))
            .route("/oauth2/revoke", post(Self::handle_revoke))
            .layer(middleware::from_fn(json_to_form_middleware))
            .with_state(resources)
    }

    /// Decode a form body into repeatable parameters
    fn parse_form(body: &[u8]) -> Result<TokenParameters, TokenEndpointError> {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
            .map(TokenParameters::from_pairs)
            .map_err(|e| {
                debug!("Rejected malformed form body: {e}");
                TokenEndpointError::from(OAuth2Error::invalid_request(
                    "Request body is not valid form encoding",
                ))
            })
    }

    /// Handle POST /oauth2/token
    async fn handle_token(
        State(resources): State<Arc<ServerResources>>,
        request_id: RequestId,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response, TokenEndpointError> {
        let params = Self::parse_form(&body)?;
        let grant_type = params.first("grant_type").unwrap_or("-").to_owned();

        let response = match resources
            .authorization_server
            .token(&headers, &params, request_id.as_str())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                AppLogger::log_grant_event("-", &grant_type, false, &format!("{e:?}"));
                return Err(e);
            }
        };

        AppLogger::log_grant_event(&response.client_id, &grant_type, true, "tokens issued");
        let mut response = Json(response).into_response();
        let response_headers = response.headers_mut();
        response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response_headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        Ok(response)
    }

    /// Handle POST /oauth2/revoke
    ///
    /// Unknown tokens still answer 200 with an empty body.
    async fn handle_revoke(
        State(resources): State<Arc<ServerResources>>,
        request_id: RequestId,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<StatusCode, TokenEndpointError> {
        let params = Self::parse_form(&body)?;
        let outcome = resources
            .authorization_server
            .revoke(&headers, &params, request_id.as_str())
            .await?;
        debug!(?outcome, "Revocation request handled");
        Ok(StatusCode::OK)
    }
}
