// ABOUTME: Public key set and OpenID provider metadata
// ABOUTME: Lets resource servers verify RS256 access tokens without sharing secrets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use inhibitor_core::constants::client_auth_methods::{
    CLIENT_SECRET_BASIC, CLIENT_SECRET_POST, SELF_SIGNED_TLS_CLIENT_AUTH, TLS_CLIENT_AUTH,
};
use inhibitor_core::constants::scopes::{ADMIN, OPENID, PROFILE};
use serde::Serialize;

use crate::server::ServerResources;
use crate::tokens::JsonWebKeySet;

/// OpenID provider metadata
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetadata {
    /// Issuer identifier
    pub issuer: String,
    /// Token endpoint
    pub token_endpoint: String,
    /// Revocation endpoint
    pub revocation_endpoint: String,
    /// Key set endpoint
    pub jwks_uri: String,
    /// Grant types dispatched by the token endpoint
    pub grant_types_supported: Vec<String>,
    /// Well-known scopes
    pub scopes_supported: Vec<String>,
    /// Client authentication methods at the token endpoint
    pub token_endpoint_auth_methods_supported: Vec<String>,
    /// Signing algorithms of ID tokens
    pub id_token_signing_alg_values_supported: Vec<String>,
    /// Subject identifier types
    pub subject_types_supported: Vec<String>,
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

/// Discovery routes
pub struct DiscoveryRoutes;

impl DiscoveryRoutes {
    /// Create the key set and metadata routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/oauth2/jwks", get(Self::handle_jwks))
            .route(
                "/.well-known/openid-configuration",
                get(Self::handle_configuration),
            )
            .with_state(resources)
    }

    async fn handle_jwks(State(resources): State<Arc<ServerResources>>) -> Json<JsonWebKeySet> {
        Json(resources.jwks.get_jwks())
    }

    async fn handle_configuration(
        State(resources): State<Arc<ServerResources>>,
    ) -> Json<ProviderMetadata> {
        let config = &resources.config;
        let issuer = config.jwt.issuer.clone().unwrap_or_else(|| {
            format!("http://{}:{}", config.host, config.http_port)
        });

        Json(ProviderMetadata {
            token_endpoint: format!("{issuer}/oauth2/token"),
            revocation_endpoint: format!("{issuer}/oauth2/revoke"),
            jwks_uri: format!("{issuer}/oauth2/jwks"),
            issuer,
            grant_types_supported: to_strings(&resources.authorization_server.grant_types()),
            scopes_supported: to_strings(&[OPENID, PROFILE, ADMIN]),
            token_endpoint_auth_methods_supported: to_strings(&[
                CLIENT_SECRET_BASIC,
                CLIENT_SECRET_POST,
                TLS_CLIENT_AUTH,
                SELF_SIGNED_TLS_CLIENT_AUTH,
            ]),
            id_token_signing_alg_values_supported: to_strings(&["RS256"]),
            subject_types_supported: to_strings(&["public"]),
        })
    }
}
