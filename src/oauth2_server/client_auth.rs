// ABOUTME: Token and revocation endpoint client authentication
// ABOUTME: Supports client_secret_basic, client_secret_post, and proxy-forwarded TLS client certificates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use inhibitor_core::constants::client_auth_methods::{
    CLIENT_SECRET_BASIC, CLIENT_SECRET_POST, SELF_SIGNED_TLS_CLIENT_AUTH, TLS_CLIENT_AUTH,
};
use inhibitor_core::models::RegisteredClient;
use tracing::{debug, warn};
use x509_parser::parse_x509_certificate;

use super::client_registration::ClientRegistrationManager;
use super::errors::TokenEndpointError;
use super::models::TokenParameters;
use crate::database::RegisteredClientStore;

/// Header carrying the base64 DER client certificate from the TLS terminator
pub const CLIENT_CERTIFICATE_HEADER: &str = "x-client-certificate";

/// Credentials presented by the caller, before verification
#[derive(Debug, Clone, PartialEq, Eq)]
enum PresentedCredentials {
    Secret {
        client_id: String,
        client_secret: String,
        method: &'static str,
    },
    Certificate {
        client_id: String,
        der: Vec<u8>,
    },
}

/// A verified client
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// Registered client
    pub client: RegisteredClient,
    /// Method that succeeded
    pub method: String,
    /// DER certificate for TLS methods
    pub certificate: Option<Vec<u8>>,
}

/// Verifies client credentials against the registered client store
#[derive(Clone)]
pub struct ClientAuthenticator {
    clients: Arc<dyn RegisteredClientStore>,
}

impl ClientAuthenticator {
    /// Authenticator over `clients`
    #[must_use]
    pub fn new(clients: Arc<dyn RegisteredClientStore>) -> Self {
        Self { clients }
    }

    /// Authenticate the caller of a token or revocation request
    ///
    /// # Errors
    ///
    /// Returns `ClientAuthentication` for missing or malformed credentials,
    /// an unknown client, a method the client is not registered for, or a
    /// wrong secret. Store failures surface as a grant `server_error`.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        params: &TokenParameters,
    ) -> Result<AuthenticatedClient, TokenEndpointError> {
        let presented = presented_credentials(headers, params)?;
        let client_id = match &presented {
            PresentedCredentials::Secret { client_id, .. }
            | PresentedCredentials::Certificate { client_id, .. } => client_id.clone(),
        };

        let Some(client) = self.clients.find_client_by_client_id(&client_id).await? else {
            warn!(client_id = %client_id, "Unknown client");
            return Err(TokenEndpointError::ClientAuthentication);
        };

        match presented {
            PresentedCredentials::Secret {
                client_secret,
                method,
                ..
            } => {
                if !client.has_authentication_method(method) {
                    warn!(client_id = %client_id, method, "Client not registered for method");
                    return Err(TokenEndpointError::ClientAuthentication);
                }
                let Some(hash) = client.client_secret_hash.as_deref() else {
                    return Err(TokenEndpointError::ClientAuthentication);
                };
                if !ClientRegistrationManager::verify_client_secret(
                    &client_id,
                    &client_secret,
                    hash,
                ) {
                    return Err(TokenEndpointError::ClientAuthentication);
                }
                debug!(client_id = %client_id, method, "Client authenticated");
                Ok(AuthenticatedClient {
                    client,
                    method: method.to_owned(),
                    certificate: None,
                })
            }
            PresentedCredentials::Certificate { der, .. } => {
                let method = [TLS_CLIENT_AUTH, SELF_SIGNED_TLS_CLIENT_AUTH]
                    .into_iter()
                    .find(|m| client.has_authentication_method(m))
                    .ok_or(TokenEndpointError::ClientAuthentication)?;
                if parse_x509_certificate(&der).is_err() {
                    warn!(client_id = %client_id, "Forwarded client certificate is not valid DER");
                    return Err(TokenEndpointError::ClientAuthentication);
                }
                debug!(client_id = %client_id, method, "Client authenticated by certificate");
                Ok(AuthenticatedClient {
                    client,
                    method: method.to_owned(),
                    certificate: Some(der),
                })
            }
        }
    }
}

fn presented_credentials(
    headers: &HeaderMap,
    params: &TokenParameters,
) -> Result<PresentedCredentials, TokenEndpointError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| TokenEndpointError::ClientAuthentication)?;
        let (client_id, client_secret) =
            parse_basic(value).ok_or(TokenEndpointError::ClientAuthentication)?;
        return Ok(PresentedCredentials::Secret {
            client_id,
            client_secret,
            method: CLIENT_SECRET_BASIC,
        });
    }

    let client_id = params
        .first("client_id")
        .filter(|v| !v.is_empty())
        .ok_or(TokenEndpointError::ClientAuthentication)?
        .to_owned();

    if let Some(secret) = params.first("client_secret") {
        return Ok(PresentedCredentials::Secret {
            client_id,
            client_secret: secret.to_owned(),
            method: CLIENT_SECRET_POST,
        });
    }

    let der = headers
        .get(CLIENT_CERTIFICATE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| STANDARD.decode(v.trim()).ok())
        .ok_or(TokenEndpointError::ClientAuthentication)?;
    Ok(PresentedCredentials::Certificate { client_id, der })
}

/// Split `Basic base64(id:secret)` into its parts
fn parse_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    if id.is_empty() {
        return None;
    }
    Some((id.to_owned(), secret.to_owned()))
}
