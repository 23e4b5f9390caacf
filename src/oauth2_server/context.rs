// ABOUTME: Explicit per-request context handed to every grant provider
// ABOUTME: Carries the authenticated client, its authentication method, the clock, and the correlation id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use inhibitor_core::models::{RegisteredClient, UserPrincipal};

use crate::tokens::{TokenContext, TokenType};

/// Request-scoped inputs of a grant
///
/// A `GrantContext` only exists once client authentication has succeeded.
#[derive(Debug, Clone)]
pub struct GrantContext {
    /// Authenticated client
    pub client: RegisteredClient,
    /// Method the client authenticated with
    pub authentication_method: String,
    /// DER client certificate forwarded by the TLS terminator
    pub client_certificate: Option<Vec<u8>>,
    /// Request instant
    pub now: DateTime<Utc>,
    /// Correlation id of the HTTP request
    pub correlation_id: String,
}

impl GrantContext {
    /// Context for `client` at the current instant
    #[must_use]
    pub fn new(
        client: RegisteredClient,
        authentication_method: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            authentication_method: authentication_method.into(),
            client_certificate: None,
            now: Utc::now(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Attach the forwarded client certificate
    #[must_use]
    pub fn with_client_certificate(mut self, der: Option<Vec<u8>>) -> Self {
        self.client_certificate = der;
        self
    }

    /// Token generation context for `principal`
    #[must_use]
    pub fn token_context<'a>(
        &'a self,
        principal: &'a UserPrincipal,
        authorized_scopes: &'a BTreeSet<String>,
        grant_type: &'a str,
    ) -> TokenContext<'a> {
        TokenContext {
            token_type: TokenType::AccessToken,
            client: &self.client,
            principal,
            authorized_scopes,
            grant_type,
            client_authentication_method: &self.authentication_method,
            client_certificate: self.client_certificate.as_deref(),
            actors: &[],
        }
    }
}
