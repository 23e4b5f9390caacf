// ABOUTME: Registered OAuth 2.0 client model with client and token settings
// ABOUTME: Used by the client store, client authentication, and every grant provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::tokens::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS};

/// Per-client behavior switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// PKCE required for the authorization code flow
    pub require_proof_key: bool,
    /// Bind access tokens to the mTLS client certificate (`cnf.x5t#S256`)
    pub tls_client_certificate_bound_access_tokens: bool,
}

/// Token lifetimes and rotation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSettings {
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
    /// Keep the same refresh token across refresh grants
    pub reuse_refresh_tokens: bool,
    /// Seconds before expiry at which clients should refresh, echoed as a claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_threshold_secs: Option<i64>,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            reuse_refresh_tokens: false,
            refresh_threshold_secs: None,
        }
    }
}

/// Stored OAuth 2.0 client registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredClient {
    /// Internal immutable id
    pub id: String,
    /// Human-facing unique client identifier
    pub client_id: String,
    /// When the client id was issued
    pub client_id_issued_at: DateTime<Utc>,
    /// Argon2 PHC hash of the client secret
    pub client_secret_hash: Option<String>,
    /// Display name
    pub client_name: String,
    /// Accepted client authentication methods
    pub authentication_methods: BTreeSet<String>,
    /// Grant types the client is entitled to
    pub grant_types: BTreeSet<String>,
    /// Registered redirect URIs
    pub redirect_uris: BTreeSet<String>,
    /// Scopes the client may request
    pub scopes: BTreeSet<String>,
    /// Behavior switches
    pub client_settings: ClientSettings,
    /// Lifetimes and rotation
    pub token_settings: TokenSettings,
}

impl RegisteredClient {
    /// Whether the client is entitled to the grant type
    #[must_use]
    pub fn has_grant_type(&self, grant_type: &str) -> bool {
        self.grant_types.contains(grant_type)
    }

    /// Whether every requested scope is registered for this client
    #[must_use]
    pub fn allows_scopes(&self, requested: &BTreeSet<String>) -> bool {
        requested.is_subset(&self.scopes)
    }

    /// Whether the client authenticates with the given method
    #[must_use]
    pub fn has_authentication_method(&self, method: &str) -> bool {
        self.authentication_methods.contains(method)
    }
}
