// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Grant types, scopes, token settings, key-value prefixes, and server defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// OAuth 2.0 grant type identifiers
pub mod grant_types {
    /// Resource-owner password grant with account status checks
    pub const ORIGIN_PASSWORD: &str = "origin_password";
    /// Refresh grant with rotation
    pub const ORIGIN_REFRESH_TOKEN: &str = "origin_refresh_token";
    /// Returns the current token pair without regeneration
    pub const ORIGIN_REISSUE_TOKEN: &str = "origin_reissue_token";
    /// Standard authorization code grant (registered, not handled)
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    /// Standard refresh grant name, accepted as an alias entitlement
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Token type hints accepted by the revocation endpoint (RFC 7009)
pub mod token_type_hints {
    /// Access token hint
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Refresh token hint
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Well-known scopes
pub mod scopes {
    /// OpenID Connect scope, triggers ID token issuance
    pub const OPENID: &str = "openid";
    /// OIDC profile scope
    pub const PROFILE: &str = "profile";
    /// Required for account-wide token revocation and client administration
    pub const ADMIN: &str = "admin";
}

/// Client authentication methods
pub mod client_auth_methods {
    /// HTTP Basic client authentication
    pub const CLIENT_SECRET_BASIC: &str = "client_secret_basic";
    /// Form-body client authentication
    pub const CLIENT_SECRET_POST: &str = "client_secret_post";
    /// Mutual TLS with a CA-issued certificate
    pub const TLS_CLIENT_AUTH: &str = "tls_client_auth";
    /// Mutual TLS with a self-signed certificate
    pub const SELF_SIGNED_TLS_CLIENT_AUTH: &str = "self_signed_tls_client_auth";
}

/// Token lifetimes and formats
pub mod tokens {
    /// Default access token lifetime for newly registered clients (2 hours)
    pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;
    /// Default refresh token lifetime for newly registered clients (1 day)
    pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
    /// ID tokens always live for 30 minutes
    pub const ID_TOKEN_TTL_SECS: i64 = 30 * 60;
    /// Random bytes in an opaque refresh token
    pub const REFRESH_TOKEN_BYTES: usize = 96;
    /// Token type returned in token responses
    pub const BEARER: &str = "Bearer";
    /// Format marker for JWT access tokens
    pub const FORMAT_SELF_CONTAINED: &str = "self-contained";
    /// Format marker for opaque refresh tokens
    pub const FORMAT_REFERENCE: &str = "reference";
    /// Default redirect URI for bootstrap clients
    pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/login";
}

/// Key-value store layout
pub mod keys {
    /// Prefix of revoked-jti blacklist entries
    pub const JTI_PREFIX: &str = "jti:";
    /// Value stored for each blacklisted jti
    pub const JTI_REVOKED_VALUE: &str = "true";
    /// Revoked jti entries live for one day
    pub const BLACKLIST_TTL_SECS: u64 = 24 * 60 * 60;
    /// Session list TTL when token timestamps are unavailable
    pub const SESSION_FALLBACK_TTL_SECS: u64 = 60;

    /// Session list key for a user/client pair
    #[must_use]
    pub fn session_key(user_id: i64, client_id: &str) -> String {
        format!("user:{user_id}:{client_id}:tokens")
    }

    /// Blacklist key for a jti
    #[must_use]
    pub fn jti_key(jti: &str) -> String {
        format!("{JTI_PREFIX}{jti}")
    }
}

/// Session concurrency defaults
pub mod sessions {
    /// Cap applied to clients absent from the caps table
    pub const DEFAULT_SESSION_CAP: usize = 3;

    /// Built-in per-client caps, extended or overridden by `SESSION_CLIENT_CAPS`
    pub const BUILTIN_CLIENT_CAPS: &[(&str, usize)] = &[("clientA", 1), ("clientB", 5)];
}

/// Login event queue sizing
pub mod events {
    /// Resident workers
    pub const DEFAULT_MIN_WORKERS: usize = 2;
    /// Upper bound on workers while backlog persists
    pub const DEFAULT_MAX_WORKERS: usize = 10;
    /// Bounded backlog before events go to the dead-letter log
    pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
    /// Thread name prefix for event workers
    pub const WORKER_NAME_PREFIX: &str = "event-async-";
}

/// HTTP headers
pub mod headers {
    /// Correlation id header
    pub const REQUEST_ID: &str = "x-lz-request-id";
}

/// Network ports
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 9000;
}
