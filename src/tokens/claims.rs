// ABOUTME: Claim set builder shared by the generator and the customizer chain
// ABOUTME: Also defines the decoded access-token claims used by bearer authentication
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of token being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Self-contained JWT access token
    AccessToken,
    /// Opaque refresh token
    RefreshToken,
    /// OIDC ID token
    IdToken,
}

impl TokenType {
    /// Wire name of the token type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::IdToken => "id_token",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable JWT claim set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    claims: Map<String, Value>,
}

impl ClaimSet {
    /// Empty claim set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a claim, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.claims.insert(name.into(), value.into());
    }

    /// Set a claim only when a value is present
    pub fn insert_opt(&mut self, name: impl Into<String>, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    /// Claim value by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Whether a claim is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Borrow the underlying map
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Consume into the underlying map
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.claims
    }
}

/// Token-exchange actor, nested into the `act` claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Issuer of the actor's token
    pub issuer: Option<String>,
    /// Subject of the actor's token
    pub subject: String,
}

/// Access-token claims read back by bearer authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Username
    pub sub: String,
    /// Client ids the token was issued to
    #[serde(default)]
    pub aud: Vec<String>,
    /// Expiry (epoch seconds)
    pub exp: i64,
    /// Issue time (epoch seconds)
    #[serde(default)]
    pub iat: i64,
    /// Token id
    #[serde(default)]
    pub jti: Option<String>,
    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,
    /// Granted scopes
    #[serde(default)]
    pub scope: Vec<String>,
    /// Account id
    #[serde(default, rename = "providerId")]
    pub provider_id: Option<i64>,
}

impl AccessTokenClaims {
    /// Whether the token carries a scope
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.iter().any(|s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_insert_opt_skips_none() {
        let mut claims = ClaimSet::new();
        claims.insert("sub", "alice");
        claims.insert_opt("nonce", None::<String>);
        claims.insert_opt("sid", Some("s-1"));

        assert!(!claims.contains("nonce"));
        assert_eq!(claims.get("sid"), Some(&json!("s-1")));
        assert_eq!(claims.into_map().len(), 2);
    }

    #[test]
    fn test_access_token_claims_decode() {
        let claims: AccessTokenClaims = serde_json::from_value(json!({
            "sub": "alice",
            "aud": ["inhibitor"],
            "exp": 10,
            "iat": 1,
            "jti": "abc",
            "scope": ["read", "admin"],
            "providerId": 7
        }))
        .unwrap();
        assert!(claims.has_scope("admin"));
        assert!(!claims.has_scope("write"));
        assert_eq!(claims.provider_id, Some(7));
    }
}
