// ABOUTME: Authorization record binding a principal, a client, and issued token material
// ABOUTME: Token metadata keeps the claim set so jti values can be recovered for revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::account::UserPrincipal;

/// Metadata persisted next to a token value
///
/// Field names follow the `metadata.token.*` layout so the stored JSON stays
/// readable by tooling that inspects the authorization table directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Claim set of a JWT token
    #[serde(
        rename = "metadata.token.claims",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub claims: Option<Map<String, Value>>,
    /// Set when the token was rotated away or revoked in place
    #[serde(rename = "metadata.token.invalidated", default)]
    pub invalidated: bool,
    /// `self-contained` or `reference`
    #[serde(
        rename = "metadata.token.format",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub format: Option<String>,
}

/// A token value with its lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    /// Serialized token
    pub value: String,
    /// Issue instant
    pub issued_at: DateTime<Utc>,
    /// Expiry instant, `None` means no expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Claims and flags
    pub metadata: TokenMetadata,
}

impl IssuedToken {
    /// Not invalidated and not expired at `now`
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.metadata.invalidated && self.expires_at.map_or(true, |exp| exp > now)
    }

    /// Look up a claim in the stored claim set
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.metadata.claims.as_ref().and_then(|c| c.get(name))
    }

    /// Lifetime in whole seconds, if both instants are known
    #[must_use]
    pub fn lifetime_secs(&self) -> Option<i64> {
        self.expires_at
            .map(|exp| (exp - self.issued_at).num_seconds())
            .filter(|secs| *secs > 0)
    }
}

/// Snapshot of the authenticated principal and the original request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationAttributes {
    /// Principal at authentication time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<UserPrincipal>,
    /// Grant type of the original request
    pub grant_type: String,
    /// Username submitted with the original request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// When the original request was authenticated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    /// OIDC nonce carried from the authorization request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// OIDC session id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

/// One issued grant
#[derive(Debug, Clone, PartialEq)]
pub struct Authorization {
    /// Generated id
    pub id: String,
    /// Internal id of the owning client
    pub registered_client_id: String,
    /// Username of the principal
    pub principal_name: String,
    /// Grant type that produced the record
    pub grant_type: String,
    /// Scopes granted
    pub authorized_scopes: BTreeSet<String>,
    /// Principal and request snapshot
    pub attributes: AuthorizationAttributes,
    /// JWT access token
    pub access_token: Option<IssuedToken>,
    /// Opaque refresh token
    pub refresh_token: Option<IssuedToken>,
    /// OIDC ID token
    pub id_token: Option<IssuedToken>,
}

impl Authorization {
    /// The `jti` claim of the stored access token
    #[must_use]
    pub fn access_token_jti(&self) -> Option<&str> {
        self.access_token
            .as_ref()
            .and_then(|t| t.claim("jti"))
            .and_then(Value::as_str)
    }

    /// The stored refresh token value
    #[must_use]
    pub fn refresh_token_value(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn token(expires_in: i64, invalidated: bool) -> IssuedToken {
        let now = Utc::now();
        IssuedToken {
            value: "value".to_owned(),
            issued_at: now,
            expires_at: Some(now + Duration::seconds(expires_in)),
            metadata: TokenMetadata {
                claims: None,
                invalidated,
                format: None,
            },
        }
    }

    #[test]
    fn test_token_activity() {
        let now = Utc::now();
        assert!(token(60, false).is_active(now));
        assert!(!token(60, true).is_active(now));
        assert!(!token(-1, false).is_active(now));
    }

    #[test]
    fn test_metadata_uses_dotted_keys() {
        let mut claims = Map::new();
        claims.insert("jti".to_owned(), json!("abc"));
        let metadata = TokenMetadata {
            claims: Some(claims),
            invalidated: false,
            format: Some("self-contained".to_owned()),
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["metadata.token.claims"]["jti"], "abc");
        assert_eq!(value["metadata.token.invalidated"], false);
    }

    #[test]
    fn test_lifetime_secs() {
        assert_eq!(token(120, false).lifetime_secs(), Some(120));
        let mut no_expiry = token(120, false);
        no_expiry.expires_at = None;
        assert_eq!(no_expiry.lifetime_secs(), None);
    }
}
