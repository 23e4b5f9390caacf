// ABOUTME: RSA signing keys and the JSON Web Key Set published to resource servers
// ABOUTME: Signs and verifies RS256 tokens with the key id carried in the JWT header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! # Signing Keys
//!
//! - RSA key pairs for RS256 signing, imported from PEM or generated at startup
//! - JWKS representation for `/oauth2/jwks`
//! - Verification resolves the key through the `kid` header so rotated keys keep
//!   validating until they are dropped
//!
//! ## Example
//!
//! ```rust,no_run
//! use inhibitor::tokens::keys::JwksManager;
//!
//! # fn example() -> inhibitor::errors::AppResult<()> {
//! let mut manager = JwksManager::new();
//! manager.generate_rsa_key_pair_with_size("key_2025_01", 2048)?;
//! let jwks = manager.get_jwks();
//! assert_eq!(jwks.keys.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fs;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::JwtConfig;
use crate::errors::{AppError, AppResult};

/// JWK (JSON Web Key) representation for JWKS endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type (always "RSA" for RS256)
    pub kty: String,
    /// Public key use (always "sig" for signature)
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key ID for rotation tracking
    pub kid: String,
    /// Algorithm (RS256)
    pub alg: String,
    /// RSA modulus (base64url encoded)
    pub n: String,
    /// RSA exponent (base64url encoded)
    pub e: String,
}

/// JWKS (JSON Web Key Set) container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of public keys
    pub keys: Vec<JsonWebKey>,
}

/// RSA key pair with metadata
#[derive(Clone)]
pub struct RsaKeyPair {
    /// Unique key identifier
    pub kid: String,
    /// Private key for signing
    pub private_key: RsaPrivateKey,
    /// Public key for verification
    pub public_key: RsaPublicKey,
    /// Key creation timestamp
    pub created_at: DateTime<Utc>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl RsaKeyPair {
    fn from_private_key(kid: &str, private_key: RsaPrivateKey) -> AppResult<Self> {
        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AppError::crypto(format!("Failed to export private key as PEM: {e}")))?;
        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AppError::crypto(format!("Failed to export public key as PEM: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AppError::crypto(format!("Failed to create encoding key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AppError::crypto(format!("Failed to create decoding key: {e}")))?;

        Ok(Self {
            kid: kid.to_owned(),
            private_key,
            public_key,
            created_at: Utc::now(),
            encoding_key,
            decoding_key,
        })
    }

    /// Generate an RSA key pair of the given size
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn generate_with_key_size(kid: &str, key_size_bits: usize) -> AppResult<Self> {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, key_size_bits)
            .map_err(|e| AppError::crypto(format!("Failed to generate RSA private key: {e}")))?;
        Self::from_private_key(kid, private_key)
    }

    /// Import a private key from PKCS#8 or PKCS#1 PEM
    ///
    /// # Errors
    /// Returns an error if the PEM cannot be parsed in either format
    pub fn import_private_key_pem(kid: &str, pem: &str) -> AppResult<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| AppError::crypto(format!("Failed to parse private key PEM: {e}")))?;
        Self::from_private_key(kid, private_key)
    }

    /// Convert public key to JWK format
    #[must_use]
    pub fn to_jwk(&self) -> JsonWebKey {
        let n = URL_SAFE_NO_PAD.encode(self.public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(self.public_key.e().to_bytes_be());

        JsonWebKey {
            kty: "RSA".to_owned(),
            key_use: "sig".to_owned(),
            kid: self.kid.clone(),
            alg: "RS256".to_owned(),
            n,
            e,
        }
    }

    /// Export private key as PEM
    ///
    /// # Errors
    /// Returns an error if PEM encoding fails
    pub fn export_private_key_pem(&self) -> AppResult<String> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| AppError::crypto(format!("Failed to export private key as PEM: {e}")))
    }

    /// Export public key as PEM
    ///
    /// # Errors
    /// Returns an error if PEM encoding fails
    pub fn export_public_key_pem(&self) -> AppResult<String> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AppError::crypto(format!("Failed to export public key as PEM: {e}")))
    }

    /// Encoding key for JWT signing
    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Decoding key for JWT verification
    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Key registry with a single active signing key
pub struct JwksManager {
    keys: HashMap<String, RsaKeyPair>,
    active_key_id: Option<String>,
}

impl JwksManager {
    /// Create an empty manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            active_key_id: None,
        }
    }

    /// Load the configured PEM key, or generate an ephemeral one
    ///
    /// # Errors
    /// Returns an error if the key file cannot be read or parsed, or generation fails
    pub fn from_config(config: &JwtConfig) -> AppResult<Self> {
        let mut manager = Self::new();
        if let Some(path) = &config.private_key_path {
            let pem = fs::read_to_string(path).map_err(|e| {
                AppError::config(format!(
                    "Failed to read signing key {}: {e}",
                    path.display()
                ))
            })?;
            manager.register_key(RsaKeyPair::import_private_key_pem(&config.key_id, &pem)?, true);
            info!(kid = %config.key_id, "Loaded RS256 signing key from {}", path.display());
        } else {
            warn!(
                kid = %config.key_id,
                bits = config.generated_key_bits,
                "No JWT_PRIVATE_KEY_PATH configured, generating an ephemeral signing key"
            );
            manager.generate_rsa_key_pair_with_size(&config.key_id, config.generated_key_bits)?;
        }
        Ok(manager)
    }

    /// Generate and activate a key pair
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn generate_rsa_key_pair_with_size(
        &mut self,
        kid: &str,
        key_size_bits: usize,
    ) -> AppResult<()> {
        let key_pair = RsaKeyPair::generate_with_key_size(kid, key_size_bits)?;
        self.register_key(key_pair, true);
        Ok(())
    }

    /// Register a key pair, optionally making it the signing key
    pub fn register_key(&mut self, key_pair: RsaKeyPair, active: bool) {
        if active {
            self.active_key_id = Some(key_pair.kid.clone());
        }
        self.keys.insert(key_pair.kid.clone(), key_pair);
    }

    /// Active signing key
    ///
    /// # Errors
    /// Returns an error if no active key exists
    pub fn get_active_key(&self) -> AppResult<&RsaKeyPair> {
        let kid = self
            .active_key_id
            .as_ref()
            .ok_or_else(|| AppError::crypto("No active signing key"))?;
        self.keys
            .get(kid)
            .ok_or_else(|| AppError::crypto(format!("Active key not found: {kid}")))
    }

    /// Key by id
    #[must_use]
    pub fn get_key(&self, kid: &str) -> Option<&RsaKeyPair> {
        self.keys.get(kid)
    }

    /// Public keys for distribution, sorted by key id
    #[must_use]
    pub fn get_jwks(&self) -> JsonWebKeySet {
        let mut keys: Vec<JsonWebKey> = self.keys.values().map(RsaKeyPair::to_jwk).collect();
        keys.sort_by(|a, b| a.kid.cmp(&b.kid));
        JsonWebKeySet { keys }
    }

    /// Sign claims with the active key
    ///
    /// # Errors
    /// Returns an error if no active key exists or signing fails
    pub fn sign<T: Serialize>(&self, claims: &T) -> AppResult<String> {
        let active_key = self.get_active_key()?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(active_key.kid.clone());

        encode(&header, claims, active_key.encoding_key())
            .map_err(|e| AppError::crypto(format!("Failed to encode RS256 JWT: {e}")))
    }

    /// Verify a token's signature and expiry and decode its claims
    ///
    /// Audience is not checked here: every client is its own audience.
    ///
    /// # Errors
    /// Returns `AuthInvalid` if the header, key id, signature, issuer or expiry is invalid
    pub fn verify<T: DeserializeOwned>(&self, token: &str, issuer: Option<&str>) -> AppResult<T> {
        let header = decode_header(token)
            .map_err(|e| AppError::auth_invalid(format!("Failed to decode JWT header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AppError::auth_invalid("JWT header missing kid"))?;
        let key_pair = self
            .get_key(&kid)
            .ok_or_else(|| AppError::auth_invalid(format!("Unknown key ID: {kid}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<T>(token, key_pair.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::auth_invalid(format!("Invalid token: {e}")))
    }
}

impl Default for JwksManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn manager() -> JwksManager {
        let mut manager = JwksManager::new();
        manager
            .generate_rsa_key_pair_with_size("test-key", 2048)
            .unwrap();
        manager
    }

    #[test]
    fn test_sign_and_verify() {
        let manager = manager();
        let exp = Utc::now().timestamp() + 60;
        let token = manager
            .sign(&json!({"sub": "alice", "exp": exp, "iss": "https://auth.test"}))
            .unwrap();

        let claims: Value = manager.verify(&token, Some("https://auth.test")).unwrap();
        assert_eq!(claims["sub"], "alice");

        let header = decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("test-key"));
    }

    #[test]
    fn test_verify_rejects_wrong_issuer_and_expired() {
        let manager = manager();
        let exp = Utc::now().timestamp() + 60;
        let token = manager
            .sign(&json!({"sub": "alice", "exp": exp, "iss": "https://a"}))
            .unwrap();
        assert!(manager.verify::<Value>(&token, Some("https://b")).is_err());

        let expired = manager
            .sign(&json!({"sub": "alice", "exp": Utc::now().timestamp() - 3600}))
            .unwrap();
        assert!(manager.verify::<Value>(&expired, None).is_err());
    }

    #[test]
    fn test_pem_round_trip_keeps_public_key() {
        let original = RsaKeyPair::generate_with_key_size("k1", 2048).unwrap();
        let pem = original.export_private_key_pem().unwrap();
        let imported = RsaKeyPair::import_private_key_pem("k1", &pem).unwrap();
        assert_eq!(original.to_jwk().n, imported.to_jwk().n);
        assert_eq!(imported.to_jwk().e, "AQAB");
        assert!(imported
            .export_public_key_pem()
            .unwrap()
            .starts_with("-----BEGIN PUBLIC KEY-----"));
    }
}
