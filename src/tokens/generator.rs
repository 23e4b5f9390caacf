// ABOUTME: Builds signed JWT access and ID tokens and opaque refresh tokens
// ABOUTME: Every token passes through the claim customizer chain before it is sealed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use inhibitor_core::constants::tokens::{
    FORMAT_REFERENCE, FORMAT_SELF_CONTAINED, ID_TOKEN_TTL_SECS, REFRESH_TOKEN_BYTES,
};
use inhibitor_core::models::{IssuedToken, TokenMetadata};
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::Value;
use uuid::Uuid;

use super::claims::{ClaimSet, TokenType};
use super::customizer::{ClaimCustomizerChain, TokenContext};
use super::keys::JwksManager;
use crate::errors::{AppError, AppResult};

/// OIDC values carried into an ID token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdTokenParams {
    /// Nonce from the authorization request
    pub nonce: Option<String>,
    /// Session id
    pub sid: Option<String>,
    /// Time of the original authentication (epoch seconds)
    pub auth_time: Option<i64>,
}

/// Token codec
pub struct TokenGenerator {
    keys: Arc<JwksManager>,
    issuer: Option<String>,
    customizers: ClaimCustomizerChain,
    rng: SystemRandom,
}

impl TokenGenerator {
    /// Generator signing with `keys` and customizing with `customizers`
    #[must_use]
    pub fn new(
        keys: Arc<JwksManager>,
        issuer: Option<String>,
        customizers: ClaimCustomizerChain,
    ) -> Self {
        Self {
            keys,
            issuer,
            customizers,
            rng: SystemRandom::new(),
        }
    }

    /// Signing keys
    #[must_use]
    pub fn keys(&self) -> &JwksManager {
        &self.keys
    }

    /// Configured `iss` claim
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    fn base_claims(
        &self,
        context: &TokenContext<'_>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> ClaimSet {
        let mut claims = ClaimSet::new();
        claims.insert_opt("iss", self.issuer.clone());
        claims.insert("sub", context.principal.username.clone());
        claims.insert("aud", vec![context.client.client_id.clone()]);
        claims.insert("iat", issued_at.timestamp());
        claims.insert("exp", expires_at.timestamp());
        claims.insert("jti", Uuid::new_v4().to_string());
        claims
    }

    fn seal(
        &self,
        claims: ClaimSet,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<IssuedToken> {
        let value = self.keys.sign(claims.as_map())?;
        Ok(IssuedToken {
            value,
            issued_at,
            expires_at: Some(expires_at),
            metadata: TokenMetadata {
                claims: Some(claims.into_map()),
                invalidated: false,
                format: Some(FORMAT_SELF_CONTAINED.to_owned()),
            },
        })
    }

    /// Signed access token living for the client's access TTL
    ///
    /// # Errors
    ///
    /// Returns an error if a customizer fails or signing fails
    pub fn generate_access_token(
        &self,
        context: &TokenContext<'_>,
        now: DateTime<Utc>,
    ) -> AppResult<IssuedToken> {
        let context = context.for_token(TokenType::AccessToken);
        let expires_at =
            now + Duration::seconds(context.client.token_settings.access_token_ttl_secs);

        let mut claims = self.base_claims(&context, now, expires_at);
        claims.insert("nbf", now.timestamp());
        claims.insert(
            "scope",
            context
                .authorized_scopes
                .iter()
                .cloned()
                .map(Value::String)
                .collect::<Vec<_>>(),
        );
        self.customizers.apply(&context, &mut claims)?;

        self.seal(claims, now, expires_at)
    }

    /// Opaque refresh token living for the client's refresh TTL
    ///
    /// The customized claims are kept in the token metadata only.
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails or a customizer fails
    pub fn generate_refresh_token(
        &self,
        context: &TokenContext<'_>,
        now: DateTime<Utc>,
    ) -> AppResult<IssuedToken> {
        let context = context.for_token(TokenType::RefreshToken);
        let mut bytes = [0_u8; REFRESH_TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::crypto("System RNG failure while generating refresh token"))?;
        let expires_at =
            now + Duration::seconds(context.client.token_settings.refresh_token_ttl_secs);

        let mut claims = ClaimSet::new();
        self.customizers.apply(&context, &mut claims)?;

        Ok(IssuedToken {
            value: URL_SAFE_NO_PAD.encode(bytes),
            issued_at: now,
            expires_at: Some(expires_at),
            metadata: TokenMetadata {
                claims: Some(claims.into_map()),
                invalidated: false,
                format: Some(FORMAT_REFERENCE.to_owned()),
            },
        })
    }

    /// Signed OIDC ID token living for 30 minutes
    ///
    /// # Errors
    ///
    /// Returns an error if a customizer fails or signing fails
    pub fn generate_id_token(
        &self,
        context: &TokenContext<'_>,
        params: &IdTokenParams,
        now: DateTime<Utc>,
    ) -> AppResult<IssuedToken> {
        let context = context.for_token(TokenType::IdToken);
        let expires_at = now + Duration::seconds(ID_TOKEN_TTL_SECS);

        let mut claims = self.base_claims(&context, now, expires_at);
        claims.insert("azp", context.client.client_id.clone());
        claims.insert_opt("nonce", params.nonce.clone());
        claims.insert_opt("sid", params.sid.clone());
        claims.insert_opt("auth_time", params.auth_time);
        self.customizers.apply(&context, &mut claims)?;

        self.seal(claims, now, expires_at)
    }
}
