// ABOUTME: Ordered claim customizer chain applied to every generated token
// ABOUTME: Adds provider ids, certificate binding, actor chains, and refresh markers per token type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! # Claim Customizers
//!
//! Customizers run in the order they were given to [`ClaimCustomizerChain::new`].
//! Each one inspects the token type and the grant context and may add claims.
//! A customizer error aborts token generation.

use std::collections::BTreeSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use inhibitor_core::constants::client_auth_methods;
use inhibitor_core::models::{RegisteredClient, UserPrincipal};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;
use x509_parser::parse_x509_certificate;

use super::claims::{Actor, ClaimSet, TokenType};
use crate::errors::{AppError, AppResult};

/// Static marker placed on refresh-token claims
pub const REFRESH_CLAIM: &str = "refresh_claim";
/// Value of [`REFRESH_CLAIM`]
pub const REFRESH_CLAIM_VALUE: &str = "refresh_value";

/// Everything a customizer may inspect while a token is generated
#[derive(Debug, Clone, Copy)]
pub struct TokenContext<'a> {
    /// Token being generated
    pub token_type: TokenType,
    /// Client the token is issued to
    pub client: &'a RegisteredClient,
    /// Authenticated user
    pub principal: &'a UserPrincipal,
    /// Scopes granted to this token
    pub authorized_scopes: &'a BTreeSet<String>,
    /// Grant type being processed
    pub grant_type: &'a str,
    /// Method the client authenticated with
    pub client_authentication_method: &'a str,
    /// DER-encoded client certificate presented by a TLS-authenticated client
    pub client_certificate: Option<&'a [u8]>,
    /// Token-exchange actors, outermost first
    pub actors: &'a [Actor],
}

impl TokenContext<'_> {
    /// Same context for another token type
    #[must_use]
    pub const fn for_token(self, token_type: TokenType) -> Self {
        Self { token_type, ..self }
    }
}

/// One step of the claim pipeline
pub trait ClaimCustomizer: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Add or replace claims for the token described by `context`
    ///
    /// # Errors
    ///
    /// Returns an error when a promised claim cannot be produced
    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()>;
}

/// `providerId` on access tokens
pub struct ProviderIdCustomizer;

impl ClaimCustomizer for ProviderIdCustomizer {
    fn name(&self) -> &'static str {
        "provider_id"
    }

    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()> {
        if context.token_type == TokenType::AccessToken {
            claims.insert("providerId", context.principal.user_id);
        }
        Ok(())
    }
}

/// `refreshThreshold` on access tokens of clients that configure one
pub struct RefreshThresholdCustomizer;

impl ClaimCustomizer for RefreshThresholdCustomizer {
    fn name(&self) -> &'static str {
        "refresh_threshold"
    }

    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()> {
        if context.token_type == TokenType::AccessToken {
            claims.insert_opt(
                "refreshThreshold",
                context.client.token_settings.refresh_threshold_secs,
            );
        }
        Ok(())
    }
}

/// `cnf.x5t#S256` on access tokens of certificate-bound clients
pub struct CertificateBindingCustomizer;

impl CertificateBindingCustomizer {
    fn is_tls_method(method: &str) -> bool {
        method == client_auth_methods::TLS_CLIENT_AUTH
            || method == client_auth_methods::SELF_SIGNED_TLS_CLIENT_AUTH
    }
}

impl ClaimCustomizer for CertificateBindingCustomizer {
    fn name(&self) -> &'static str {
        "certificate_binding"
    }

    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()> {
        if context.token_type != TokenType::AccessToken
            || !Self::is_tls_method(context.client_authentication_method)
            || !context
                .client
                .client_settings
                .tls_client_certificate_bound_access_tokens
        {
            return Ok(());
        }

        let der = context.client_certificate.ok_or_else(|| {
            AppError::crypto("Certificate-bound client presented no client certificate")
        })?;
        let thumbprint = certificate_thumbprint(der)?;

        let mut cnf = Map::new();
        cnf.insert("x5t#S256".to_owned(), Value::String(thumbprint));
        claims.insert("cnf", Value::Object(cnf));
        Ok(())
    }
}

/// Base64url SHA-256 thumbprint of a DER certificate
///
/// # Errors
///
/// Returns a crypto error if the bytes are not a valid X.509 certificate
pub fn certificate_thumbprint(der: &[u8]) -> AppResult<String> {
    parse_x509_certificate(der)
        .map_err(|e| AppError::crypto(format!("Invalid client certificate: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(der)))
}

/// Nested `act` claim for token exchange
pub struct ActorChainCustomizer;

impl ClaimCustomizer for ActorChainCustomizer {
    fn name(&self) -> &'static str {
        "actor_chain"
    }

    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()> {
        if context.token_type != TokenType::AccessToken || context.actors.is_empty() {
            return Ok(());
        }

        let mut act: Option<Value> = None;
        for actor in context.actors.iter().rev() {
            let mut entry = Map::new();
            if let Some(issuer) = &actor.issuer {
                entry.insert("iss".to_owned(), json!(issuer));
            }
            entry.insert("sub".to_owned(), json!(actor.subject));
            if let Some(inner) = act.take() {
                entry.insert("act".to_owned(), inner);
            }
            act = Some(Value::Object(entry));
        }
        claims.insert_opt("act", act);
        Ok(())
    }
}

/// Static marker on refresh tokens
pub struct RefreshMarkerCustomizer;

impl ClaimCustomizer for RefreshMarkerCustomizer {
    fn name(&self) -> &'static str {
        "refresh_marker"
    }

    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()> {
        if context.token_type == TokenType::RefreshToken {
            claims.insert(REFRESH_CLAIM, REFRESH_CLAIM_VALUE);
        }
        Ok(())
    }
}

/// `userId` and `providerId` on ID tokens
pub struct IdTokenUserCustomizer;

impl ClaimCustomizer for IdTokenUserCustomizer {
    fn name(&self) -> &'static str {
        "id_token_user"
    }

    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()> {
        if context.token_type == TokenType::IdToken {
            claims.insert("userId", context.principal.user_id);
            claims.insert("providerId", context.principal.user_id);
        }
        Ok(())
    }
}

/// Customizers applied in order
pub struct ClaimCustomizerChain {
    customizers: Vec<Box<dyn ClaimCustomizer>>,
}

impl ClaimCustomizerChain {
    /// Chain over the given customizers
    #[must_use]
    pub fn new(customizers: Vec<Box<dyn ClaimCustomizer>>) -> Self {
        Self { customizers }
    }

    /// The chain used by the token endpoint
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(ProviderIdCustomizer),
            Box::new(RefreshThresholdCustomizer),
            Box::new(CertificateBindingCustomizer),
            Box::new(ActorChainCustomizer),
            Box::new(RefreshMarkerCustomizer),
            Box::new(IdTokenUserCustomizer),
        ])
    }

    /// Names in application order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.customizers.iter().map(|c| c.name()).collect()
    }

    /// Run every customizer, stopping at the first failure
    ///
    /// # Errors
    ///
    /// Returns the first customizer error
    pub fn apply(&self, context: &TokenContext<'_>, claims: &mut ClaimSet) -> AppResult<()> {
        for customizer in &self.customizers {
            customizer.customize(context, claims).map_err(|e| {
                warn!(
                    customizer = customizer.name(),
                    token_type = %context.token_type,
                    "Claim customization failed: {e}"
                );
                e
            })?;
        }
        Ok(())
    }
}

impl Default for ClaimCustomizerChain {
    fn default() -> Self {
        Self::standard()
    }
}
