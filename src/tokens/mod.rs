// ABOUTME: Token codec module: signing keys, claims, customizers, generation, and the jti blacklist
// ABOUTME: Grant providers depend on TokenGenerator; bearer authentication on JwksManager and TokenBlacklist
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

/// Revoked-jti blacklist
pub mod blacklist;
/// Claim set and decoded access-token claims
pub mod claims;
/// Claim customizer chain
pub mod customizer;
/// Access, refresh, and ID token generation
pub mod generator;
/// RSA keys and JWKS
pub mod keys;

pub use blacklist::TokenBlacklist;
pub use claims::{AccessTokenClaims, Actor, ClaimSet, TokenType};
pub use customizer::{ClaimCustomizer, ClaimCustomizerChain, TokenContext};
pub use generator::{IdTokenParams, TokenGenerator};
pub use keys::{JsonWebKeySet, JwksManager, RsaKeyPair};
