// ABOUTME: Main library entry point for the Inhibitor authorization server
// ABOUTME: OAuth2/OIDC token issuance with custom grants, session caps, and account-wide revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

#![deny(unsafe_code)]

//! # Inhibitor
//!
//! An OAuth 2.0 / OpenID Connect authorization server that issues RS256 access and
//! ID tokens through three custom grants (`origin_password`, `origin_refresh_token`,
//! `origin_reissue_token`) and revokes them individually or per account.
//!
//! ## Architecture
//!
//! - **`oauth2_server`**: client authentication, the ordered grant registry, grant
//!   providers, and revocation
//! - **tokens**: token codec, claim customizer chain, signing keys, jti blacklist
//! - **database**: `SQLite` stores for clients, authorizations, and accounts
//! - **kv**: key-value store (in-memory LRU or Redis) for session lists and the blacklist
//! - **events** / **sessions**: login-success queue and the session concurrency limiter
//! - **routes** / **middleware** / **server**: the axum HTTP surface
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use inhibitor::config::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     inhibitor::server::run(config).await
//! }
//! ```

/// Account lookup and password verification
pub mod accounts;

/// Environment configuration
pub mod config;

/// `SQLite` persistence
pub mod database;

/// Unified error types
pub mod errors;

/// Login-success event queue
pub mod events;

/// Key-value store backends
pub mod kv;

/// Structured logging setup
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// OAuth 2.0 authorization server
pub mod oauth2_server;

/// HTTP route groups
pub mod routes;

/// Server resources, router, and lifecycle
pub mod server;

/// Session concurrency limiter
pub mod sessions;

/// Token codec, keys, and blacklist
pub mod tokens;
