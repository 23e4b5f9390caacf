// ABOUTME: Domain model module aggregating client, authorization, account and session types
// ABOUTME: Persisted through the store traits in the main crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! Core data models

/// Accounts and the authenticated principal projection
pub mod account;
/// Authorizations and issued token material
pub mod authorization;
/// Registered OAuth 2.0 clients
pub mod client;
/// Concurrent session records
pub mod session;

pub use account::{Account, AccountStatus, UserPrincipal};
pub use authorization::{
    Authorization, AuthorizationAttributes, IssuedToken, TokenMetadata,
};
pub use client::{ClientSettings, RegisteredClient, TokenSettings};
pub use session::SessionEntry;
