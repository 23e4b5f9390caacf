// ABOUTME: Route module organization for the authorization server HTTP endpoints
// ABOUTME: One route group per surface, each handed the shared server resources as state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! Route groups
//!
//! Each group exposes `routes(resources) -> Router` and keeps its handlers thin,
//! delegating to the services held by [`crate::server::ServerResources`].

/// Registered client administration
pub mod backoffice;
/// Key set and provider metadata
pub mod discovery;
/// Liveness and readiness probes
pub mod health;
/// Account-wide token revocation
pub mod internal;
/// Token and revocation endpoints
pub mod oauth2;

pub use backoffice::BackofficeRoutes;
pub use discovery::DiscoveryRoutes;
pub use health::HealthRoutes;
pub use internal::InternalRoutes;
pub use oauth2::OAuth2Routes;
