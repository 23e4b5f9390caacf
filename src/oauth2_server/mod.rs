// ABOUTME: OAuth 2.0 authorization server with custom grant types
// ABOUTME: Client authentication, grant dispatch, grant providers, and token revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

/// Client authentication at the token and revocation endpoints
pub mod client_auth;
/// Registered client provisioning and administration
pub mod client_registration;
/// Per-request grant context
pub mod context;
/// Ordered converter/provider registry
pub mod dispatch;
/// Token and revocation endpoint orchestration
pub mod endpoints;
/// Response-code table and error envelope mapping
pub mod errors;
/// Custom grant converters and providers
pub mod grants;
/// OAuth 2.0 data models
pub mod models;
/// Principal-wide revocation
pub mod principal_revocation;
/// RFC 7009 revocation
pub mod revocation;

pub use client_auth::{AuthenticatedClient, ClientAuthenticator};
pub use client_registration::ClientRegistrationManager;
pub use context::GrantContext;
pub use dispatch::{GrantConverter, GrantProvider, GrantRegistry};
pub use endpoints::OAuth2AuthorizationServer;
pub use errors::{ResponseCode, TokenEndpointError};
pub use models::{
    GrantRequest, OAuth2Error, RevocationRequest, TokenParameters, TokenResponse, TokenResult,
};
pub use principal_revocation::{PrincipalRevocation, PrincipalRevocationService};
pub use revocation::{RevocationOutcome, TokenRevocationService};
