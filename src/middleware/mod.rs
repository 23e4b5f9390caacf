// ABOUTME: HTTP middleware for the authorization server
// ABOUTME: Request correlation, bearer authentication, CORS, and the JSON-to-form adapter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

/// Bearer token authentication
pub mod auth;
/// CORS configuration
pub mod cors;
/// JSON-to-form body adapter
pub mod json_form;
/// Request id and span middleware
pub mod tracing;

pub use auth::{AuthenticatedPrincipal, BearerAuthenticator};
pub use cors::setup_cors;
pub use json_form::json_to_form_middleware;
pub use tracing::{request_tracing_middleware, RequestId};
