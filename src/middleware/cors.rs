// ABOUTME: CORS layer configuration for the HTTP surface
// ABOUTME: Origins come from the CORS_ORIGINS setting; `*` or an empty list allows any origin
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, HeaderValue, Method};
use inhibitor_core::constants::headers::REQUEST_ID;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::SecurityFlags;

/// Configure CORS settings for the authorization server
#[must_use]
pub fn setup_cors(security: &SecurityFlags) -> CorsLayer {
    let allow_origin = if security.cors_origins.is_empty()
        || security.cors_origins.iter().any(|o| o == "*")
    {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = security
            .cors_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
            .collect();
        if origins.is_empty() {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(origins)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            ACCEPT,
            ORIGIN,
            HeaderName::from_static(REQUEST_ID),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID)])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}
