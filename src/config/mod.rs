// ABOUTME: Configuration module root
// ABOUTME: Environment-only configuration for the authorization server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

/// Environment-based server configuration
pub mod environment;

pub use environment::{
    CacheBackendConfig, DatabaseUrl, Environment, EventQueueConfig, JwtConfig, SecurityFlags,
    ServerConfig, SessionConfig,
};
