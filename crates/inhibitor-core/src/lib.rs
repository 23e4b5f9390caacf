// ABOUTME: Core types and constants for the Inhibitor authorization server
// ABOUTME: Foundation crate with error handling, domain models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

#![deny(unsafe_code)]

//! # Inhibitor Core
//!
//! Foundation crate providing shared types and constants for the Inhibitor
//! authorization server. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and the JSON error envelope
//! - **constants**: Grant types, scopes, key-value prefixes, and defaults
//! - **models**: Registered clients, authorizations, accounts, and session entries

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (`RegisteredClient`, `Authorization`, `Account`, etc.)
pub mod models;
