// ABOUTME: Re-exports the unified error types from inhibitor-core
// ABOUTME: Keeps `crate::errors::AppError` paths stable across the server crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! # Unified Error Handling System
//!
//! The error taxonomy lives in `inhibitor_core::errors`; this module re-exports it so
//! the rest of the crate depends on a single path.

pub use inhibitor_core::errors::{AppError, AppResult, ErrorCode, ErrorContext, ErrorEnvelope};
