// ABOUTME: Session record stored in the per-user, per-client concurrency list
// ABOUTME: Serialized as JSON into the key-value store list entries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use serde::{Deserialize, Serialize};

/// One concurrent login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Access token issued at login
    pub access_token: String,
    /// Refresh token issued at login, used to find the backing authorization
    pub refresh_token: String,
    /// Epoch milliseconds
    pub created_at: i64,
}
