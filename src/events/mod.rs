// ABOUTME: Login-success events and the subscribers that react to them off the request path
// ABOUTME: The bounded EventBus delivers each event to every registered LoginEventHandler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

/// Bounded queue with an elastic worker pool
pub mod bus;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppResult;

pub use bus::EventBus;

/// A password grant completed and its authorization was saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSucceeded {
    /// Account id of the principal
    pub account_id: i64,
    /// Public client id
    pub client_id: String,
    /// Issued access token
    pub access_token: String,
    /// Issued refresh token
    pub refresh_token: String,
    /// Access token lifetime, when both instants are known
    pub access_token_ttl_secs: Option<i64>,
    /// Correlation id of the originating request
    pub correlation_id: String,
    /// Event instant
    pub occurred_at: DateTime<Utc>,
}

/// Subscriber to login events
#[async_trait]
pub trait LoginEventHandler: Send + Sync {
    /// Name used in dead-letter logs
    fn name(&self) -> &'static str;

    /// React to one event
    ///
    /// # Errors
    ///
    /// Errors are logged to the dead-letter log and never retried
    async fn handle(&self, event: &LoginSucceeded) -> AppResult<()>;
}

/// Writes every login to the log
pub struct LoginAuditLogger;

#[async_trait]
impl LoginEventHandler for LoginAuditLogger {
    fn name(&self) -> &'static str {
        "login_audit"
    }

    async fn handle(&self, event: &LoginSucceeded) -> AppResult<()> {
        info!(
            account_id = event.account_id,
            client_id = %event.client_id,
            occurred_at = %event.occurred_at,
            "Login Success Event"
        );
        Ok(())
    }
}
