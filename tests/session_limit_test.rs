// ABOUTME: Integration tests for the per-user, per-client session cap
// ABOUTME: Logins flow through the event queue and evict the oldest authorizations beyond the cap
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{
    create_test_server, field, login, seed_account, CLIENT_ID, SINGLE_SESSION_CLIENT_ID,
};
use inhibitor::database::AuthorizationStore;
use inhibitor_core::models::AccountStatus;

#[tokio::test]
async fn test_single_session_client_keeps_latest_login() -> Result<()> {
    let server = create_test_server().await?;
    let account = seed_account(&server.resources, "alice", AccountStatus::Activate).await?;

    let mut refresh_tokens = Vec::new();
    for _ in 0..3 {
        let body = login(&server, SINGLE_SESSION_CLIENT_ID, "alice", "read").await?;
        refresh_tokens.push(field(&body, "refresh_token").to_owned());
    }
    server.drain_events().await;

    let sessions = server
        .resources
        .sessions
        .sessions(account.id, SINGLE_SESSION_CLIENT_ID)
        .await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].refresh_token, refresh_tokens[2]);

    let database = &server.resources.database;
    assert!(database.find_by_refresh_token(&refresh_tokens[0]).await?.is_none());
    assert!(database.find_by_refresh_token(&refresh_tokens[1]).await?.is_none());
    assert!(database.find_by_refresh_token(&refresh_tokens[2]).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_default_cap_evicts_oldest_session() -> Result<()> {
    let server = create_test_server().await?;
    let account = seed_account(&server.resources, "bob", AccountStatus::Activate).await?;

    let mut refresh_tokens = Vec::new();
    for _ in 0..4 {
        let body = login(&server, CLIENT_ID, "bob", "read").await?;
        refresh_tokens.push(field(&body, "refresh_token").to_owned());
    }
    server.drain_events().await;

    let sessions = server
        .resources
        .sessions
        .sessions(account.id, CLIENT_ID)
        .await?;
    let remaining: Vec<&str> = sessions.iter().map(|s| s.refresh_token.as_str()).collect();
    assert_eq!(
        remaining,
        refresh_tokens[1..].iter().map(String::as_str).collect::<Vec<_>>()
    );

    let authorizations = server
        .resources
        .database
        .find_by_principal_name("bob")
        .await?;
    assert_eq!(authorizations.len(), 3);
    assert!(authorizations
        .iter()
        .all(|a| a.refresh_token_value() != Some(refresh_tokens[0].as_str())));
    Ok(())
}

#[tokio::test]
async fn test_sessions_are_tracked_per_client() -> Result<()> {
    let server = create_test_server().await?;
    let account = seed_account(&server.resources, "carol", AccountStatus::Activate).await?;

    login(&server, SINGLE_SESSION_CLIENT_ID, "carol", "read").await?;
    login(&server, CLIENT_ID, "carol", "read").await?;
    login(&server, CLIENT_ID, "carol", "read").await?;
    server.drain_events().await;

    let sessions = &server.resources.sessions;
    assert_eq!(
        sessions
            .sessions(account.id, SINGLE_SESSION_CLIENT_ID)
            .await?
            .len(),
        1
    );
    assert_eq!(sessions.sessions(account.id, CLIENT_ID).await?.len(), 2);
    assert_eq!(
        server
            .resources
            .database
            .find_by_principal_name("carol")
            .await?
            .len(),
        3
    );
    Ok(())
}
