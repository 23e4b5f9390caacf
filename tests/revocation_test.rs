// ABOUTME: Integration tests for refresh-token revocation and principal-wide token revocation
// ABOUTME: Exercises /oauth2/revoke and the internal account and self-service revocation routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    bearer_request, create_test_server, field, form_request, login, seed_account, seed_client,
    TestServer, ADMIN_CLIENT_ID, CLIENT_ID,
};
use inhibitor::database::AuthorizationStore;
use inhibitor::tokens::AccessTokenClaims;
use inhibitor_core::models::AccountStatus;
use serde_json::Value;

fn revoke(client_id: &str, token: &str, hint: Option<&str>) -> Request<Body> {
    let mut pairs = vec![("token", token)];
    if let Some(hint) = hint {
        pairs.push(("token_type_hint", hint));
    }
    form_request("/oauth2/revoke", client_id, &pairs)
}

fn jti_of(server: &TestServer, body: &Value) -> String {
    let claims: AccessTokenClaims = server
        .resources
        .jwks
        .verify(field(body, "access_token"), None)
        .unwrap();
    claims.jti.unwrap()
}

#[tokio::test]
async fn test_revoke_refresh_token_removes_authorization() -> Result<()> {
    let server = create_test_server().await?;
    seed_account(&server.resources, "alice", AccountStatus::Activate).await?;
    let body = login(&server, CLIENT_ID, "alice", "read").await?;
    let refresh = field(&body, "refresh_token");

    let (status, response) = server
        .send(revoke(CLIENT_ID, refresh, Some("refresh_token")))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(response.is_null());
    assert!(server
        .resources
        .database
        .find_by_refresh_token(refresh)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_revoke_unknown_token_still_succeeds() -> Result<()> {
    let server = create_test_server().await?;
    let (status, _) = server
        .send(revoke(CLIENT_ID, "never-issued", Some("refresh_token")))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_revoke_access_token_hint_is_noop() -> Result<()> {
    let server = create_test_server().await?;
    seed_account(&server.resources, "bob", AccountStatus::Activate).await?;
    let body = login(&server, CLIENT_ID, "bob", "read").await?;

    let (status, _) = server
        .send(revoke(
            CLIENT_ID,
            field(&body, "access_token"),
            Some("access_token"),
        ))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        server
            .resources
            .database
            .find_by_principal_name("bob")
            .await?
            .len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_revoke_without_hint_is_invalid_request() -> Result<()> {
    let server = create_test_server().await?;
    let (status, body) = server.send(revoke(CLIENT_ID, "anything", None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "4000");
    Ok(())
}

#[tokio::test]
async fn test_revoke_token_of_another_client_is_rejected() -> Result<()> {
    let server = create_test_server().await?;
    seed_client(&server.resources, "other", &["read"], |_| {}).await?;
    seed_account(&server.resources, "carol", AccountStatus::Activate).await?;
    let body = login(&server, CLIENT_ID, "carol", "read").await?;
    let refresh = field(&body, "refresh_token");

    let (status, response) = server
        .send(revoke("other", refresh, Some("refresh_token")))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["status"], "401");
    assert_eq!(response["code"], "4010");
    assert!(server
        .resources
        .database
        .find_by_refresh_token(refresh)
        .await?
        .is_some());
    Ok(())
}

#[tokio::test]
async fn test_revoke_my_tokens_blacklists_and_deletes() -> Result<()> {
    let server = create_test_server().await?;
    seed_account(&server.resources, "dave", AccountStatus::Activate).await?;
    let first = login(&server, CLIENT_ID, "dave", "read").await?;
    let second = login(&server, CLIENT_ID, "dave", "read write").await?;
    let token = field(&second, "access_token");

    let (status, body) = server
        .send(bearer_request("DELETE", "/api/internal/me/tokens", token))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["principal"], "dave");
    assert_eq!(body["revokedAuthorizations"], 2);
    assert_eq!(body["blacklistedTokens"], 2);

    let blacklist = &server.resources.blacklist;
    assert!(blacklist.is_revoked(&jti_of(&server, &first)).await?);
    assert!(blacklist.is_revoked(&jti_of(&server, &second)).await?);
    assert!(server
        .resources
        .database
        .find_by_principal_name("dave")
        .await?
        .is_empty());

    let (status, body) = server
        .send(bearer_request("DELETE", "/api/internal/me/tokens", token))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
    Ok(())
}

#[tokio::test]
async fn test_admin_revokes_account_tokens() -> Result<()> {
    let server = create_test_server().await?;
    let victim = seed_account(&server.resources, "erin", AccountStatus::Activate).await?;
    seed_account(&server.resources, "root", AccountStatus::Activate).await?;
    let victim_login = login(&server, CLIENT_ID, "erin", "read").await?;
    let admin_login = login(&server, ADMIN_CLIENT_ID, "root", "admin").await?;

    let uri = format!("/api/internal/accounts/{}/tokens", victim.id);
    let (status, body) = server
        .send(bearer_request(
            "DELETE",
            &uri,
            field(&admin_login, "access_token"),
        ))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["principal"], "erin");
    assert_eq!(body["revokedAuthorizations"], 1);

    let (status, _) = server
        .send(bearer_request(
            "DELETE",
            "/api/internal/me/tokens",
            field(&victim_login, "access_token"),
        ))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(
        server
            .resources
            .database
            .find_by_principal_name("root")
            .await?
            .len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_account_revocation_requires_admin_scope() -> Result<()> {
    let server = create_test_server().await?;
    let account = seed_account(&server.resources, "frank", AccountStatus::Activate).await?;
    let body = login(&server, CLIENT_ID, "frank", "read").await?;

    let uri = format!("/api/internal/accounts/{}/tokens", account.id);
    let (status, response) = server
        .send(bearer_request("DELETE", &uri, field(&body, "access_token")))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "{response}");
    assert_eq!(
        server
            .resources
            .database
            .find_by_principal_name("frank")
            .await?
            .len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_account_revocation_edge_cases() -> Result<()> {
    let server = create_test_server().await?;
    seed_account(&server.resources, "root", AccountStatus::Activate).await?;
    let admin = login(&server, ADMIN_CLIENT_ID, "root", "admin").await?;
    let token = field(&admin, "access_token");

    let (status, _) = server
        .send(bearer_request(
            "DELETE",
            "/api/internal/accounts/999999/tokens",
            token,
        ))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .send(bearer_request(
            "DELETE",
            "/api/internal/accounts/not-a-number/tokens",
            token,
        ))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .send(bearer_request("DELETE", "/api/internal/me/tokens", "garbage"))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
