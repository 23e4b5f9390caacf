// ABOUTME: Integration tests for the backoffice registered-client administration routes
// ABOUTME: Listing, registration, and token lifetime updates behind an admin-scoped bearer token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use common::{
    bearer_request, create_test_server, field, login, seed_account, TestServer, ADMIN_CLIENT_ID,
    CLIENT_ID,
};
use inhibitor::database::RegisteredClientStore;
use inhibitor_core::models::AccountStatus;
use serde_json::{json, Value};

const CLIENTS: &str = "/backoffice/api/registered-clients";

async fn admin_token(server: &TestServer) -> Result<String> {
    seed_account(&server.resources, "root", AccountStatus::Activate).await?;
    let body = login(server, ADMIN_CLIENT_ID, "root", "admin").await?;
    Ok(field(&body, "access_token").to_owned())
}

fn json_request(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_registered_clients() -> Result<()> {
    let server = create_test_server().await?;
    let token = admin_token(&server).await?;

    let (status, body) = server.send(bearer_request("GET", CLIENTS, &token)).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let clients = body.as_array().unwrap();
    assert_eq!(clients.len(), 3);
    let inhibitor = clients
        .iter()
        .find(|c| c["clientId"] == CLIENT_ID)
        .expect("fixture client listed");
    assert_eq!(inhibitor["accessTokenExpiry"], 300);
    assert_eq!(inhibitor["refreshTokenExpiry"], 600);
    Ok(())
}

#[tokio::test]
async fn test_register_client_then_use_it() -> Result<()> {
    let server = create_test_server().await?;
    let token = admin_token(&server).await?;

    let request = json_request(
        "POST",
        CLIENTS,
        &token,
        &json!({
            "clientId": "mobile",
            "clientSecret": "s3cret",
            "scopes": ["read"],
            "accessTokenExpiry": 120
        }),
    );
    let (status, body) = server.send(request).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["clientId"], "mobile");
    assert_eq!(body["accessTokenExpiry"], 120);
    assert_eq!(body["refreshTokenExpiry"], 24 * 60 * 60);

    let stored = server
        .resources
        .database
        .find_client_by_client_id("mobile")
        .await?
        .expect("client stored");
    assert!(stored.scopes.contains("read"));
    assert!(stored.scopes.contains("openid"));
    assert_ne!(stored.client_secret_hash.as_deref(), Some("s3cret"));
    Ok(())
}

#[tokio::test]
async fn test_update_token_lifetimes() -> Result<()> {
    let server = create_test_server().await?;
    let token = admin_token(&server).await?;

    let uri = format!("{CLIENTS}/{CLIENT_ID}/token-expiry");
    let (status, body) = server
        .send(json_request(
            "PATCH",
            &uri,
            &token,
            &json!({"accessTokenExpiry": 900}),
        ))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["accessTokenExpiry"], 900);
    assert_eq!(body["refreshTokenExpiry"], 600);

    let uri = format!("{CLIENTS}/{CLIENT_ID}/refresh-token-expiry");
    let (status, body) = server
        .send(json_request(
            "PATCH",
            &uri,
            &token,
            &json!({"refreshTokenExpiry": 7200}),
        ))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["refreshTokenExpiry"], 7200);

    seed_account(&server.resources, "alice", AccountStatus::Activate).await?;
    let login_body = login(&server, CLIENT_ID, "alice", "read").await?;
    let expires_in = login_body["expires_in"].as_i64().unwrap();
    assert!(expires_in > 300 && expires_in <= 900, "{expires_in}");
    Ok(())
}

#[tokio::test]
async fn test_lifetime_update_validation() -> Result<()> {
    let server = create_test_server().await?;
    let token = admin_token(&server).await?;

    let uri = format!("{CLIENTS}/{CLIENT_ID}/token-expiry");
    let (status, _) = server
        .send(json_request("PATCH", &uri, &token, &json!({})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .send(json_request(
            "PATCH",
            &uri,
            &token,
            &json!({"accessTokenExpiry": 0}),
        ))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = format!("{CLIENTS}/nope/refresh-token-expiry");
    let (status, body) = server
        .send(json_request(
            "PATCH",
            &unknown,
            &token,
            &json!({"refreshTokenExpiry": 60}),
        ))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(body["status"], "404");
    Ok(())
}

#[tokio::test]
async fn test_backoffice_requires_admin_bearer() -> Result<()> {
    let server = create_test_server().await?;

    let anonymous = Request::builder()
        .method("GET")
        .uri(CLIENTS)
        .body(Body::empty())?;
    let (status, body) = server.send(anonymous).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "401");

    seed_account(&server.resources, "alice", AccountStatus::Activate).await?;
    let user = login(&server, CLIENT_ID, "alice", "read").await?;
    let (status, _) = server
        .send(bearer_request("GET", CLIENTS, field(&user, "access_token")))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
