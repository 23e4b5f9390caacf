// ABOUTME: Integration tests for the SQLite authorization, client, and account stores
// ABOUTME: Uses file-backed databases so persistence across reconnects is exercised
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{Duration, Utc};
use inhibitor::config::DatabaseUrl;
use inhibitor::database::{AccountStore, AuthorizationStore, Database, RegisteredClientStore};
use inhibitor::errors::ErrorCode;
use inhibitor_core::models::{
    AccountStatus, Authorization, AuthorizationAttributes, ClientSettings, IssuedToken,
    RegisteredClient, TokenMetadata, TokenSettings,
};
use serde_json::{json, Map};
use tempfile::TempDir;
use uuid::Uuid;

fn file_url(dir: &TempDir) -> DatabaseUrl {
    DatabaseUrl::SQLite {
        path: dir.path().join("inhibitor.db"),
    }
}

fn token(value: &str, jti: Option<&str>) -> IssuedToken {
    let claims = jti.map(|jti| {
        let mut claims = Map::new();
        claims.insert("jti".to_owned(), json!(jti));
        claims
    });
    IssuedToken {
        value: value.to_owned(),
        issued_at: Utc::now(),
        expires_at: Some(Utc::now() + Duration::minutes(10)),
        metadata: TokenMetadata {
            claims,
            ..TokenMetadata::default()
        },
    }
}

fn authorization(principal: &str, refresh: &str) -> Authorization {
    Authorization {
        id: Uuid::new_v4().to_string(),
        registered_client_id: "client-internal-id".to_owned(),
        principal_name: principal.to_owned(),
        grant_type: "origin_password".to_owned(),
        authorized_scopes: ["openid", "read"].iter().map(|s| (*s).to_owned()).collect(),
        attributes: AuthorizationAttributes {
            grant_type: "origin_password".to_owned(),
            username: Some(principal.to_owned()),
            ..AuthorizationAttributes::default()
        },
        access_token: Some(token(&format!("access-{refresh}"), Some(&format!("jti-{refresh}")))),
        refresh_token: Some(token(refresh, None)),
        id_token: None,
    }
}

#[tokio::test]
async fn test_authorization_survives_reconnect() -> Result<()> {
    let dir = TempDir::new()?;
    let stored = authorization("alice", "refresh-1");
    {
        let db = Database::new(&file_url(&dir)).await?;
        db.save(&stored).await?;
    }

    let db = Database::new(&file_url(&dir)).await?;
    let found = db
        .find_by_refresh_token("refresh-1")
        .await?
        .expect("authorization persisted");
    assert_eq!(found.id, stored.id);
    assert_eq!(found.authorized_scopes, stored.authorized_scopes);
    assert_eq!(found.attributes, stored.attributes);
    assert_eq!(found.access_token_jti(), Some("jti-refresh-1"));
    assert!(found.id_token.is_none());
    Ok(())
}

#[tokio::test]
async fn test_conditional_rotation_has_a_single_winner() -> Result<()> {
    let db = Database::new(&DatabaseUrl::Memory).await?;
    let original = authorization("bob", "refresh-a");
    db.save(&original).await?;

    let mut first = original.clone();
    first.refresh_token = Some(token("refresh-b", None));
    let mut second = original.clone();
    second.refresh_token = Some(token("refresh-c", None));

    assert!(db.save_if_refresh_token_matches(&first, "refresh-a").await?);
    assert!(!db.save_if_refresh_token_matches(&second, "refresh-a").await?);

    assert!(db.find_by_refresh_token("refresh-a").await?.is_none());
    assert!(db.find_by_refresh_token("refresh-b").await?.is_some());
    assert!(db.find_by_refresh_token("refresh-c").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_conditional_rotation_writes_principal_and_tokens() -> Result<()> {
    let db = Database::new(&DatabaseUrl::Memory).await?;
    let original = authorization("henry", "refresh-h1");
    db.save(&original).await?;

    let mut rotated = original.clone();
    rotated.principal_name = "henry.k".to_owned();
    rotated.refresh_token = Some(token("refresh-h2", None));
    rotated.access_token = Some(token("access-h2", Some("jti-h2")));
    assert!(db.save_if_refresh_token_matches(&rotated, "refresh-h1").await?);

    let stored = db.find_by_id(&original.id).await?.expect("row kept");
    assert_eq!(stored.principal_name, "henry.k");
    assert_eq!(stored.refresh_token_value(), Some("refresh-h2"));
    assert_eq!(stored.access_token_jti(), Some("jti-h2"));
    assert!(db.find_by_principal_name("henry").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_refresh_token_values_are_unique() -> Result<()> {
    let db = Database::new(&DatabaseUrl::Memory).await?;
    db.save(&authorization("carol", "shared")).await?;

    let err = db
        .save(&authorization("dave", "shared"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);
    Ok(())
}

#[tokio::test]
async fn test_principal_queries_and_bulk_removal() -> Result<()> {
    let db = Database::new(&DatabaseUrl::Memory).await?;
    let kept = authorization("erin", "erin-1");
    db.save(&kept).await?;
    db.save(&authorization("frank", "frank-1")).await?;
    db.save(&authorization("frank", "frank-2")).await?;

    assert_eq!(db.find_by_principal_name("frank").await?.len(), 2);
    assert_eq!(db.remove_all_by_principal_name("frank").await?, 2);
    assert!(db.find_by_principal_name("frank").await?.is_empty());

    assert!(db.remove(&kept.id).await?);
    assert!(!db.remove(&kept.id).await?);
    assert!(db.find_by_id(&kept.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_client_store_round_trip() -> Result<()> {
    let db = Database::new(&DatabaseUrl::Memory).await?;
    let set = |items: &[&str]| -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    };
    let mut client = RegisteredClient {
        id: Uuid::new_v4().to_string(),
        client_id: "web".to_owned(),
        client_id_issued_at: Utc::now(),
        client_secret_hash: Some("$argon2id$stub".to_owned()),
        client_name: "Web".to_owned(),
        authentication_methods: set(&["client_secret_basic"]),
        grant_types: set(&["origin_password", "refresh_token"]),
        redirect_uris: BTreeSet::new(),
        scopes: set(&["openid", "read"]),
        client_settings: ClientSettings::default(),
        token_settings: TokenSettings::default(),
    };
    db.save_client(&client).await?;

    client.token_settings.access_token_ttl_secs = 42;
    db.save_client(&client).await?;

    let by_client_id = db.find_client_by_client_id("web").await?.expect("client");
    assert_eq!(by_client_id.id, client.id);
    assert_eq!(by_client_id.token_settings.access_token_ttl_secs, 42);
    assert_eq!(by_client_id.grant_types, client.grant_types);
    assert!(db.find_client_by_id(&client.id).await?.is_some());
    assert!(db.find_client_by_client_id("mobile").await?.is_none());
    assert_eq!(db.list_clients().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_account_store() -> Result<()> {
    let db = Database::new(&DatabaseUrl::Memory).await?;
    let created = db
        .create_account("gina", Some("$2b$04$hash"), Some("Gina"), AccountStatus::Block)
        .await?;

    let by_name = db
        .find_account_by_username("gina")
        .await?
        .expect("account");
    assert_eq!(by_name.id, created.id);
    assert_eq!(by_name.status, AccountStatus::Block);
    assert!(db.find_account_by_id(created.id).await?.is_some());
    assert!(db.find_account_by_username("nobody").await?.is_none());

    assert!(db
        .create_account("gina", None, None, AccountStatus::Activate)
        .await
        .is_err());
    Ok(())
}
