// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory server resources, fixture clients and accounts, and HTTP request helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `inhibitor`

use std::collections::BTreeSet;
use std::env;
use std::sync::{Arc, Once, OnceLock};

use anyhow::Result;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use inhibitor::config::{DatabaseUrl, EventQueueConfig, ServerConfig};
use inhibitor::database::{AccountStore, Database, RegisteredClientStore};
use inhibitor::kv::memory::InMemoryStore;
use inhibitor::kv::{KeyValueStore, StoreConfig};
use inhibitor::server::{build_router, ServerResources};
use inhibitor::tokens::JwksManager;
use inhibitor_core::constants::client_auth_methods::CLIENT_SECRET_BASIC;
use inhibitor_core::constants::grant_types::{
    ORIGIN_PASSWORD, ORIGIN_REFRESH_TOKEN, ORIGIN_REISSUE_TOKEN, REFRESH_TOKEN,
};
use inhibitor_core::constants::scopes::{OPENID, PROFILE};
use inhibitor_core::models::{
    Account, AccountStatus, ClientSettings, RegisteredClient, TokenSettings,
};
use serde_json::Value;
use tower::ServiceExt;
use tracing::Level;
use uuid::Uuid;

/// Secret shared by every fixture client
pub const CLIENT_SECRET: &str = "1234";
/// Password shared by every fixture account
pub const PASSWORD: &str = "correct horse";
/// Client with the default session cap
pub const CLIENT_ID: &str = "inhibitor";
/// Client holding the `admin` scope
pub const ADMIN_CLIENT_ID: &str = "admin";
/// Client capped at a single session
pub const SINGLE_SESSION_CLIENT_ID: &str = "single";

static INIT_LOGGER: Once = Once::new();
static KEYS: OnceLock<Arc<JwksManager>> = OnceLock::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// One signing key per test binary, RSA generation is slow in debug builds
pub fn test_keys() -> Arc<JwksManager> {
    KEYS.get_or_init(|| {
        let mut keys = JwksManager::new();
        keys.generate_rsa_key_pair_with_size("test-key", 2048)
            .expect("test key generation");
        Arc::new(keys)
    })
    .clone()
}

/// In-memory configuration with a single event worker and one capped client
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig {
        database: DatabaseUrl::Memory,
        events: EventQueueConfig {
            min_workers: 1,
            max_workers: 1,
            queue_capacity: 100,
        },
        ..ServerConfig::default()
    };
    config
        .sessions
        .client_caps
        .insert(SINGLE_SESSION_CLIENT_ID.to_owned(), 1);
    config
}

/// Server resources plus the router built over them
pub struct TestServer {
    pub resources: Arc<ServerResources>,
    pub router: Router,
}

impl TestServer {
    /// Send one request through the full middleware stack
    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    /// Wait for every queued login event to be handled
    pub async fn drain_events(&self) {
        self.resources.events.shutdown().await;
    }
}

/// Build a server over a fresh in-memory database with the fixture clients
pub async fn create_test_server() -> Result<TestServer> {
    create_test_server_with(test_config()).await
}

/// Build a server over `config` with the fixture clients
pub async fn create_test_server_with(config: ServerConfig) -> Result<TestServer> {
    init_test_logging();
    let database = Arc::new(Database::new(&config.database).await?);
    let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new(&StoreConfig::default()));
    let resources = Arc::new(ServerResources::new(config, database, kv, test_keys()));

    seed_client(&resources, CLIENT_ID, &["read", "write"], |_| {}).await?;
    seed_client(&resources, ADMIN_CLIENT_ID, &["admin"], |_| {}).await?;
    seed_client(&resources, SINGLE_SESSION_CLIENT_ID, &["read"], |_| {}).await?;

    let router = build_router(resources.clone());
    Ok(TestServer { resources, router })
}

/// Argon2 hash with minimal cost so client authentication stays fast
pub fn cheap_secret_hash(secret: &str) -> Result<String> {
    let params = Params::new(8, 1, 1, None).map_err(|e| anyhow::anyhow!("{e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .to_string())
}

/// Store a client entitled to the custom grants, adjusted by `customize`
pub async fn seed_client(
    resources: &ServerResources,
    client_id: &str,
    scopes: &[&str],
    customize: impl FnOnce(&mut RegisteredClient),
) -> Result<RegisteredClient> {
    let mut client_scopes: BTreeSet<String> =
        [OPENID, PROFILE].iter().map(|s| (*s).to_owned()).collect();
    client_scopes.extend(scopes.iter().map(|s| (*s).to_owned()));

    let mut client = RegisteredClient {
        id: Uuid::new_v4().to_string(),
        client_id: client_id.to_owned(),
        client_id_issued_at: Utc::now(),
        client_secret_hash: Some(cheap_secret_hash(CLIENT_SECRET)?),
        client_name: client_id.to_owned(),
        authentication_methods: [CLIENT_SECRET_BASIC.to_owned()].into_iter().collect(),
        grant_types: [
            ORIGIN_PASSWORD,
            ORIGIN_REFRESH_TOKEN,
            ORIGIN_REISSUE_TOKEN,
            REFRESH_TOKEN,
        ]
        .iter()
        .map(|s| (*s).to_owned())
        .collect(),
        redirect_uris: BTreeSet::new(),
        scopes: client_scopes,
        client_settings: ClientSettings::default(),
        token_settings: TokenSettings {
            access_token_ttl_secs: 300,
            refresh_token_ttl_secs: 600,
            reuse_refresh_tokens: false,
            refresh_threshold_secs: None,
        },
    };
    customize(&mut client);
    resources.database.save_client(&client).await?;
    Ok(client)
}

/// Store an account with a low-cost bcrypt hash
pub async fn seed_account(
    resources: &ServerResources,
    username: &str,
    status: AccountStatus,
) -> Result<Account> {
    let hash = bcrypt::hash(PASSWORD, 4)?;
    Ok(resources
        .database
        .create_account(username, Some(&hash), Some(username), status)
        .await?)
}

/// `Authorization: Basic` value for a client
pub fn basic_auth(client_id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{secret}")))
}

/// Form POST with Basic client authentication
pub fn form_request(uri: &str, client_id: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(pairs).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(AUTHORIZATION, basic_auth(client_id, CLIENT_SECRET))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// Password grant request for `username`
pub fn password_grant(client_id: &str, username: &str, scope: &str) -> Request<Body> {
    form_request(
        "/oauth2/token",
        client_id,
        &[
            ("grant_type", ORIGIN_PASSWORD),
            ("username", username),
            ("password", PASSWORD),
            ("scope", scope),
        ],
    )
}

/// Request with a bearer token and no body
pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Log in and return the token response body
pub async fn login(server: &TestServer, client_id: &str, username: &str, scope: &str) -> Result<Value> {
    let (status, body) = server
        .send(password_grant(client_id, username, scope))
        .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {status} {body}");
    Ok(body)
}

/// String field of a JSON body
pub fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body[name].as_str().unwrap_or_default()
}
