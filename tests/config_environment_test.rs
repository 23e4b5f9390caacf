// ABOUTME: Tests for loading server configuration from process environment variables
// ABOUTME: Serialized because they mutate the shared environment; also covers PEM key loading
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;
use std::fs;

use anyhow::Result;
use inhibitor::config::{DatabaseUrl, JwtConfig, ServerConfig};
use inhibitor::tokens::{JwksManager, RsaKeyPair};
use serial_test::serial;
use tempfile::TempDir;

const VARS: &[&str] = &[
    "HTTP_PORT",
    "DATABASE_URL",
    "JWT_ISSUER",
    "SESSION_DEFAULT_CAP",
    "SESSION_CLIENT_CAPS",
    "EVENT_WORKERS_MIN",
    "EVENT_WORKERS_MAX",
    "ALLOW_BLANK_PASSWORD_LEGACY",
    "CORS_ORIGINS",
];

fn clear_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_config_from_environment() -> Result<()> {
    clear_vars();
    env::set_var("HTTP_PORT", "9100");
    env::set_var("DATABASE_URL", "sqlite::memory:");
    env::set_var("JWT_ISSUER", "https://auth.example.test");
    env::set_var("SESSION_DEFAULT_CAP", "5");
    env::set_var("SESSION_CLIENT_CAPS", "kiosk=1");
    env::set_var("ALLOW_BLANK_PASSWORD_LEGACY", "true");
    env::set_var("CORS_ORIGINS", "https://a.example, https://b.example");

    let config = ServerConfig::from_env();
    clear_vars();
    let config = config?;

    assert_eq!(config.http_port, 9100);
    assert_eq!(config.database, DatabaseUrl::Memory);
    assert_eq!(config.jwt.issuer.as_deref(), Some("https://auth.example.test"));
    assert_eq!(config.sessions.cap_for("kiosk"), 1);
    assert_eq!(config.sessions.cap_for("web"), 5);
    assert!(config.security.allow_blank_password_legacy);
    assert_eq!(
        config.security.cors_origins,
        vec!["https://a.example".to_owned(), "https://b.example".to_owned()]
    );
    assert!(config.summary().contains("https://auth.example.test"));
    Ok(())
}

#[test]
#[serial]
fn test_inconsistent_worker_sizing_is_rejected() {
    clear_vars();
    env::set_var("EVENT_WORKERS_MIN", "8");
    env::set_var("EVENT_WORKERS_MAX", "2");
    let result = ServerConfig::from_env();
    clear_vars();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_blank_variables_fall_back_to_defaults() -> Result<()> {
    clear_vars();
    env::set_var("HTTP_PORT", "  ");
    let config = ServerConfig::from_env();
    clear_vars();
    assert_eq!(config?.http_port, ServerConfig::default().http_port);
    Ok(())
}

#[test]
fn test_signing_key_loaded_from_pem_file() -> Result<()> {
    let dir = TempDir::new()?;
    let key = RsaKeyPair::generate_with_key_size("original", 2048)?;
    let path = dir.path().join("signing.pem");
    fs::write(&path, key.export_private_key_pem()?)?;

    let config = JwtConfig {
        key_id: "from-file".to_owned(),
        private_key_path: Some(path),
        ..JwtConfig::default()
    };
    let keys = JwksManager::from_config(&config)?;
    let jwks = keys.get_jwks();
    assert_eq!(jwks.keys.len(), 1);
    assert_eq!(jwks.keys[0].kid, "from-file");
    assert_eq!(jwks.keys[0].n, key.to_jwk().n);
    Ok(())
}

#[test]
fn test_missing_pem_file_is_a_config_error() {
    let config = JwtConfig {
        private_key_path: Some("/nonexistent/inhibitor/signing.pem".into()),
        ..JwtConfig::default()
    };
    assert!(JwksManager::from_config(&config).is_err());
}
