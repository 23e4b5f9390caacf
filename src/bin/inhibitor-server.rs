// ABOUTME: Authorization server binary
// ABOUTME: Loads environment configuration, applies CLI overrides, and serves until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! # Inhibitor Server Binary
//!
//! Starts the OAuth2/OIDC authorization server.

use anyhow::Result;
use clap::Parser;
use inhibitor::config::{DatabaseUrl, ServerConfig};
use inhibitor::{logging, server};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "inhibitor-server")]
#[command(about = "Inhibitor - OAuth2/OIDC authorization server")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override `DATABASE_URL`
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(database_url) = args.database_url.as_deref() {
        config.database = DatabaseUrl::parse_url(database_url);
    }
    config.validate()?;

    info!("Starting Inhibitor authorization server");
    info!("{}", config.summary());
    display_available_endpoints(&config);

    if let Err(e) = server::run(config).await {
        error!("Server error: {e:#}");
        return Err(e);
    }
    Ok(())
}

fn display_available_endpoints(config: &ServerConfig) {
    let base = format!("http://{}:{}", config.host, config.http_port);
    info!("=== Available API Endpoints ===");
    info!("   Token:             POST   {base}/oauth2/token");
    info!("   Revocation:        POST   {base}/oauth2/revoke");
    info!("   JWKS:              GET    {base}/oauth2/jwks");
    info!("   Discovery:         GET    {base}/.well-known/openid-configuration");
    info!("   Revoke account:    DELETE {base}/api/internal/accounts/{{accountId}}/tokens");
    info!("   Revoke own tokens: DELETE {base}/api/internal/me/tokens");
    info!("   Clients:           GET|POST {base}/backoffice/api/registered-clients");
    info!("   Health:            GET    {base}/health, {base}/ready");
    info!("=== End of Endpoint List ===");
}
