// ABOUTME: Shared server resources and HTTP router assembly
// ABOUTME: Wires storage, signing keys, the grant registry, and the login event queue behind axum
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! # Server
//!
//! [`ServerResources`] is built once at startup and shared with every handler as
//! `State<Arc<ServerResources>>`. [`build_router`] composes the route groups and the
//! middleware stack; [`run`] binds the listener and serves until a shutdown signal.

#[cfg(not(unix))]
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::accounts::AccountService;
use crate::config::ServerConfig;
use crate::database::{AccountStore, AuthorizationStore, Database, RegisteredClientStore};
use crate::errors::AppResult;
use crate::events::{EventBus, LoginAuditLogger, LoginEventHandler};
use crate::kv::{KeyValueStore, KeyValueStoreFactory, StoreConfig};
use crate::middleware::{request_tracing_middleware, setup_cors, BearerAuthenticator};
use crate::oauth2_server::{
    ClientRegistrationManager, OAuth2AuthorizationServer, PrincipalRevocationService,
};
use crate::routes::{BackofficeRoutes, DiscoveryRoutes, HealthRoutes, InternalRoutes, OAuth2Routes};
use crate::sessions::SessionConcurrencyLimiter;
use crate::tokens::{ClaimCustomizerChain, JwksManager, TokenBlacklist, TokenGenerator};

/// Largest request body accepted by any route
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Everything handlers need, constructed once per process
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// SQLite stores
    pub database: Arc<Database>,
    /// Session lists and the jti blacklist
    pub kv: Arc<dyn KeyValueStore>,
    /// RS256 signing keys
    pub jwks: Arc<JwksManager>,
    /// Token codec
    pub tokens: Arc<TokenGenerator>,
    /// Revoked-jti blacklist
    pub blacklist: TokenBlacklist,
    /// Bearer verification for internal and backoffice routes
    pub bearer: BearerAuthenticator,
    /// Account lookup and password checks
    pub accounts: AccountService,
    /// Registered client administration
    pub clients: ClientRegistrationManager,
    /// Token and revocation endpoints
    pub authorization_server: OAuth2AuthorizationServer,
    /// Account-wide revocation
    pub principal_revocation: PrincipalRevocationService,
    /// Login-success queue
    pub events: Arc<EventBus>,
    /// Session cap enforcement, also subscribed to `events`
    pub sessions: Arc<SessionConcurrencyLimiter>,
}

impl ServerResources {
    /// Assemble resources over already-open storage and keys
    ///
    /// Starts the login event workers, so this must run inside a Tokio runtime.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        database: Arc<Database>,
        kv: Arc<dyn KeyValueStore>,
        jwks: Arc<JwksManager>,
    ) -> Self {
        let client_store: Arc<dyn RegisteredClientStore> = database.clone();
        let authorization_store: Arc<dyn AuthorizationStore> = database.clone();
        let account_store: Arc<dyn AccountStore> = database.clone();

        let issuer = config.jwt.issuer.clone();
        let tokens = Arc::new(TokenGenerator::new(
            jwks.clone(),
            issuer.clone(),
            ClaimCustomizerChain::standard(),
        ));
        let blacklist = TokenBlacklist::new(
            kv.clone(),
            Duration::from_secs(config.blacklist_ttl_secs),
        );
        let bearer = BearerAuthenticator::new(jwks.clone(), blacklist.clone(), issuer);
        let accounts = AccountService::new(
            account_store,
            config.security.allow_blank_password_legacy,
        );

        let sessions = Arc::new(SessionConcurrencyLimiter::new(
            kv.clone(),
            authorization_store.clone(),
            config.sessions.clone(),
        ));
        let limiter: Arc<dyn LoginEventHandler> = sessions.clone();
        let audit: Arc<dyn LoginEventHandler> = Arc::new(LoginAuditLogger);
        let events = Arc::new(EventBus::start(&config.events, vec![limiter, audit]));

        let authorization_server = OAuth2AuthorizationServer::new(
            client_store.clone(),
            authorization_store.clone(),
            accounts.clone(),
            tokens.clone(),
            Some(events.clone()),
        );
        let principal_revocation = PrincipalRevocationService::new(
            authorization_store,
            blacklist.clone(),
            accounts.clone(),
        );

        Self {
            config: Arc::new(config),
            database,
            kv,
            jwks,
            tokens,
            blacklist,
            bearer,
            accounts,
            clients: ClientRegistrationManager::new(client_store),
            authorization_server,
            principal_revocation,
            events,
            sessions,
        }
    }

    /// Open storage and keys from `config`, then assemble resources
    ///
    /// Seeds the bootstrap clients when `INITIALIZATION_SECURITY` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database, key-value store, or signing key cannot be opened
    pub async fn initialize(config: ServerConfig) -> AppResult<Self> {
        let database = Arc::new(Database::new(&config.database).await?);
        let kv = KeyValueStoreFactory::create(&StoreConfig::from(&config.cache)).await?;
        let jwks = Arc::new(JwksManager::from_config(&config.jwt)?);

        let seed = config.security.initialization_security;
        let resources = Self::new(config, database, kv, jwks);
        if seed {
            resources.clients.bootstrap_default_clients().await?;
        }
        info!(
            kv_backend = resources.kv.backend_name(),
            grant_types = ?resources.authorization_server.grant_types(),
            "Server resources initialized"
        );
        Ok(resources)
    }
}

/// Compose every route group with the shared middleware stack
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let timeout = Duration::from_secs(resources.config.request_timeout_secs);
    let cors = setup_cors(&resources.config.security);

    Router::new()
        .merge(OAuth2Routes::routes(resources.clone()))
        .merge(DiscoveryRoutes::routes(resources.clone()))
        .merge(InternalRoutes::routes(resources.clone()))
        .merge(BackofficeRoutes::routes(resources.clone()))
        .merge(HealthRoutes::routes(resources))
        .layer(middleware::from_fn(request_tracing_middleware))
        .layer(TimeoutLayer::new(timeout))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C or SIGTERM, then drain the login event queue
///
/// # Errors
///
/// Returns an error if initialization fails or the listener cannot be bound
pub async fn run(config: ServerConfig) -> Result<()> {
    let address = format!("{}:{}", config.host, config.http_port);
    let resources = Arc::new(
        ServerResources::initialize(config)
            .await
            .context("Failed to initialize server resources")?,
    );
    let events = resources.events.clone();
    let router = build_router(resources);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Authorization server listening on {address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, draining login event queue");
    events.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix_signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
