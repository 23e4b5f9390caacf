// ABOUTME: Registered client provisioning with Argon2-hashed secrets and token TTL administration
// ABOUTME: Seeds the bootstrap clients and backs the backoffice client endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::collections::BTreeSet;
use std::iter;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use inhibitor_core::constants::client_auth_methods::CLIENT_SECRET_BASIC;
use inhibitor_core::constants::grant_types::{
    AUTHORIZATION_CODE, ORIGIN_PASSWORD, ORIGIN_REFRESH_TOKEN, ORIGIN_REISSUE_TOKEN, REFRESH_TOKEN,
};
use inhibitor_core::constants::scopes::{OPENID, PROFILE};
use inhibitor_core::constants::tokens::DEFAULT_REDIRECT_URI;
use inhibitor_core::models::{ClientSettings, RegisteredClient, TokenSettings};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::RegisteredClientStore;
use crate::errors::{AppError, AppResult};

/// Bootstrap client seeded when initialization security is enabled
struct BootstrapClient {
    client_id: &'static str,
    secret: &'static str,
    scopes: &'static [&'static str],
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

const BOOTSTRAP_CLIENTS: &[BootstrapClient] = &[
    BootstrapClient {
        client_id: "inhibitor",
        secret: "1234",
        scopes: &["read", "write"],
        access_ttl_secs: 60,
        refresh_ttl_secs: 120,
    },
    BootstrapClient {
        client_id: "admin",
        secret: "1234",
        scopes: &["admin"],
        access_ttl_secs: 60,
        refresh_ttl_secs: 180,
    },
];

/// Client registration manager
#[derive(Clone)]
pub struct ClientRegistrationManager {
    clients: Arc<dyn RegisteredClientStore>,
}

impl ClientRegistrationManager {
    /// Creates a new client registration manager
    #[must_use]
    pub fn new(clients: Arc<dyn RegisteredClientStore>) -> Self {
        Self { clients }
    }

    /// Create or replace a client by `client_id`
    ///
    /// The client is granted the password, refresh, and reissue grants with
    /// `client_secret_basic` authentication; `openid` and `profile` are always
    /// added to the given scopes.
    ///
    /// # Errors
    /// Returns an error if hashing the secret or persisting the client fails
    pub async fn init_registered_client(
        &self,
        client_id: &str,
        client_secret: &str,
        scopes: &[&str],
        access_token_ttl_secs: i64,
        refresh_token_ttl_secs: i64,
    ) -> AppResult<RegisteredClient> {
        if client_id.trim().is_empty() {
            return Err(AppError::invalid_input("client_id must not be blank"));
        }
        if access_token_ttl_secs <= 0 || refresh_token_ttl_secs <= 0 {
            return Err(AppError::invalid_input("Token lifetimes must be positive"));
        }

        let existing = self.clients.find_client_by_client_id(client_id).await?;
        let (id, issued_at) = existing.map_or_else(
            || (Uuid::new_v4().to_string(), Utc::now()),
            |c| (c.id, c.client_id_issued_at),
        );

        let mut client_scopes: BTreeSet<String> =
            [OPENID, PROFILE].iter().map(|s| (*s).to_owned()).collect();
        client_scopes.extend(scopes.iter().map(|s| (*s).to_owned()));

        let client = RegisteredClient {
            id,
            client_id: client_id.to_owned(),
            client_id_issued_at: issued_at,
            client_secret_hash: Some(Self::hash_client_secret(client_secret)?),
            client_name: client_id.to_owned(),
            authentication_methods: iter::once(CLIENT_SECRET_BASIC.to_owned()).collect(),
            grant_types: [
                AUTHORIZATION_CODE,
                ORIGIN_PASSWORD,
                ORIGIN_REFRESH_TOKEN,
                ORIGIN_REISSUE_TOKEN,
                REFRESH_TOKEN,
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            redirect_uris: iter::once(DEFAULT_REDIRECT_URI.to_owned()).collect(),
            scopes: client_scopes,
            client_settings: ClientSettings::default(),
            token_settings: TokenSettings {
                access_token_ttl_secs,
                refresh_token_ttl_secs,
                reuse_refresh_tokens: false,
                refresh_threshold_secs: None,
            },
        };

        self.clients.save_client(&client).await?;
        info!(
            client_id = %client.client_id,
            access_ttl_secs = access_token_ttl_secs,
            refresh_ttl_secs = refresh_token_ttl_secs,
            "Registered client saved"
        );
        Ok(client)
    }

    /// Store a fully specified client
    ///
    /// # Errors
    /// Returns an error if persisting the client fails
    pub async fn save(&self, client: &RegisteredClient) -> AppResult<()> {
        self.clients.save_client(client).await
    }

    /// Seed the default clients
    ///
    /// # Errors
    /// Returns an error if any client cannot be saved
    pub async fn bootstrap_default_clients(&self) -> AppResult<()> {
        for seed in BOOTSTRAP_CLIENTS {
            self.init_registered_client(
                seed.client_id,
                seed.secret,
                seed.scopes,
                seed.access_ttl_secs,
                seed.refresh_ttl_secs,
            )
            .await?;
        }
        warn!(
            "Bootstrap clients seeded with well-known secrets; disable INITIALIZATION_SECURITY in production"
        );
        Ok(())
    }

    /// Change the access token lifetime
    ///
    /// # Errors
    /// Returns `ResourceNotFound` for an unknown client
    pub async fn update_access_token_ttl(
        &self,
        client_id: &str,
        ttl_secs: i64,
    ) -> AppResult<RegisteredClient> {
        self.update_token_settings(client_id, ttl_secs, |settings| {
            settings.access_token_ttl_secs = ttl_secs;
        })
        .await
    }

    /// Change the refresh token lifetime
    ///
    /// # Errors
    /// Returns `ResourceNotFound` for an unknown client
    pub async fn update_refresh_token_ttl(
        &self,
        client_id: &str,
        ttl_secs: i64,
    ) -> AppResult<RegisteredClient> {
        self.update_token_settings(client_id, ttl_secs, |settings| {
            settings.refresh_token_ttl_secs = ttl_secs;
        })
        .await
    }

    async fn update_token_settings(
        &self,
        client_id: &str,
        ttl_secs: i64,
        apply: impl FnOnce(&mut TokenSettings) + Send,
    ) -> AppResult<RegisteredClient> {
        if ttl_secs <= 0 {
            return Err(AppError::invalid_input("Token lifetime must be positive"));
        }
        let mut client = self.find_by_client_id(client_id).await?;
        apply(&mut client.token_settings);
        self.clients.save_client(&client).await?;
        info!(client_id = %client_id, ttl_secs, "Client token settings updated");
        Ok(client)
    }

    /// Client by public id
    ///
    /// # Errors
    /// Returns `ResourceNotFound` for an unknown client
    pub async fn find_by_client_id(&self, client_id: &str) -> AppResult<RegisteredClient> {
        self.clients
            .find_client_by_client_id(client_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Registered client {client_id}"))
                    .with_resource_id(client_id)
            })
    }

    /// Every registered client
    ///
    /// # Errors
    /// Returns an error if the store query fails
    pub async fn find_all(&self) -> AppResult<Vec<RegisteredClient>> {
        self.clients.list_clients().await
    }

    /// Verify a client secret against its Argon2 hash
    ///
    /// Returns `false` for a mismatch or an unparseable stored hash.
    #[must_use]
    pub fn verify_client_secret(
        client_id: &str,
        client_secret: &str,
        client_secret_hash: &str,
    ) -> bool {
        let parsed_hash = match PasswordHash::new(client_secret_hash) {
            Ok(hash) => hash,
            Err(e) => {
                error!("Failed to parse stored secret hash for client {client_id}: {e}");
                return false;
            }
        };

        if Argon2::default()
            .verify_password(client_secret.as_bytes(), &parsed_hash)
            .is_err()
        {
            warn!("OAuth client {client_id} secret validation failed");
            return false;
        }
        true
    }

    /// Hash client secret for storage using Argon2id
    ///
    /// # Errors
    /// Returns an error if Argon2 password hashing fails
    pub fn hash_client_secret(secret: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::crypto(format!("Argon2 password hashing failed: {e}")))
    }
}
