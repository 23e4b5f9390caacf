// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, session caps, key material paths, and queue sizing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! Environment-based configuration management for production deployment

use std::collections::HashMap;
use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use inhibitor_core::constants::{events, keys, ports, sessions};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database with file path
    SQLite {
        /// Database file
        path: PathBuf,
    },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str.trim_start_matches("//")),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/inhibitor.db"),
        }
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Key-value store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheBackendConfig {
    /// Redis URL, in-memory store when absent
    pub redis_url: Option<String>,
    /// Capacity of the in-memory store
    pub max_entries: usize,
    /// Background expiry sweep interval
    pub cleanup_interval: Duration,
}

impl Default for CacheBackendConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_entries: 10_000,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Signing key configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// `iss` claim, omitted when unset
    pub issuer: Option<String>,
    /// `kid` header of issued tokens
    pub key_id: String,
    /// PKCS#8 PEM private key, an ephemeral key is generated when absent
    pub private_key_path: Option<PathBuf>,
    /// Size of generated keys
    pub generated_key_bits: usize,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            key_id: "inhibitor-key".to_owned(),
            private_key_path: None,
            generated_key_bits: 2048,
        }
    }
}

/// Concurrent session caps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cap for clients without an explicit entry
    pub default_cap: usize,
    /// Per-client caps
    pub client_caps: HashMap<String, usize>,
}

impl SessionConfig {
    /// Cap for a client, never below one
    #[must_use]
    pub fn cap_for(&self, client_id: &str) -> usize {
        self.client_caps
            .get(client_id)
            .copied()
            .unwrap_or(self.default_cap)
            .max(1)
    }

    /// Parse `clientA=1,clientB=5`
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is not `name=number`
    pub fn parse_caps(raw: &str) -> Result<HashMap<String, usize>> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| -> Result<(String, usize)> {
                let (client, cap) = entry
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Invalid session cap entry '{entry}'"))?;
                let cap = cap
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid session cap for '{client}'"))?;
                Ok((client.trim().to_owned(), cap))
            })
            .collect()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_cap: sessions::DEFAULT_SESSION_CAP,
            client_caps: sessions::BUILTIN_CLIENT_CAPS
                .iter()
                .map(|(client, cap)| ((*client).to_owned(), *cap))
                .collect(),
        }
    }
}

/// Login event queue sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueueConfig {
    /// Resident workers
    pub min_workers: usize,
    /// Maximum workers while backlog persists
    pub max_workers: usize,
    /// Bounded backlog
    pub queue_capacity: usize,
}

impl Default for EventQueueConfig {
    fn default() -> Self {
        Self {
            min_workers: events::DEFAULT_MIN_WORKERS,
            max_workers: events::DEFAULT_MAX_WORKERS,
            queue_capacity: events::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Security toggles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityFlags {
    /// Seed the bootstrap clients at startup
    pub initialization_security: bool,
    /// Accept blank stored or supplied passwords as a match
    pub allow_blank_password_legacy: bool,
    /// CORS allowed origins, `*` allows any
    pub cors_origins: Vec<String>,
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Bind address
    pub host: String,
    /// Deployment environment
    pub environment: Environment,
    /// Relational store
    pub database: DatabaseUrl,
    /// Key-value store
    pub cache: CacheBackendConfig,
    /// Signing keys and issuer
    pub jwt: JwtConfig,
    /// Session caps
    pub sessions: SessionConfig,
    /// Login event queue
    pub events: EventQueueConfig,
    /// Security toggles
    pub security: SecurityFlags,
    /// Lifetime of revoked-jti entries
    pub blacklist_ttl_secs: u64,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: ports::DEFAULT_HTTP_PORT,
            host: "0.0.0.0".to_owned(),
            environment: Environment::default(),
            database: DatabaseUrl::default(),
            cache: CacheBackendConfig::default(),
            jwt: JwtConfig::default(),
            sessions: SessionConfig::default(),
            events: EventQueueConfig::default(),
            security: SecurityFlags::default(),
            blacklist_ttl_secs: keys::BLACKLIST_TTL_SECS,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            http_port: parse_or(var("HTTP_PORT"), defaults.http_port, "HTTP_PORT")?,
            host: var("HOST").unwrap_or(defaults.host),
            environment: var("ENVIRONMENT")
                .map_or(defaults.environment, |v| Environment::from_str_or_default(&v)),
            database: var("DATABASE_URL").map_or(defaults.database, |v| DatabaseUrl::parse_url(&v)),
            cache: CacheBackendConfig {
                redis_url: var("REDIS_URL"),
                max_entries: parse_or(
                    var("CACHE_MAX_ENTRIES"),
                    defaults.cache.max_entries,
                    "CACHE_MAX_ENTRIES",
                )?,
                cleanup_interval: Duration::from_secs(parse_or(
                    var("CACHE_CLEANUP_INTERVAL_SECS"),
                    defaults.cache.cleanup_interval.as_secs(),
                    "CACHE_CLEANUP_INTERVAL_SECS",
                )?),
            },
            jwt: JwtConfig {
                issuer: var("JWT_ISSUER"),
                key_id: var("JWT_KEY_ID").unwrap_or(defaults.jwt.key_id),
                private_key_path: var("JWT_PRIVATE_KEY_PATH").map(PathBuf::from),
                generated_key_bits: parse_or(
                    var("JWT_GENERATED_KEY_BITS"),
                    defaults.jwt.generated_key_bits,
                    "JWT_GENERATED_KEY_BITS",
                )?,
            },
            sessions: SessionConfig {
                default_cap: parse_or(
                    var("SESSION_DEFAULT_CAP"),
                    defaults.sessions.default_cap,
                    "SESSION_DEFAULT_CAP",
                )?,
                client_caps: {
                    let mut caps = defaults.sessions.client_caps.clone();
                    if let Some(raw) = var("SESSION_CLIENT_CAPS") {
                        caps.extend(SessionConfig::parse_caps(&raw)?);
                    }
                    caps
                },
            },
            events: EventQueueConfig {
                min_workers: parse_or(
                    var("EVENT_WORKERS_MIN"),
                    defaults.events.min_workers,
                    "EVENT_WORKERS_MIN",
                )?,
                max_workers: parse_or(
                    var("EVENT_WORKERS_MAX"),
                    defaults.events.max_workers,
                    "EVENT_WORKERS_MAX",
                )?,
                queue_capacity: parse_or(
                    var("EVENT_QUEUE_CAPACITY"),
                    defaults.events.queue_capacity,
                    "EVENT_QUEUE_CAPACITY",
                )?,
            },
            security: SecurityFlags {
                initialization_security: parse_or(
                    var("INITIALIZATION_SECURITY"),
                    false,
                    "INITIALIZATION_SECURITY",
                )?,
                allow_blank_password_legacy: parse_or(
                    var("ALLOW_BLANK_PASSWORD_LEGACY"),
                    false,
                    "ALLOW_BLANK_PASSWORD_LEGACY",
                )?,
                cors_origins: var("CORS_ORIGINS")
                    .map_or_else(|| vec!["*".to_owned()], |raw| parse_origins(&raw)),
            },
            blacklist_ttl_secs: parse_or(
                var("BLACKLIST_TTL_SECS"),
                defaults.blacklist_ttl_secs,
                "BLACKLIST_TTL_SECS",
            )?,
            request_timeout_secs: parse_or(
                var("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout_secs,
                "REQUEST_TIMEOUT_SECS",
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if worker or queue sizing is inconsistent
    pub fn validate(&self) -> Result<()> {
        if self.events.min_workers == 0 {
            return Err(anyhow!("EVENT_WORKERS_MIN must be at least 1"));
        }
        if self.events.max_workers < self.events.min_workers {
            return Err(anyhow!("EVENT_WORKERS_MAX cannot be below EVENT_WORKERS_MIN"));
        }
        if self.events.queue_capacity == 0 {
            return Err(anyhow!("EVENT_QUEUE_CAPACITY must be at least 1"));
        }
        if self.sessions.default_cap == 0 {
            return Err(anyhow!("SESSION_DEFAULT_CAP must be at least 1"));
        }
        if self.jwt.private_key_path.is_none() && self.environment.is_production() {
            warn!("No JWT_PRIVATE_KEY_PATH configured; tokens will not survive a restart");
        }
        if self.security.allow_blank_password_legacy {
            warn!("ALLOW_BLANK_PASSWORD_LEGACY is enabled; blank passwords authenticate");
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Inhibitor Configuration:\n\
             - HTTP: {}:{}\n\
             - Environment: {}\n\
             - Database: {}\n\
             - Key-value store: {}\n\
             - Issuer: {}\n\
             - Signing key: {}\n\
             - Session cap (default): {}\n\
             - Session caps: {}\n\
             - Event workers: {}-{} (queue {})\n\
             - Bootstrap clients: {}",
            self.host,
            self.http_port,
            self.environment,
            self.database,
            if self.cache.redis_url.is_some() {
                "Redis"
            } else {
                "In-memory"
            },
            self.jwt.issuer.as_deref().unwrap_or("(none)"),
            if self.jwt.private_key_path.is_some() {
                "PEM file"
            } else {
                "Generated"
            },
            self.sessions.default_cap,
            self.sessions.client_caps.len(),
            self.events.min_workers,
            self.events.max_workers,
            self.events.queue_capacity,
            if self.security.initialization_security {
                "Enabled"
            } else {
                "Disabled"
            },
        )
    }
}

/// Parse an optional variable, falling back to a default when unset
fn parse_or<T>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
    value.map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .with_context(|| format!("Invalid {key} value"))
    })
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.sessions.default_cap, 3);
        assert_eq!(config.events.min_workers, 2);
        assert_eq!(config.events.max_workers, 10);
        assert_eq!(config.events.queue_capacity, 100);
        assert_eq!(config.blacklist_ttl_secs, 86_400);
        assert!(!config.security.allow_blank_password_legacy);
        assert!(config.cache.redis_url.is_none());
    }

    #[test]
    fn test_session_caps_parsing() {
        let config = ServerConfig::from_lookup(lookup(&[(
            "SESSION_CLIENT_CAPS",
            "clientA=1, clientB = 5",
        )]))
        .unwrap();
        assert_eq!(config.sessions.cap_for("clientA"), 1);
        assert_eq!(config.sessions.cap_for("clientB"), 5);
        assert_eq!(config.sessions.cap_for("inhibitor"), 3);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("HTTP_PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("SESSION_CLIENT_CAPS", "clientA")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[
            ("EVENT_WORKERS_MIN", "4"),
            ("EVENT_WORKERS_MAX", "2"),
        ]))
        .is_err());
    }

    #[test]
    fn test_database_url_parsing() {
        assert!(DatabaseUrl::parse_url("sqlite::memory:").is_memory());
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:./data/test.db").to_connection_string(),
            "sqlite:./data/test.db"
        );
    }

    #[test]
    fn test_builtin_caps_are_extended_by_environment() {
        let defaults = SessionConfig::default();
        assert_eq!(defaults.cap_for("clientA"), 1);
        assert_eq!(defaults.cap_for("clientB"), 5);
        assert_eq!(defaults.cap_for("inhibitor"), 3);

        let config = ServerConfig::from_lookup(lookup(&[(
            "SESSION_CLIENT_CAPS",
            "clientB=2,kiosk=1",
        )]))
        .unwrap();
        assert_eq!(config.sessions.cap_for("clientA"), 1);
        assert_eq!(config.sessions.cap_for("clientB"), 2);
        assert_eq!(config.sessions.cap_for("kiosk"), 1);
    }

    #[test]
    fn test_cap_for_never_returns_zero() {
        let mut sessions = SessionConfig::default();
        sessions.client_caps.insert("zero".to_owned(), 0);
        assert_eq!(sessions.cap_for("zero"), 1);
    }
}
