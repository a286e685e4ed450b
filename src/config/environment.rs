// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into a validated, strongly typed ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use crate::constants::{limits, network, oauth, tesla};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// JWT secret used when `JWT_SECRET` is unset; rejected in production
pub const DEFAULT_JWT_SECRET: &str = "change-this-secret";

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational (default)
    #[default]
    Info,
    /// Debug output
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (mock vehicle data by default)
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

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database file
    SQLite {
        /// Path of the database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not use the `sqlite:` scheme
    pub fn parse_url(s: &str) -> Result<Self> {
        let Some(path_str) = s.strip_prefix("sqlite:") else {
            return Err(anyhow::anyhow!(
                "Unsupported database URL '{s}': expected sqlite:<path> or sqlite::memory:"
            ));
        };

        if path_str == ":memory:" {
            Ok(Self::Memory)
        } else {
            Ok(Self::SQLite {
                path: PathBuf::from(path_str.trim_start_matches("//")),
            })
        }
    }

    /// Render as a connection string understood by `sqlx`
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Whether this points at an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/fleet.db"),
        }
    }
}

/// Tesla Fleet API client configuration
#[derive(Debug, Clone)]
pub struct TeslaConfig {
    /// Registered application client id
    pub client_id: String,
    /// Registered application client secret
    pub client_secret: String,
    /// Callback URL registered with Tesla
    pub redirect_uri: String,
    /// Authorization server base (user login and revoke)
    pub auth_base_url: String,
    /// Token server base (code exchange, refresh, partner token)
    pub fleet_auth_url: String,
    /// Fleet API base (vehicle data, partner registration)
    pub api_base_url: String,
    /// `audience` parameter sent with token requests
    pub audience: String,
    /// Scopes requested at login, in order
    pub scopes: Vec<String>,
    /// Domain registered as partner and hosting the public key
    pub developer_domain: String,
    /// Serve sample data instead of calling the Fleet API
    pub use_mock: bool,
    /// PEM file served at the well-known public key path
    pub public_key_path: PathBuf,
    /// Register the developer domain in the background at startup
    pub register_on_startup: bool,
}

impl TeslaConfig {
    /// Build a configuration with default endpoints for the given credentials
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let redirect_uri = redirect_uri.into();
        let developer_domain = host_of(&redirect_uri).unwrap_or_else(|| "localhost".into());
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            auth_base_url: tesla::DEFAULT_AUTH_BASE_URL.into(),
            fleet_auth_url: tesla::DEFAULT_FLEET_AUTH_URL.into(),
            api_base_url: tesla::DEFAULT_FLEET_API_BASE_URL.into(),
            audience: tesla::DEFAULT_FLEET_API_BASE_URL.into(),
            scopes: tesla::DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
            developer_domain,
            use_mock: true,
            public_key_path: PathBuf::from("./keys/public-key.pem"),
            register_on_startup: false,
        }
    }
}

/// App session (JWT) configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for app session tokens
    pub jwt_secret: String,
    /// App session lifetime in hours
    pub jwt_expiry_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            jwt_expiry_hours: limits::DEFAULT_JWT_EXPIRY_HOURS,
        }
    }
}

/// Backend holding in-flight `OAuth` sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Process-local LRU (single instance deployments)
    #[default]
    Memory,
    /// Shared Redis (multi-instance deployments)
    Redis,
}

impl SessionBackend {
    /// Parse from string with fallback to memory
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "redis" => Self::Redis,
            _ => Self::Memory,
        }
    }
}

/// `OAuth` session store configuration
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Selected backend
    pub backend: SessionBackend,
    /// Redis connection URL (required for the redis backend)
    pub redis_url: Option<String>,
    /// Session lifetime in seconds
    pub ttl_secs: u64,
    /// Maximum sessions held by the in-memory backend
    pub max_entries: usize,
    /// Interval of the in-memory background sweep
    pub cleanup_interval_secs: u64,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            redis_url: None,
            ttl_secs: oauth::SESSION_TTL_SECS,
            max_entries: oauth::DEFAULT_SESSION_MAX_ENTRIES,
            cleanup_interval_secs: oauth::SESSION_CLEANUP_INTERVAL_SECS,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Prefix of all API routes (e.g. `/api/v1`)
    pub api_base_path: String,
    /// Deployment environment
    pub environment: Environment,
    /// Application log level
    pub log_level: LogLevel,
    /// Database location
    pub database_url: DatabaseUrl,
    /// Tesla client settings
    pub tesla: TeslaConfig,
    /// App session settings
    pub auth: AuthConfig,
    /// `OAuth` session store settings
    pub oauth_sessions: SessionStoreConfig,
    /// Serialize refreshes per user so concurrent callers share one refresh
    pub token_refresh_single_flight: bool,
    /// CORS allowed origins (`*` for any)
    pub allowed_origins: Vec<String>,
    /// Shared secret required by the telemetry ingest endpoint when set
    pub telemetry_ingest_secret: Option<String>,
    /// Frontend URL receiving `token` and `userId` after a successful callback
    pub app_callback_url: Option<String>,
    /// Vehicle data request timeout
    pub provider_timeout_secs: u64,
    /// Wait after a wake-up before fetching vehicle data
    pub vehicle_wake_wait_secs: u64,
}

impl ServerConfig {
    /// Build a configuration with defaults around the given Tesla settings
    #[must_use]
    pub fn new(tesla: TeslaConfig) -> Self {
        Self {
            http_port: 3000,
            api_base_path: "/api/v1".into(),
            environment: Environment::Development,
            log_level: LogLevel::Info,
            database_url: DatabaseUrl::default(),
            tesla,
            auth: AuthConfig::default(),
            oauth_sessions: SessionStoreConfig::default(),
            token_refresh_single_flight: true,
            allowed_origins: vec!["*".into()],
            telemetry_ingest_secret: None,
            app_callback_url: None,
            provider_timeout_secs: network::PROVIDER_TIMEOUT_SECS,
            vehicle_wake_wait_secs: network::DEFAULT_WAKE_WAIT_SECS,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value fails to parse,
    /// or the resulting configuration is invalid
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT")
                .or_else(|_| env::var("NODE_ENV"))
                .unwrap_or_else(|_| "development".into()),
        );

        let client_id = required_env("TESLA_CLIENT_ID")?;
        let client_secret = required_env("TESLA_CLIENT_SECRET")?;
        let redirect_uri = required_env("TESLA_REDIRECT_URI")?;

        let api_base_url = env_var_or("TESLA_API_BASE_URL", tesla::DEFAULT_FLEET_API_BASE_URL)?;
        let default_domain = host_of(&redirect_uri).unwrap_or_else(|| "localhost".into());

        let tesla = TeslaConfig {
            client_id,
            client_secret,
            auth_base_url: env_var_or("TESLA_AUTH_BASE_URL", tesla::DEFAULT_AUTH_BASE_URL)?,
            fleet_auth_url: env_var_or("TESLA_FLEET_AUTH_URL", tesla::DEFAULT_FLEET_AUTH_URL)?,
            audience: env_var_or("TESLA_AUDIENCE", &api_base_url)?,
            api_base_url,
            scopes: env::var("TESLA_SCOPES").map_or_else(
                |_| tesla::DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
                |v| parse_list(&v),
            ),
            developer_domain: env_var_or("TESLA_DEVELOPER_DOMAIN", &default_domain)?,
            use_mock: env_var_or(
                "USE_MOCK_TESLA",
                if environment.is_development() {
                    "true"
                } else {
                    "false"
                },
            )?
            .parse()
            .context("Invalid USE_MOCK_TESLA value")?,
            public_key_path: PathBuf::from(env_var_or(
                "TESLA_PUBLIC_KEY_PATH",
                "./keys/public-key.pem",
            )?),
            register_on_startup: env_var_or("PARTNER_REGISTER_ON_STARTUP", "true")?
                .parse()
                .context("Invalid PARTNER_REGISTER_ON_STARTUP value")?,
            redirect_uri,
        };

        let config = Self {
            http_port: env_var_or("PORT", "3000")?
                .parse()
                .context("Invalid PORT value")?,
            api_base_path: env_var_or("API_BASE_PATH", "/api/v1")?,
            environment,
            log_level: LogLevel::from_str_or_default(&env_var_or("LOG_LEVEL", "info")?),
            database_url: DatabaseUrl::parse_url(&env_var_or(
                "DATABASE_URL",
                "sqlite:./data/fleet.db",
            )?)
            .context("Invalid DATABASE_URL value")?,
            tesla,
            auth: AuthConfig {
                jwt_secret: env_var_or("JWT_SECRET", DEFAULT_JWT_SECRET)?,
                jwt_expiry_hours: env_var_or(
                    "JWT_EXPIRY_HOURS",
                    &limits::DEFAULT_JWT_EXPIRY_HOURS.to_string(),
                )?
                .parse()
                .context("Invalid JWT_EXPIRY_HOURS value")?,
            },
            oauth_sessions: SessionStoreConfig {
                backend: SessionBackend::from_str_or_default(&env_var_or(
                    "OAUTH_SESSION_BACKEND",
                    "memory",
                )?),
                redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
                ttl_secs: env_var_or(
                    "OAUTH_SESSION_TTL_SECS",
                    &oauth::SESSION_TTL_SECS.to_string(),
                )?
                .parse()
                .context("Invalid OAUTH_SESSION_TTL_SECS value")?,
                max_entries: env_var_or(
                    "OAUTH_SESSION_MAX_ENTRIES",
                    &oauth::DEFAULT_SESSION_MAX_ENTRIES.to_string(),
                )?
                .parse()
                .context("Invalid OAUTH_SESSION_MAX_ENTRIES value")?,
                cleanup_interval_secs: oauth::SESSION_CLEANUP_INTERVAL_SECS,
            },
            token_refresh_single_flight: env_var_or("TOKEN_REFRESH_SINGLE_FLIGHT", "true")?
                .parse()
                .context("Invalid TOKEN_REFRESH_SINGLE_FLIGHT value")?,
            allowed_origins: parse_list(&env_var_or("ALLOWED_ORIGINS", "*")?),
            telemetry_ingest_secret: env::var("TELEMETRY_INGEST_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            app_callback_url: env::var("APP_CALLBACK_URL").ok().filter(|v| !v.is_empty()),
            provider_timeout_secs: env_var_or(
                "PROVIDER_TIMEOUT_SECS",
                &network::PROVIDER_TIMEOUT_SECS.to_string(),
            )?
            .parse()
            .context("Invalid PROVIDER_TIMEOUT_SECS value")?,
            vehicle_wake_wait_secs: env_var_or(
                "VEHICLE_WAKE_WAIT_SECS",
                &network::DEFAULT_WAKE_WAIT_SECS.to_string(),
            )?
            .parse()
            .context("Invalid VEHICLE_WAKE_WAIT_SECS value")?,
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed base path or redirect URI, a redis session
    /// backend without `REDIS_URL`, or the default JWT secret in production
    pub fn validate(&self) -> Result<()> {
        if !self.api_base_path.starts_with('/')
            || (self.api_base_path.len() > 1 && self.api_base_path.ends_with('/'))
        {
            return Err(anyhow::anyhow!(
                "API_BASE_PATH must start with '/' and must not end with '/': {}",
                self.api_base_path
            ));
        }

        url::Url::parse(&self.tesla.redirect_uri).context("Invalid TESLA_REDIRECT_URI value")?;

        if self.oauth_sessions.backend == SessionBackend::Redis
            && self.oauth_sessions.redis_url.is_none()
        {
            return Err(anyhow::anyhow!(
                "OAUTH_SESSION_BACKEND=redis requires REDIS_URL"
            ));
        }

        if self.environment.is_production() && self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be set to a non-default value in production"
            ));
        }

        if self.tesla.use_mock && self.environment.is_production() {
            warn!("USE_MOCK_TESLA is enabled in production: vehicle data will be sample data");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Fleet Auth Broker Configuration:\n\
             - HTTP Port: {}\n\
             - API Base Path: {}\n\
             - Environment: {}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - Tesla Auth: {}\n\
             - Tesla API: {}\n\
             - Developer Domain: {}\n\
             - Vehicle Data: {}\n\
             - OAuth Sessions: {:?} (ttl {}s)\n\
             - Refresh Single-Flight: {}\n\
             - Telemetry Secret: {}",
            self.http_port,
            self.api_base_path,
            self.environment,
            self.log_level,
            if self.database_url.is_memory() {
                "SQLite (memory)"
            } else {
                "SQLite"
            },
            self.tesla.auth_base_url,
            self.tesla.api_base_url,
            self.tesla.developer_domain,
            if self.tesla.use_mock { "Mock" } else { "Fleet API" },
            self.oauth_sessions.backend,
            self.oauth_sessions.ttl_secs,
            self.token_refresh_single_flight,
            if self.telemetry_ingest_secret.is_some() {
                "Configured"
            } else {
                "Disabled"
            },
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_owned()))
}

/// Get a required, non-empty environment variable
fn required_env(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Missing required configuration: {key}"))
}

/// Parse a comma-separated list, dropping empty entries
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Host component of a URL, if it parses
fn host_of(raw: &str) -> Option<String> {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
}
