// ABOUTME: Unit tests for config environment functionality
// ABOUTME: Validates environment loading, defaults, overrides and validation failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;
use std::path::PathBuf;

use fleet_auth_broker::config::{
    DatabaseUrl, Environment, LogLevel, ServerConfig, SessionBackend, TeslaConfig,
};
use serial_test::serial;

const MANAGED_VARS: &[&str] = &[
    "ENVIRONMENT",
    "NODE_ENV",
    "TESLA_CLIENT_ID",
    "TESLA_CLIENT_SECRET",
    "TESLA_REDIRECT_URI",
    "TESLA_API_BASE_URL",
    "TESLA_AUTH_BASE_URL",
    "TESLA_FLEET_AUTH_URL",
    "TESLA_AUDIENCE",
    "TESLA_SCOPES",
    "TESLA_DEVELOPER_DOMAIN",
    "USE_MOCK_TESLA",
    "TESLA_PUBLIC_KEY_PATH",
    "PARTNER_REGISTER_ON_STARTUP",
    "PORT",
    "API_BASE_PATH",
    "LOG_LEVEL",
    "DATABASE_URL",
    "JWT_SECRET",
    "JWT_EXPIRY_HOURS",
    "OAUTH_SESSION_BACKEND",
    "REDIS_URL",
    "OAUTH_SESSION_TTL_SECS",
    "OAUTH_SESSION_MAX_ENTRIES",
    "TOKEN_REFRESH_SINGLE_FLIGHT",
    "ALLOWED_ORIGINS",
    "TELEMETRY_INGEST_SECRET",
    "APP_CALLBACK_URL",
    "PROVIDER_TIMEOUT_SECS",
    "VEHICLE_WAKE_WAIT_SECS",
];

/// Reset the environment to just the required Tesla credentials
fn reset_env() {
    for var in MANAGED_VARS {
        env::remove_var(var);
    }
    env::set_var("TESLA_CLIENT_ID", "client-123");
    env::set_var("TESLA_CLIENT_SECRET", "secret-456");
    env::set_var(
        "TESLA_REDIRECT_URI",
        "https://fleet.example.com/api/v1/auth/tesla/callback",
    );
}

#[test]
fn test_log_level_parsing() {
    assert_eq!(LogLevel::from_str_or_default("error"), LogLevel::Error);
    assert_eq!(LogLevel::from_str_or_default("WARN"), LogLevel::Warn);
    assert_eq!(LogLevel::from_str_or_default("Debug"), LogLevel::Debug);
    assert_eq!(LogLevel::from_str_or_default("trace"), LogLevel::Trace);
    assert_eq!(LogLevel::from_str_or_default("verbose"), LogLevel::Info);
}

#[test]
fn test_environment_parsing() {
    assert_eq!(
        Environment::from_str_or_default("PROD"),
        Environment::Production
    );
    assert_eq!(Environment::from_str_or_default("test"), Environment::Testing);
    assert_eq!(
        Environment::from_str_or_default("staging"),
        Environment::Development
    );
}

#[test]
fn test_database_url_parsing() {
    assert_eq!(
        DatabaseUrl::parse_url("sqlite::memory:").unwrap(),
        DatabaseUrl::Memory
    );
    let file = DatabaseUrl::parse_url("sqlite:./data/fleet.db").unwrap();
    assert_eq!(
        file,
        DatabaseUrl::SQLite {
            path: PathBuf::from("./data/fleet.db")
        }
    );
    assert_eq!(file.to_connection_string(), "sqlite:./data/fleet.db");
    assert!(DatabaseUrl::parse_url("postgresql://localhost/fleet").is_err());
}

#[test]
fn test_session_backend_parsing() {
    assert_eq!(
        SessionBackend::from_str_or_default("Redis"),
        SessionBackend::Redis
    );
    assert_eq!(
        SessionBackend::from_str_or_default("anything"),
        SessionBackend::Memory
    );
}

#[test]
#[serial]
fn test_from_env_defaults() {
    reset_env();

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 3000);
    assert_eq!(config.api_base_path, "/api/v1");
    assert_eq!(config.environment, Environment::Development);
    assert!(config.tesla.use_mock);
    assert!(config.tesla.register_on_startup);
    assert_eq!(config.tesla.developer_domain, "fleet.example.com");
    assert_eq!(config.tesla.audience, config.tesla.api_base_url);
    assert_eq!(config.tesla.scopes[0], "openid");
    assert!(config.tesla.scopes.iter().any(|s| s == "offline_access"));
    assert_eq!(config.oauth_sessions.backend, SessionBackend::Memory);
    assert_eq!(config.oauth_sessions.ttl_secs, 600);
    assert!(config.token_refresh_single_flight);
    assert_eq!(config.allowed_origins, vec!["*"]);
    assert!(config.telemetry_ingest_secret.is_none());
    assert!(config.app_callback_url.is_none());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    reset_env();
    env::set_var("PORT", "8081");
    env::set_var("API_BASE_PATH", "/fleet");
    env::set_var("ENVIRONMENT", "production");
    env::set_var("JWT_SECRET", "a-real-production-secret");
    env::set_var("TESLA_SCOPES", "openid, offline_access");
    env::set_var("TESLA_DEVELOPER_DOMAIN", "keys.example.com");
    env::set_var("OAUTH_SESSION_BACKEND", "redis");
    env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
    env::set_var("TOKEN_REFRESH_SINGLE_FLIGHT", "false");
    env::set_var("ALLOWED_ORIGINS", "https://app.example.com, https://admin.example.com");
    env::set_var("TELEMETRY_INGEST_SECRET", "ingest-secret");
    env::set_var("DATABASE_URL", "sqlite::memory:");

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 8081);
    assert_eq!(config.api_base_path, "/fleet");
    assert!(config.environment.is_production());
    assert!(!config.tesla.use_mock);
    assert_eq!(config.tesla.scopes, vec!["openid", "offline_access"]);
    assert_eq!(config.tesla.developer_domain, "keys.example.com");
    assert_eq!(config.oauth_sessions.backend, SessionBackend::Redis);
    assert!(!config.token_refresh_single_flight);
    assert_eq!(config.allowed_origins.len(), 2);
    assert_eq!(
        config.telemetry_ingest_secret.as_deref(),
        Some("ingest-secret")
    );
    assert_eq!(config.database_url, DatabaseUrl::Memory);

    reset_env();
}

#[test]
#[serial]
fn test_missing_client_id_fails() {
    reset_env();
    env::remove_var("TESLA_CLIENT_ID");

    let err = ServerConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("TESLA_CLIENT_ID"));

    reset_env();
}

#[test]
#[serial]
fn test_unparseable_port_fails() {
    reset_env();
    env::set_var("PORT", "eighty");

    assert!(ServerConfig::from_env().is_err());

    reset_env();
}

#[test]
fn test_redis_backend_requires_url() {
    let mut config = ServerConfig::new(TeslaConfig::new(
        "id",
        "secret",
        "https://fleet.example.com/callback",
    ));
    config.oauth_sessions.backend = SessionBackend::Redis;
    assert!(config.validate().is_err());

    config.oauth_sessions.redis_url = Some("redis://localhost:6379".into());
    assert!(config.validate().is_ok());
}

#[test]
fn test_production_rejects_default_jwt_secret() {
    let mut config = ServerConfig::new(TeslaConfig::new(
        "id",
        "secret",
        "https://fleet.example.com/callback",
    ));
    config.environment = Environment::Production;
    assert!(config.validate().is_err());

    config.auth.jwt_secret = "rotated-secret".into();
    assert!(config.validate().is_ok());
}

#[test]
fn test_api_base_path_validation() {
    let mut config = ServerConfig::new(TeslaConfig::new(
        "id",
        "secret",
        "https://fleet.example.com/callback",
    ));

    for bad in ["api/v1", "/api/v1/"] {
        config.api_base_path = bad.into();
        assert!(config.validate().is_err(), "{bad}");
    }
    for good in ["/", "/api/v1"] {
        config.api_base_path = good.into();
        assert!(config.validate().is_ok(), "{good}");
    }
}

#[test]
fn test_summary_omits_secrets() {
    let mut config = ServerConfig::new(TeslaConfig::new(
        "id",
        "super-secret-client-secret",
        "https://fleet.example.com/callback",
    ));
    config.telemetry_ingest_secret = Some("ingest-secret".into());

    let summary = config.summary();
    assert!(summary.contains("Telemetry Secret: Configured"));
    assert!(!summary.contains("super-secret-client-secret"));
    assert!(!summary.contains("ingest-secret"));
}
