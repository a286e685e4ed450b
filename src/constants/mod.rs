// ABOUTME: Constants module with domain-separated organization
// ABOUTME: OAuth timings, Tesla endpoints, network limits, service names and unit conversions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Application constants grouped by domain.

/// `OAuth` lifecycle constants
pub mod oauth {
    /// Lifetime of an in-flight authorization attempt (state + `PKCE` verifier)
    pub const SESSION_TTL_SECS: u64 = 600;

    /// Tokens expiring within this window are treated as already expired
    pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 300;

    /// Assumed token lifetime when the provider omits or garbles `expires_in`
    pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

    /// Longest token lifetime accepted from a provider (one year); longer is treated as invalid
    pub const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 3600;

    /// Token type assumed when the provider omits `token_type`
    pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

    /// Random bytes behind each `state` value (128 bits)
    pub const STATE_BYTES: usize = 16;

    /// Random bytes behind each `PKCE` code verifier (43 base64url characters)
    pub const CODE_VERIFIER_BYTES: usize = 32;

    /// `PKCE` challenge method
    pub const CODE_CHALLENGE_METHOD: &str = "S256";

    /// Default upper bound on concurrently stored sessions
    pub const DEFAULT_SESSION_MAX_ENTRIES: usize = 10_000;

    /// Interval of the background sweep that evicts expired sessions
    pub const SESSION_CLEANUP_INTERVAL_SECS: u64 = 60;

    /// Key prefix for sessions stored in Redis
    pub const REDIS_SESSION_KEY_PREFIX: &str = "fleet_auth:oauth_session:";

    /// Name used for users created before the provider reveals an identity
    pub const PLACEHOLDER_USER_NAME: &str = "Vehicle Owner";

    /// Domain of placeholder email addresses (reserved, never deliverable)
    pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "users.invalid";
}

/// Tesla Fleet API endpoints and scopes
pub mod tesla {
    /// Default authorization server (user-facing login)
    pub const DEFAULT_AUTH_BASE_URL: &str = "https://auth.tesla.com";

    /// Default token server for Fleet API tokens
    pub const DEFAULT_FLEET_AUTH_URL: &str = "https://fleet-auth.prd.vn.cloud.tesla.com";

    /// Default Fleet API base (North America region)
    pub const DEFAULT_FLEET_API_BASE_URL: &str =
        "https://fleet-api.prd.na.vn.cloud.teslamotors.com";

    /// Authorization endpoint path
    pub const AUTHORIZE_PATH: &str = "/oauth2/v3/authorize";

    /// Token endpoint path
    pub const TOKEN_PATH: &str = "/oauth2/v3/token";

    /// Revocation endpoint path
    pub const REVOKE_PATH: &str = "/oauth2/v3/revoke";

    /// Partner account registration endpoint
    pub const PARTNER_ACCOUNTS_PATH: &str = "/api/1/partner_accounts";

    /// Partner public key lookup endpoint
    pub const PARTNER_PUBLIC_KEY_PATH: &str = "/api/1/partner_accounts/public_key";

    /// Vehicle list endpoint
    pub const VEHICLES_PATH: &str = "/api/1/vehicles";

    /// Default user scopes requested at login
    pub const DEFAULT_SCOPES: &[&str] = &[
        "openid",
        "offline_access",
        "vehicle_device_data",
        "vehicle_cmds",
        "vehicle_charging_cmds",
    ];

    /// Scopes requested for the partner (`client_credentials`) token
    pub const PARTNER_SCOPES: &str = "openid vehicle_device_data vehicle_cmds vehicle_charging_cmds";

    /// Base of the virtual key pairing link shown to vehicle owners
    pub const VIRTUAL_KEY_BASE_URL: &str = "https://tesla.com/_ak";

    /// Well-known path where the partner public key must be served
    pub const PUBLIC_KEY_WELL_KNOWN_PATH: &str =
        "/.well-known/appspecific/com.tesla.3p.public-key.pem";

    /// Vehicle state reported when the car is awake
    pub const VEHICLE_STATE_ONLINE: &str = "online";
}

/// Network timeouts and request limits
pub mod network {
    /// Provider request timeout (token, revoke, registration, vehicle data)
    pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

    /// Provider connect timeout
    pub const PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 5;

    /// Whole-request timeout applied by the HTTP server
    pub const SERVER_REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Maximum accepted request body (telemetry payloads included)
    pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

    /// Default wait after a wake-up before fetching vehicle data
    pub const DEFAULT_WAKE_WAIT_SECS: u64 = 3;
}

/// Pagination and retention limits
pub mod limits {
    /// Default number of telemetry events returned
    pub const DEFAULT_TELEMETRY_LIMIT: u32 = 50;

    /// Upper bound on telemetry events returned
    pub const MAX_TELEMETRY_LIMIT: u32 = 200;

    /// Default app session lifetime (7 days)
    pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 168;
}

/// Service identification for logs and responses
pub mod service_names {
    /// Service name used in structured logs
    pub const FLEET_AUTH_BROKER: &str = "fleet-auth-broker";

    /// Human-readable API name
    pub const API_DISPLAY_NAME: &str = "Fleet Auth Broker API";
}

/// Unit conversions
pub mod units {
    /// Miles per hour to kilometers per hour
    pub const MPH_TO_KMH: f64 = 1.609_34;

    /// Miles to kilometers
    pub const MILES_TO_KM: f64 = 1.609_34;
}

/// HTTP header names
pub mod headers {
    /// Shared secret header accepted by the telemetry ingest endpoint
    pub const TELEMETRY_SECRET: &str = "x-telemetry-secret";

    /// Request correlation header
    pub const REQUEST_ID: &str = "x-request-id";
}
