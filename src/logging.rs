// ABOUTME: Logging configuration and structured logging setup for the broker
// ABOUTME: Builds the tracing subscriber from environment and records OAuth lifecycle events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Structured logging configuration
//!
//! Production deployments default to `JSON` lines with source locations; local
//! development gets pretty output. Token values are never logged: lifecycle events
//! carry the user id, the provider name and the outcome only.

use std::env;
use std::fmt;
use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{
    filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt, registry::Registry,
    util::SubscriberInitExt, EnvFilter, Layer,
};
use uuid::Uuid;

use crate::constants::service_names;

/// Dependencies whose debug output drowns the broker's own events
const NOISY_TARGETS: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "h2=warn",
    "reqwest=warn",
    "rustls=warn",
    "sqlx=warn",
    "redis=warn",
    "tower_http=info",
];

type FormatLayer =
    Box<dyn Layer<tracing_subscriber::layer::Layered<EnvFilter, Registry>> + Send + Sync>;

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One `JSON` object per line (log shippers)
    Json,
    /// Full human readable output
    Pretty,
    /// Single-line human readable output
    Compact,
}

impl LogFormat {
    /// Parse from a string, defaulting to pretty output
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied to the broker's own targets (`RUST_LOG` wins when set)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include thread ids and names
    pub include_thread: bool,
    /// Emit span open/close events (request timing)
    pub include_spans: bool,
    /// Service name attached to the startup event
    pub service_name: String,
    /// Deployment environment name
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_thread: false,
            include_spans: false,
            service_name: service_names::FLEET_AUTH_BROKER.into(),
            environment: "development".into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".into());
        let production = matches!(environment.to_lowercase().as_str(), "production" | "prod");

        let format = env::var("LOG_FORMAT").map_or(
            if production {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            |v| LogFormat::from_str_or_default(&v),
        );

        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            format,
            include_location: production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_thread: env::var("LOG_INCLUDE_THREAD").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| service_names::FLEET_AUTH_BROKER.into()),
            environment,
        }
    }

    /// Configured level plus the noise reduction directives
    fn env_filter(&self) -> EnvFilter {
        let base = env::var("RUST_LOG").map_or_else(
            |_| EnvFilter::new(format!("warn,fleet_auth_broker={}", self.level)),
            EnvFilter::new,
        );

        NOISY_TARGETS
            .iter()
            .filter_map(|d| d.parse::<Directive>().ok())
            .fold(base, EnvFilter::add_directive)
    }

    fn format_layer(&self) -> FormatLayer {
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_thread_ids(self.include_thread)
            .with_thread_names(self.include_thread)
            .with_span_events(span_events);

        match self.format {
            LogFormat::Json => base.json().with_current_span(true).boxed(),
            LogFormat::Pretty => base.boxed(),
            LogFormat::Compact => base.compact().with_target(false).boxed(),
        }
    }

    /// Install the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(self.format_layer())
            .try_init()?;

        info!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Logging initialized"
        );
        Ok(())
    }
}

/// Steps of the token lifecycle recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Authorization code exchanged and tokens stored
    Callback,
    /// Access token refreshed
    Refresh,
    /// Tokens revoked and deleted
    Logout,
    /// App session token handed to the client
    SessionIssued,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Callback => "callback",
            Self::Refresh => "refresh",
            Self::Logout => "logout",
            Self::SessionIssued => "session_issued",
        })
    }
}

/// Audit logging for the token lifecycle
pub struct AppLogger;

impl AppLogger {
    /// Record a lifecycle step for a user
    pub fn log_oauth_event(user_id: Uuid, provider: &str, event: LifecycleEvent, success: bool) {
        info!(
            target: "fleet_auth_broker::audit",
            user_id = %user_id,
            oauth.provider = provider,
            oauth.event = %event,
            oauth.success = success,
            "OAuth lifecycle event"
        );
    }

    /// Record an app session event, with optional context
    pub fn log_auth_event(user_id: Uuid, event: LifecycleEvent, details: Option<&str>) {
        info!(
            target: "fleet_auth_broker::audit",
            user_id = %user_id,
            auth.event = %event,
            auth.details = details.unwrap_or(""),
            "App session event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str_or_default("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default("COMPACT"), LogFormat::Compact);
        assert_eq!(LogFormat::from_str_or_default("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_lifecycle_event_names() {
        assert_eq!(LifecycleEvent::Refresh.to_string(), "refresh");
        assert_eq!(LifecycleEvent::SessionIssued.to_string(), "session_issued");
    }

    #[test]
    fn test_default_config_names_service() {
        let config = LoggingConfig::default();
        assert_eq!(config.service_name, "fleet-auth-broker");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.include_spans);
    }
}
