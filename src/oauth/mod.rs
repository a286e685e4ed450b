// ABOUTME: OAuth module organizing the token lifecycle, session correlation and partner registration
// ABOUTME: Defines OAuthError and its mapping onto HTTP error responses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # OAuth Token Lifecycle
//!
//! Server-side state of the `OAuth` integration with the vehicle provider:
//!
//! - [`session_store`]: short-lived `state -> PKCE verifier` correlation
//! - [`manager`]: authorize, exchange, store, refresh and revoke provider tokens
//! - [`registrar`]: one-time partner domain registration

/// Token lifecycle manager (login, callback, transparent refresh, logout)
pub mod manager;
/// Partner account registration with the Fleet API
pub mod registrar;
/// `OAuth` session stores (in-memory and Redis)
pub mod session_store;

pub use manager::{CallbackOutcome, CallbackParams, LoginInitiation, TokenLifecycleManager, TokenStatus};
pub use registrar::{PartnerRegistrar, RegistrationResult, RegistrationStatus};
pub use session_store::{OAuthSession, OAuthSessionStore};

use thiserror::Error;
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};

/// `OAuth` lifecycle failures
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Malformed callback (missing code/state) or an error reported by the provider
    #[error("Invalid OAuth request: {0}")]
    InvalidRequest(String),

    /// Unknown, replayed or expired `state`; the login flow must restart
    #[error("OAuth session expired or unknown, restart the login flow")]
    SessionExpiredOrUnknown,

    /// Authorization code exchange rejected or unreadable
    #[error("Authorization code exchange failed: {0}")]
    ProviderExchangeFailed(String),

    /// Refresh rejected or impossible; the user must re-authenticate
    #[error("Token refresh failed: {0}")]
    ProviderRefreshFailed(String),

    /// No token record for the user
    #[error("No provider tokens found for user {0}")]
    NoTokensFound(Uuid),

    /// Provider revocation failed (logged, never surfaced by logout)
    #[error("Token revocation failed: {0}")]
    RevokeFailed(String),

    /// Partner registration rejected
    #[error("Partner registration failed: {0}")]
    RegistrationFailed(String),

    /// Session store backend failure
    #[error("OAuth session store error: {0}")]
    SessionStore(String),

    /// Persistence failure
    #[error("Database error: {0}")]
    Database(String),

    /// Misconfiguration (bad URLs, unusable signing secret)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl OAuthError {
    /// Error code used when rendering this error over HTTP
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) => ErrorCode::InvalidInput,
            Self::SessionExpiredOrUnknown => ErrorCode::OAuthStateInvalid,
            Self::ProviderExchangeFailed(_)
            | Self::RegistrationFailed(_)
            | Self::RevokeFailed(_) => ErrorCode::ExternalServiceError,
            Self::ProviderRefreshFailed(_) => ErrorCode::ExternalAuthFailed,
            Self::NoTokensFound(_) => ErrorCode::ProviderNotConnected,
            Self::SessionStore(_) => ErrorCode::StorageError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Configuration(_) => ErrorCode::ConfigError,
        }
    }
}

impl From<AppError> for OAuthError {
    fn from(error: AppError) -> Self {
        Self::Database(error.message)
    }
}

impl From<OAuthError> for AppError {
    fn from(error: OAuthError) -> Self {
        let app_error = Self::new(error.error_code(), error.to_string());
        match error {
            OAuthError::NoTokensFound(user_id) => app_error.with_user_id(user_id),
            _ => app_error,
        }
    }
}
