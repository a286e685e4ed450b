// ABOUTME: JWT-based app session tokens issued after a successful provider login
// ABOUTME: Signs HS256 session tokens and validates them against the injected clock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # App Session Authentication
//!
//! The broker never hands provider tokens to clients. After the callback it mints
//! its own short app session token (an HS256 `JWT`) that identifies the user on
//! every later request.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::constants::service_names::FLEET_AUTH_BROKER;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::User;
use crate::utils::clock::Clock;

/// Why an app session token was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionTokenError {
    /// `exp` is at or before the clock's current time
    #[error("session expired at {expired_at}")]
    Expired {
        /// Expiry carried by the token
        expired_at: DateTime<Utc>,
    },
    /// Signature, audience or algorithm mismatch
    #[error("session rejected: {0}")]
    Rejected(String),
    /// Not a decodable `JWT`
    #[error("session token is malformed: {0}")]
    Malformed(String),
}

impl From<&jsonwebtoken::errors::Error> for SessionTokenError {
    fn from(error: &jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::Malformed(error.to_string()),
            ErrorKind::InvalidSignature => Self::Rejected("bad signature".into()),
            ErrorKind::InvalidAudience => Self::Rejected("wrong audience".into()),
            _ => Self::Rejected(error.to_string()),
        }
    }
}

impl From<SessionTokenError> for AppError {
    fn from(error: SessionTokenError) -> Self {
        match error {
            SessionTokenError::Expired { .. } => Self::auth_expired(),
            SessionTokenError::Rejected(_) => Self::auth_invalid(error.to_string()),
            SessionTokenError::Malformed(_) => {
                Self::new(ErrorCode::AuthMalformed, error.to_string())
            }
        }
    }
}

/// Claims carried by an app session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// User email at issue time
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
    /// Always this service
    pub aud: String,
}

impl Claims {
    /// Parse the subject as a user id
    ///
    /// # Errors
    ///
    /// Returns an error if the subject is not a UUID
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::auth_invalid("Session subject is not a user id"))
    }
}

/// Issues and validates app session tokens
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
    clock: Arc<dyn Clock>,
}

impl AuthManager {
    /// Create a manager signing with `secret`
    #[must_use]
    pub fn new(secret: &[u8], token_expiry_hours: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_expiry_hours,
            clock,
        }
    }

    /// Session lifetime in hours
    #[must_use]
    pub const fn token_expiry_hours(&self) -> i64 {
        self.token_expiry_hours
    }

    /// Mint an app session token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT` encoding fails
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let issued_at = self.clock.now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(self.token_expiry_hours)).timestamp(),
            aud: FLEET_AUTH_BROKER.to_owned(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign session token: {e}")))
    }

    /// Validate an app session token
    ///
    /// The library checks signature and audience; expiry is checked here against
    /// the injected clock so tests can move time.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionTokenError`] if the token is malformed, rejected or expired
    pub fn validate_session(&self, token: &str) -> Result<Claims, SessionTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_audience(&[FLEET_AUTH_BROKER]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "App session token refused");
                SessionTokenError::from(&e)
            })?;

        let now = self.clock.now();
        if now.timestamp() >= claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now);
            debug!(user_id = %claims.sub, %expired_at, "App session expired");
            return Err(SessionTokenError::Expired { expired_at });
        }

        Ok(claims)
    }
}
