// ABOUTME: Token response decoding into normalized grants with absolute expiry
// ABOUTME: Also reads identity claims from the id_token returned by the token endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Token codec
//!
//! Providers are loose about token response shapes: `expires_in` may be a number,
//! a numeric string, zero or missing, and `token_type` is sometimes omitted. The
//! codec turns whatever arrived into a [`TokenGrant`] whose expiry is an absolute
//! instant computed from the caller's clock.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::oauth::{DEFAULT_EXPIRES_IN_SECS, DEFAULT_TOKEN_TYPE, MAX_EXPIRES_IN_SECS};

/// Token endpoint response as received
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawTokenResponse {
    /// Access token (required for a usable grant)
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, as a number or numeric string
    #[serde(default)]
    pub expires_in: Option<Value>,
    /// Space-delimited granted scopes
    #[serde(default)]
    pub scope: Option<String>,
    /// `OpenID` identity token
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Normalized token grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Access token
    pub access_token: String,
    /// Refresh token, when issued
    pub refresh_token: Option<String>,
    /// Token type (defaults to `Bearer`)
    pub token_type: String,
    /// Effective lifetime in seconds
    pub expires_in: i64,
    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
    /// Granted scopes, order preserved and de-duplicated
    pub scopes: Vec<String>,
    /// `OpenID` identity token
    pub id_token: Option<String>,
}

/// Token decoding failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenCodecError {
    /// The response carried no usable access token
    #[error("token response is missing access_token")]
    MissingAccessToken,
}

/// Decode a provider token response at `now`
///
/// # Errors
///
/// Returns [`TokenCodecError::MissingAccessToken`] when `access_token` is absent or empty
pub fn parse_token_response(
    raw: &RawTokenResponse,
    now: DateTime<Utc>,
) -> Result<TokenGrant, TokenCodecError> {
    let access_token = raw
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(TokenCodecError::MissingAccessToken)?
        .to_owned();

    let expires_in = raw
        .expires_in
        .as_ref()
        .and_then(parse_expires_in)
        .filter(|secs| (1..=MAX_EXPIRES_IN_SECS).contains(secs))
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    Ok(TokenGrant {
        access_token,
        refresh_token: raw.refresh_token.clone().filter(|t| !t.is_empty()),
        token_type: raw
            .token_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_owned()),
        expires_in,
        expires_at: now + Duration::seconds(expires_in),
        scopes: raw.scope.as_deref().map(parse_scopes).unwrap_or_default(),
        id_token: raw.id_token.clone().filter(|t| !t.is_empty()),
    })
}

/// Split a space-delimited scope string, keeping first occurrences in order
#[must_use]
pub fn parse_scopes(scope: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for s in scope.split_whitespace() {
        if !scopes.iter().any(|existing| existing == s) {
            scopes.push(s.to_owned());
        }
    }
    scopes
}

fn parse_expires_in(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            // Truncation intended: fractional lifetimes round down to whole seconds
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Identity claims carried by an `OpenID` id_token
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Provider subject
    #[serde(default)]
    pub sub: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

impl IdentityClaims {
    /// Read the payload segment of an id_token
    ///
    /// The token arrives directly from the token endpoint over TLS, so the signature
    /// is not checked. Returns `None` on any decoding problem.
    #[must_use]
    pub fn from_id_token(id_token: &str) -> Option<Self> {
        let mut segments = id_token.split('.');
        let (_header, payload) = (segments.next()?, segments.next()?);
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
