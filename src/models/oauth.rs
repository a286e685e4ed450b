// ABOUTME: Provider token record model with expiry evaluation
// ABOUTME: One TokenRecord per user, mutated only by the token lifecycle manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::oauth::TOKEN_EXPIRY_MARGIN_SECS;
use crate::oauth2_client::TokenGrant;

/// Stored provider tokens for one user
///
/// Not serializable on purpose: token values never leave the process in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Owning user (unique)
    pub user_id: Uuid,
    /// Current provider access token
    pub access_token: String,
    /// Refresh token, absent when the provider never issued one
    pub refresh_token: Option<String>,
    /// Token type (normally `Bearer`)
    pub token_type: String,
    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
    /// Granted scopes, in provider order
    pub scopes: Vec<String>,
    /// Last write
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build the record persisted for a freshly decoded grant
    #[must_use]
    pub fn from_grant(user_id: Uuid, grant: &TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            token_type: grant.token_type.clone(),
            expires_at: grant.expires_at,
            scopes: grant.scopes.clone(),
            updated_at: now,
        }
    }

    /// Whether the token expires within the safety margin of `now`
    ///
    /// A token with exactly the margin left counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS)
    }

    /// Seconds until hard expiry (negative once expired)
    #[must_use]
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}

/// Token metadata safe to return to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    /// Token type
    pub token_type: String,
    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
    /// Granted scopes
    pub scopes: Vec<String>,
}

impl From<&TokenRecord> for TokenSummary {
    fn from(record: &TokenRecord) -> Self {
        Self {
            token_type: record.token_type.clone(),
            expires_at: record.expires_at,
            scopes: record.scopes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_expiring_at(expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            user_id: Uuid::new_v4(),
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            token_type: "Bearer".into(),
            expires_at,
            scopes: vec!["openid".into()],
            updated_at: expires_at,
        }
    }

    #[test]
    fn test_expiry_margin_boundaries() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        assert!(record_expiring_at(now + Duration::seconds(300)).is_expired_at(now));
        assert!(record_expiring_at(now + Duration::seconds(299)).is_expired_at(now));
        assert!(!record_expiring_at(now + Duration::seconds(360)).is_expired_at(now));
        assert!(record_expiring_at(now - Duration::seconds(1)).is_expired_at(now));
    }

    #[test]
    fn test_summary_hides_token_values() {
        let now = Utc::now();
        let summary = TokenSummary::from(&record_expiring_at(now));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("access"));
        assert!(json.contains("expiresAt"));
    }
}
