// ABOUTME: User account model for app sessions
// ABOUTME: Users are created on the first successful callback and matched by provider identity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::oauth::{PLACEHOLDER_EMAIL_DOMAIN, PLACEHOLDER_USER_NAME};

/// App user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// Email address (unique)
    pub email: String,
    /// Display name
    pub name: String,
    /// Provider subject (`sub` claim), unique when present
    pub external_user_id: Option<String>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Last successful `OAuth` callback
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user record
    #[must_use]
    pub fn new(
        email: String,
        name: String,
        external_user_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            external_user_id,
            created_at,
            last_login_at: None,
        }
    }

    /// Create a user for an owner whose identity the provider did not reveal
    ///
    /// The email lives under a reserved domain so it can never collide with, or be
    /// mailed as, a real address.
    #[must_use]
    pub fn placeholder(external_user_id: Option<String>, created_at: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            email: format!("vehicle_user_{}@{PLACEHOLDER_EMAIL_DOMAIN}", id.simple()),
            name: PLACEHOLDER_USER_NAME.to_owned(),
            external_user_id,
            created_at,
            last_login_at: None,
        }
    }

    /// Whether the email is a generated placeholder
    #[must_use]
    pub fn has_placeholder_email(&self) -> bool {
        self.email.ends_with(&format!("@{PLACEHOLDER_EMAIL_DOMAIN}"))
    }
}
