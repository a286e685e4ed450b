// ABOUTME: PKCE and state generation for authorization code flows
// ABOUTME: Produces random correlation states and S256 verifier/challenge pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::constants::oauth::{CODE_CHALLENGE_METHOD, CODE_VERIFIER_BYTES, STATE_BYTES};

/// Generate a fresh `OAuth` state value (128 bits, hex encoded)
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `PKCE` (Proof Key for Code Exchange) parameters for one authorization attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceParams {
    /// Random code verifier, kept server side until the callback
    pub code_verifier: String,
    /// SHA256 hash of the code verifier, base64url encoded
    pub code_challenge: String,
    /// Challenge method (always `S256`)
    pub code_challenge_method: String,
}

impl PkceParams {
    /// Generate `PKCE` parameters with the `S256` challenge method
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; CODE_VERIFIER_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let code_verifier = URL_SAFE_NO_PAD.encode(bytes);
        let code_challenge = Self::challenge_for(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: CODE_CHALLENGE_METHOD.into(),
        }
    }

    /// Compute the `S256` challenge for a verifier
    #[must_use]
    pub fn challenge_for(code_verifier: &str) -> String {
        let hash = Sha256::digest(code_verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hash)
    }
}
