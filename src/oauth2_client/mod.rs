// ABOUTME: OAuth2 client module for provider authorization, token grants and PKCE
// ABOUTME: Groups the provider client seam, the token codec and PKCE/state generation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! `OAuth2` client side of the broker
//!
//! Everything here is stateless: generating correlation values, talking to the
//! provider's endpoints, and decoding what comes back. Session state and token
//! persistence live in [`crate::oauth`].

/// Provider `OAuth` client trait and Tesla implementation
pub mod client;
/// `PKCE` verifier/challenge and state generation
pub mod pkce;
/// Token response decoding
pub mod token_codec;

pub use client::{OAuthClientError, OAuthProviderClient, TeslaOAuthClient};
pub use pkce::{generate_state, PkceParams};
pub use token_codec::{
    parse_token_response, IdentityClaims, RawTokenResponse, TokenCodecError, TokenGrant,
};
