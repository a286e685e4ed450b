// ABOUTME: HTTP middleware for app session authentication and CORS
// ABOUTME: Request tracing and request ids are layered on in the server module
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod auth;
pub mod cors;

// Authentication middleware
pub use auth::{AppSessionAuth, AuthResult};

// CORS configuration
pub use cors::setup_cors;
