// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Exposes the environment-driven ServerConfig and its typed sections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the Fleet Auth Broker
//!
//! All runtime settings come from environment variables (optionally seeded from a
//! `.env` file) and are validated once at startup.

/// Environment and server configuration
pub mod environment;

pub use environment::{
    AuthConfig, DatabaseUrl, Environment, LogLevel, ServerConfig, SessionBackend,
    SessionStoreConfig, TeslaConfig,
};
