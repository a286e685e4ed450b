// ABOUTME: Utility modules for common functionality across the application
// ABOUTME: Contains shared HTTP clients, request signing, and injectable clocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Injectable wall clock for expiry and TTL decisions
pub mod clock;
/// HTTP client configuration and bearer request signing
pub mod http_client;
