// ABOUTME: Core data models for users, provider tokens, vehicles and telemetry
// ABOUTME: Re-exports the persisted record types shared by the database and the lifecycle manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Records persisted by the broker. Every record is owned by exactly one user except
//! telemetry events, which are keyed by VIN.
//!
//! - `User`: an app account, created lazily on the first successful `OAuth` callback
//! - `TokenRecord`: the single provider token row held per user
//! - `Vehicle`: a vehicle seen in the user's Fleet API vehicle list
//! - `TelemetryEvent`: an append-only telemetry payload

/// Provider token records
pub mod oauth;
/// Append-only telemetry events
pub mod telemetry;
/// App user accounts
pub mod user;
/// Vehicles synchronized from the provider
pub mod vehicle;

pub use oauth::{TokenRecord, TokenSummary};
pub use telemetry::{NewTelemetryEvent, TelemetryEvent};
pub use user::User;
pub use vehicle::{NewVehicle, Vehicle};
