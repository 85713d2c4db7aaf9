// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Atenea contact-center core.
//!
//! This crate provides the foundational trait definitions, error types,
//! entity models, and wire types used throughout the Atenea workspace. All
//! collaborator adapters implement traits defined here.

pub mod clock;
pub mod error;
pub mod models;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::AteneaError;
pub use types::{AdapterType, HealthStatus, MessageId};

// Re-export all adapter traits at crate root.
pub use traits::{BotAdapter, BusinessCalendar, ChannelAdapter, PluginAdapter, StorageAdapter};
