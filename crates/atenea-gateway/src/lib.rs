// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the contact center.
//!
//! Channel relays post normalized inbound events here, and agent desktops
//! drive rooms, attentions, records and presence through the `/v1` REST
//! API. Every route is a thin wrapper over one
//! [`ContactCenter`](atenea_engine::ContactCenter) operation.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, ServerConfig, build_router, start_server};
