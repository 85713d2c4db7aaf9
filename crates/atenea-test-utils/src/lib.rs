// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Atenea integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock channel adapter capturing outgoing commands
//! - [`MockBot`] - Mock bot engine with scripted replies
//! - [`ManualClock`] - Clock advanced explicitly by the test
//! - [`TestHarness`] - Contact center over a temp SQLite database

pub mod clock;
pub mod harness;
pub mod mock_bot;
pub mod mock_channel;

pub use clock::ManualClock;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_bot::MockBot;
pub use mock_channel::MockChannel;
