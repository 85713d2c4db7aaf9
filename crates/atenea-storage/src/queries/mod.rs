// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for operations on storage entities.

pub mod attentions;
pub mod catalog;
pub mod citizens;
pub mod handoffs;
pub mod messages;
pub mod presence;
pub mod records;
pub mod rooms;
