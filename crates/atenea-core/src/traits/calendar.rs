// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business hours and holiday collaborator.

use chrono::{DateTime, Utc};

/// Decides whether the organization is attending at a given instant.
pub trait BusinessCalendar: Send + Sync + 'static {
    fn is_open(&self, at: DateTime<Utc>) -> bool;
}

/// Calendar that is always open.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl BusinessCalendar for AlwaysOpen {
    fn is_open(&self, _at: DateTime<Utc>) -> bool {
        true
    }
}
