// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `atenea-core::models` for use across
//! adapter trait boundaries. This module re-exports them and holds the row
//! mapping helpers shared by the query modules.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;

pub use atenea_core::models::*;

/// Audit columns in the order [`audit_from_row`] reads them.
pub(crate) const AUDIT_COLUMNS: &str =
    "created_by, updated_by, deleted_by, created_at, updated_at, deleted_at";

/// Read the six audit columns starting at `start`.
pub(crate) fn audit_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<AuditMeta> {
    Ok(AuditMeta {
        created_by: row.get(start)?,
        updated_by: row.get(start + 1)?,
        deleted_by: row.get(start + 2)?,
        created_at: row.get(start + 3)?,
        updated_at: row.get(start + 4)?,
        deleted_at: row.get(start + 5)?,
    })
}

/// Read a TEXT column into a strum-backed enum.
pub(crate) fn enum_from_row<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a non-negative INTEGER column into a `u32`.
pub(crate) fn u32_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}
