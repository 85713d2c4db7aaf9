// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff analytics events. Rows are written only by
//! [`crate::queries::rooms::apply_handoff`], inside its transaction.

use atenea_core::AteneaError;
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};
use crate::models::{HandoffEvent, enum_from_row};

pub(crate) fn insert_tx(conn: &Connection, event: &HandoffEvent) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO handoff_events (id, room_id, from_handler, to_handler, trigger_kind,
                                     user_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.id,
            event.room_id,
            event.from_handler.to_string(),
            event.to_handler.to_string(),
            event.trigger.to_string(),
            event.user_id,
            event.created_at,
        ],
    )?;
    Ok(())
}

/// Handoff events of a room in the order they happened.
pub async fn list(db: &Database, room_id: &str) -> Result<Vec<HandoffEvent>, AteneaError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, room_id, from_handler, to_handler, trigger_kind, user_id, created_at
                 FROM handoff_events WHERE room_id = ?1 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![room_id], |row| {
                Ok(HandoffEvent {
                    id: row.get(0)?,
                    room_id: row.get(1)?,
                    from_handler: enum_from_row(row, 2)?,
                    to_handler: enum_from_row(row, 3)?,
                    trigger: enum_from_row(row, 4)?,
                    user_id: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
