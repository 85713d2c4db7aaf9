// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room operations: conditional find-or-create, guarded status moves,
//! handoff flag updates and the completion cascade.

use atenea_core::AteneaError;
use atenea_core::types::{AttentionStatus, Handler, RoomStatus, format_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{
    AUDIT_COLUMNS, CompletedRoom, HandoffEvent, NewRoom, Room, RoomFilter, audit_from_row,
    enum_from_row, u32_from_row,
};
use crate::queries::handoffs;
use crate::writer::{ensure_actor, ensure_actor_opt};

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, channel, external_room_id, citizen_id, user_id, bot_replies, status,
                failed_bot_turns, {AUDIT_COLUMNS}
         FROM rooms WHERE {filter}"
    )
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        channel: row.get(1)?,
        external_room_id: row.get(2)?,
        citizen_id: row.get(3)?,
        user_id: row.get(4)?,
        bot_replies: row.get(5)?,
        status: enum_from_row(row, 6)?,
        failed_bot_turns: u32_from_row(row, 7)?,
        audit: audit_from_row(row, 8)?,
    })
}

pub(crate) fn get_tx(conn: &Connection, id: &str) -> rusqlite::Result<Option<Room>> {
    conn.query_row(
        &select_sql("id = ?1 AND deleted_at IS NULL"),
        params![id],
        room_from_row,
    )
    .optional()
}

/// Return the non-completed room for (channel, citizen) or create it.
///
/// The insert is conditional on the partial unique index over active rooms,
/// so concurrent callers converge on a single row.
pub async fn find_or_create(db: &Database, room: NewRoom) -> Result<Room, AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &room.audit.created_by)?;
            let inserted = tx.execute(
                "INSERT INTO rooms (id, channel, external_room_id, citizen_id, bot_replies, status,
                                    failed_bot_turns, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, 'pending', 0, ?5, ?6, ?7)
                 ON CONFLICT DO NOTHING",
                params![
                    room.id,
                    room.channel,
                    room.external_room_id,
                    room.citizen_id,
                    room.audit.created_by,
                    room.audit.created_at,
                    room.audit.updated_at,
                ],
            )?;
            let stored = tx.query_row(
                &select_sql(
                    "channel = ?1 AND citizen_id = ?2 AND status != 'completed' AND deleted_at IS NULL",
                ),
                params![room.channel, room.citizen_id],
                room_from_row,
            )?;
            tx.commit()?;
            debug!(room_id = %stored.id, created = inserted == 1, "room resolved");
            Ok(stored)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a room by ID. Soft-deleted rows are not returned.
pub async fn get(db: &Database, id: &str) -> Result<Option<Room>, AteneaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| get_tx(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// List rooms matching every set filter field, most recently updated first.
pub async fn list(db: &Database, filter: RoomFilter) -> Result<Vec<Room>, AteneaError> {
    let status = filter.status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let sql = select_sql(
                "deleted_at IS NULL
                   AND (?1 IS NULL OR status = ?1)
                   AND (?2 IS NULL OR user_id = ?2)
                   AND (?3 IS NULL OR channel = ?3)
                 ORDER BY updated_at DESC, created_at DESC",
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![status, filter.user_id, filter.channel],
                room_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Move the room from `expected` to `next`. Returns `false` when the guard fails.
pub async fn update_status(
    db: &Database,
    id: &str,
    expected: RoomStatus,
    next: RoomStatus,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<bool, AteneaError> {
    let id = id.to_string();
    let actor = actor.to_string();
    let at = format_timestamp(at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &actor)?;
            let changed = tx.execute(
                "UPDATE rooms SET status = ?1, updated_by = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = ?5 AND deleted_at IS NULL",
                params![next.to_string(), actor, at, id, expected.to_string()],
            )?;
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Complete the room, force-closing its open attentions, in one transaction.
///
/// Returns `None` (and writes nothing) when the room is not in `expected`.
pub async fn complete(
    db: &Database,
    id: &str,
    expected: RoomStatus,
    close_reason: &str,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<Option<CompletedRoom>, AteneaError> {
    let id = id.to_string();
    let close_reason = close_reason.to_string();
    let actor = actor.to_string();
    let at = format_timestamp(at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &actor)?;
            let changed = tx.execute(
                "UPDATE rooms SET status = 'completed', updated_by = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4 AND deleted_at IS NULL",
                params![actor, at, id, expected.to_string()],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            let force_closed: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM attentions
                     WHERE room_id = ?1 AND status != ?2 AND deleted_at IS NULL",
                )?;
                let rows = stmt.query_map(
                    params![id, AttentionStatus::Closed.to_string()],
                    |row| row.get(0),
                )?;
                rows.collect::<Result<_, _>>()?
            };
            tx.execute(
                "UPDATE attentions
                 SET status = 'closed', end_date = ?1, close_reason = ?2,
                     updated_by = ?3, updated_at = ?1
                 WHERE room_id = ?4 AND status != 'closed' AND deleted_at IS NULL",
                params![at, close_reason, actor, id],
            )?;

            let room = get_tx(&tx, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(CompletedRoom { room, force_closed }))
        })
        .await
        .map_err(map_tr_err)
}

/// Flip the handler and record the handoff event in one transaction.
///
/// Returns `None` (and writes nothing) when the room is completed, missing,
/// or not currently served by `event.from_handler`.
pub async fn apply_handoff(
    db: &Database,
    event: HandoffEvent,
    assign_user: Option<String>,
    actor: &str,
) -> Result<Option<Room>, AteneaError> {
    let actor = actor.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &actor)?;
            ensure_actor_opt(&tx, assign_user.as_deref())?;
            ensure_actor_opt(&tx, event.user_id.as_deref())?;

            let from_bot = event.from_handler == Handler::Bot;
            let to_bot = event.to_handler == Handler::Bot;
            let changed = tx.execute(
                "UPDATE rooms
                 SET bot_replies = ?1, user_id = COALESCE(user_id, ?2), failed_bot_turns = 0,
                     updated_by = ?3, updated_at = ?4
                 WHERE id = ?5 AND bot_replies = ?6 AND status != 'completed'
                   AND deleted_at IS NULL",
                params![
                    to_bot,
                    assign_user,
                    actor,
                    event.created_at,
                    event.room_id,
                    from_bot
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            handoffs::insert_tx(&tx, &event)?;
            let room = get_tx(&tx, &event.room_id)?;
            tx.commit()?;
            Ok(room)
        })
        .await
        .map_err(map_tr_err)
}

/// Assign an agent to an active, unassigned room.
pub async fn assign_user(
    db: &Database,
    id: &str,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<Option<Room>, AteneaError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    let at = format_timestamp(at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &user_id)?;
            let changed = tx.execute(
                "UPDATE rooms SET user_id = ?1, updated_by = ?1, updated_at = ?2
                 WHERE id = ?3 AND user_id IS NULL AND status != 'completed'
                   AND deleted_at IS NULL",
                params![user_id, at, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let room = get_tx(&tx, &id)?;
            tx.commit()?;
            Ok(room)
        })
        .await
        .map_err(map_tr_err)
}

/// Increment the failed bot turn counter and return the new value.
pub async fn record_failed_turn(
    db: &Database,
    id: &str,
    at: DateTime<Utc>,
) -> Result<u32, AteneaError> {
    let id = id.to_string();
    let at = format_timestamp(at);
    db.connection()
        .call(move |conn| {
            let count = conn
                .query_row(
                    "UPDATE rooms SET failed_bot_turns = failed_bot_turns + 1, updated_at = ?1
                     WHERE id = ?2 AND deleted_at IS NULL
                     RETURNING failed_bot_turns",
                    params![at, id],
                    |row| u32_from_row(row, 0),
                )
                .optional()?;
            Ok(count.ok_or_else(|| AteneaError::not_found("room", id)))
        })
        .await
        .map_err(map_tr_err)?
}

/// Reset the failed bot turn counter.
pub async fn reset_failed_turns(db: &Database, id: &str) -> Result<(), AteneaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE rooms SET failed_bot_turns = 0 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
