// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attention operations.

use atenea_core::AteneaError;
use atenea_core::types::{RoomStatus, format_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    AUDIT_COLUMNS, Attention, NewAttention, OpenedAttention, audit_from_row, enum_from_row,
};
use crate::queries::rooms;
use crate::writer::ensure_actor;

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, room_id, consult_type_id, attention_detail, status, start_date, end_date,
                close_reason, {AUDIT_COLUMNS}
         FROM attentions WHERE {filter}"
    )
}

fn attention_from_row(row: &Row<'_>) -> rusqlite::Result<Attention> {
    Ok(Attention {
        id: row.get(0)?,
        room_id: row.get(1)?,
        consult_type_id: row.get(2)?,
        attention_detail: row.get(3)?,
        status: enum_from_row(row, 4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        close_reason: row.get(7)?,
        audit: audit_from_row(row, 8)?,
    })
}

/// Return the room's open attention, inserting `attention` when there is none.
pub async fn open_or_get(
    db: &Database,
    attention: NewAttention,
) -> Result<OpenedAttention, AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let room = match rooms::get_tx(&tx, &attention.room_id)? {
                Some(room) => room,
                None => return Ok(Err(AteneaError::not_found("room", &attention.room_id))),
            };
            if room.status == RoomStatus::Completed {
                return Ok(Err(AteneaError::invalid_transition(
                    "room",
                    &room.id,
                    "completed rooms accept no new attentions",
                )));
            }
            ensure_actor(&tx, &attention.audit.created_by)?;
            let inserted = tx.execute(
                "INSERT INTO attentions (id, room_id, status, start_date, created_by, created_at,
                                         updated_at)
                 VALUES (?1, ?2, 'identity_verification', ?3, ?4, ?5, ?6)
                 ON CONFLICT DO NOTHING",
                params![
                    attention.id,
                    attention.room_id,
                    attention.start_date,
                    attention.audit.created_by,
                    attention.audit.created_at,
                    attention.audit.updated_at,
                ],
            )?;
            let stored = tx.query_row(
                &select_sql("room_id = ?1 AND status != 'closed' AND deleted_at IS NULL"),
                params![attention.room_id],
                attention_from_row,
            )?;
            tx.commit()?;
            Ok(Ok(OpenedAttention {
                attention: stored,
                created: inserted == 1,
            }))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn get(db: &Database, id: &str) -> Result<Option<Attention>, AteneaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &select_sql("id = ?1 AND deleted_at IS NULL"),
                params![id],
                attention_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The room's non-closed attention.
pub async fn open_for_room(
    db: &Database,
    room_id: &str,
) -> Result<Option<Attention>, AteneaError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &select_sql("room_id = ?1 AND status != 'closed' AND deleted_at IS NULL"),
                params![room_id],
                attention_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The most recently started attention of the room, open or not.
pub async fn latest_for_room(
    db: &Database,
    room_id: &str,
) -> Result<Option<Attention>, AteneaError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &select_sql(
                    "room_id = ?1 AND deleted_at IS NULL
                     ORDER BY start_date DESC, created_at DESC LIMIT 1",
                ),
                params![room_id],
                attention_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Record the consult type and move the attention to in_progress.
///
/// A `None` detail keeps whatever detail was stored before.
pub async fn classify(
    db: &Database,
    id: &str,
    consult_type_id: i64,
    detail: Option<String>,
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
                "UPDATE attentions
                 SET consult_type_id = ?1, attention_detail = COALESCE(?2, attention_detail),
                     status = 'in_progress', updated_by = ?3, updated_at = ?4
                 WHERE id = ?5 AND status != 'closed' AND deleted_at IS NULL",
                params![consult_type_id, detail, actor, at, id],
            )?;
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Close the attention. Returns `false` when it was already closed.
pub async fn close(
    db: &Database,
    id: &str,
    close_reason: Option<String>,
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
                "UPDATE attentions
                 SET status = 'closed', end_date = ?1, close_reason = ?2,
                     updated_by = ?3, updated_at = ?1
                 WHERE id = ?4 AND status != 'closed' AND deleted_at IS NULL",
                params![at, close_reason, actor, id],
            )?;
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of non-closed attentions in the room. At most one by construction.
pub async fn count_open(db: &Database, room_id: &str) -> Result<u64, AteneaError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM attentions
                 WHERE room_id = ?1 AND status != 'closed' AND deleted_at IS NULL",
                params![room_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}
