// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony presence: vicidial users and their immutable state history.

use atenea_core::AteneaError;
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{AUDIT_COLUMNS, PresenceRecord, VicidialUser, audit_from_row};
use crate::writer::ensure_actor;

fn user_sql(filter: &str) -> String {
    format!(
        "SELECT id, username, phone_login, user_id, channel_state_id, pause_code, {AUDIT_COLUMNS}
         FROM vicidial_users WHERE {filter}"
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<VicidialUser> {
    Ok(VicidialUser {
        id: row.get(0)?,
        username: row.get(1)?,
        phone_login: row.get(2)?,
        user_id: row.get(3)?,
        channel_state_id: row.get(4)?,
        pause_code: row.get(5)?,
        audit: audit_from_row(row, 6)?,
    })
}

const RECORD_COLUMNS: &str = "id, vicidial_user_id, old_channel_state_id, new_channel_state_id,
     old_pause_code, new_pause_code, start_time, end_time, duration, created_by";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<PresenceRecord> {
    Ok(PresenceRecord {
        id: row.get(0)?,
        vicidial_user_id: row.get(1)?,
        old_channel_state_id: row.get(2)?,
        new_channel_state_id: row.get(3)?,
        old_pause_code: row.get(4)?,
        new_pause_code: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        duration: row.get(8)?,
        created_by: row.get(9)?,
    })
}

pub async fn create_user(db: &Database, user: VicidialUser) -> Result<(), AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &user.audit.created_by)?;
            ensure_actor(&tx, &user.user_id)?;
            tx.execute(
                "INSERT INTO vicidial_users (id, username, phone_login, user_id, channel_state_id,
                                             pause_code, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.id,
                    user.username,
                    user.phone_login,
                    user.user_id,
                    user.channel_state_id,
                    user.pause_code,
                    user.audit.created_by,
                    user.audit.created_at,
                    user.audit.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, id: &str) -> Result<Option<VicidialUser>, AteneaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &user_sql("id = ?1 AND deleted_at IS NULL"),
                params![id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The vicidial user bound to an agent actor id.
pub async fn find_by_actor(
    db: &Database,
    user_id: &str,
) -> Result<Option<VicidialUser>, AteneaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &user_sql("user_id = ?1 AND deleted_at IS NULL"),
                params![user_id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn last_record(
    db: &Database,
    vicidial_user_id: &str,
) -> Result<Option<PresenceRecord>, AteneaError> {
    let vicidial_user_id = vicidial_user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM vicidial_user_history
                     WHERE vicidial_user_id = ?1 ORDER BY seq DESC LIMIT 1"
                ),
                params![vicidial_user_id],
                record_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert the history row and move the user to its new state together.
///
/// The user update is guarded on the record's old state; when the guard
/// fails the transaction is dropped and `false` is returned. Any SQLite
/// failure on either write rolls both back.
pub async fn record_transition(db: &Database, record: PresenceRecord) -> Result<bool, AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &record.created_by)?;
            tx.execute(
                &format!(
                    "INSERT INTO vicidial_user_history ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    record.id,
                    record.vicidial_user_id,
                    record.old_channel_state_id,
                    record.new_channel_state_id,
                    record.old_pause_code,
                    record.new_pause_code,
                    record.start_time,
                    record.end_time,
                    record.duration,
                    record.created_by,
                ],
            )?;
            let changed = tx.execute(
                "UPDATE vicidial_users
                 SET channel_state_id = ?1, pause_code = ?2, updated_by = ?3, updated_at = ?4
                 WHERE id = ?5 AND channel_state_id = ?6 AND pause_code IS ?7
                   AND deleted_at IS NULL",
                params![
                    record.new_channel_state_id,
                    record.new_pause_code,
                    record.created_by,
                    record.end_time,
                    record.vicidial_user_id,
                    record.old_channel_state_id,
                    record.old_pause_code,
                ],
            )?;
            if changed == 0 {
                debug!(
                    vicidial_user_id = %record.vicidial_user_id,
                    "presence state moved concurrently, transition dropped"
                );
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Presence history, oldest first.
pub async fn history(
    db: &Database,
    vicidial_user_id: &str,
) -> Result<Vec<PresenceRecord>, AteneaError> {
    let vicidial_user_id = vicidial_user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM vicidial_user_history
                 WHERE vicidial_user_id = ?1 ORDER BY seq ASC"
            ))?;
            let rows = stmt.query_map(params![vicidial_user_id], record_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
