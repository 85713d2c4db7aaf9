// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Citizen identity operations.

use atenea_core::AteneaError;
use atenea_core::types::format_timestamp;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{AUDIT_COLUMNS, Citizen, NewCitizen, audit_from_row};
use crate::writer::ensure_actor;

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, channel, external_user_id, document_type, document_number, name, full_name,
                phone, email, is_external, {AUDIT_COLUMNS}
         FROM citizens WHERE {filter}"
    )
}

fn citizen_from_row(row: &Row<'_>) -> rusqlite::Result<Citizen> {
    Ok(Citizen {
        id: row.get(0)?,
        channel: row.get(1)?,
        external_user_id: row.get(2)?,
        document_type: row.get(3)?,
        document_number: row.get(4)?,
        name: row.get(5)?,
        full_name: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
        is_external: row.get(9)?,
        audit: audit_from_row(row, 10)?,
    })
}

/// Return the citizen for (channel, external user id), inserting it when
/// absent. Contact fields already stored are never overwritten.
pub async fn find_or_create(db: &Database, citizen: NewCitizen) -> Result<Citizen, AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &citizen.audit.created_by)?;
            tx.execute(
                "INSERT INTO citizens (id, channel, external_user_id, name, full_name, phone, email,
                                       is_external, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?10)
                 ON CONFLICT(channel, external_user_id) DO UPDATE SET
                     name = COALESCE(citizens.name, excluded.name),
                     full_name = COALESCE(citizens.full_name, excluded.full_name),
                     phone = COALESCE(citizens.phone, excluded.phone),
                     email = COALESCE(citizens.email, excluded.email)",
                params![
                    citizen.id,
                    citizen.channel,
                    citizen.external_user_id,
                    citizen.name,
                    citizen.full_name,
                    citizen.phone,
                    citizen.email,
                    citizen.audit.created_by,
                    citizen.audit.created_at,
                    citizen.audit.updated_at,
                ],
            )?;
            let stored = tx.query_row(
                &select_sql("channel = ?1 AND external_user_id = ?2"),
                params![citizen.channel, citizen.external_user_id],
                citizen_from_row,
            )?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a citizen by ID. Soft-deleted rows are not returned.
pub async fn get(db: &Database, id: &str) -> Result<Option<Citizen>, AteneaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &select_sql("id = ?1 AND deleted_at IS NULL"),
                params![id],
                citizen_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Find the citizen holding a verified document.
pub async fn find_by_document(
    db: &Database,
    document_type: &str,
    document_number: &str,
) -> Result<Option<Citizen>, AteneaError> {
    let document_type = document_type.to_string();
    let document_number = document_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &select_sql("document_type = ?1 AND document_number = ?2 AND deleted_at IS NULL"),
                params![document_type, document_number],
                citizen_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Set the document identity if none is set. Returns `false` otherwise.
pub async fn set_document(
    db: &Database,
    id: &str,
    document_type: &str,
    document_number: &str,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<bool, AteneaError> {
    let id = id.to_string();
    let document_type = document_type.to_string();
    let document_number = document_number.to_string();
    let actor = actor.to_string();
    let at = format_timestamp(at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &actor)?;
            let changed = tx.execute(
                "UPDATE citizens
                 SET document_type = ?1, document_number = ?2, is_external = 0,
                     updated_by = ?3, updated_at = ?4
                 WHERE id = ?5 AND document_number IS NULL AND deleted_at IS NULL",
                params![document_type, document_number, actor, at, id],
            )?;
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
