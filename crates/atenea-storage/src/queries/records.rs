// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only query history and one-per-attention surveys.

use atenea_core::AteneaError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{AUDIT_COLUMNS, QueryRecord, Survey, audit_from_row, enum_from_row};
use crate::writer::{ensure_actor, ensure_actor_opt};

pub async fn insert_query(db: &Database, record: QueryRecord) -> Result<(), AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &record.audit.created_by)?;
            tx.execute(
                "INSERT INTO query_history (id, attention_id, query_type, document_type,
                                            document_value, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.attention_id,
                    record.query_type.to_string(),
                    record.document_type,
                    record.document_value,
                    record.audit.created_by,
                    record.audit.created_at,
                    record.audit.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Queries performed during an attention, oldest first.
pub async fn list_queries(
    db: &Database,
    attention_id: &str,
) -> Result<Vec<QueryRecord>, AteneaError> {
    let attention_id = attention_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, attention_id, query_type, document_type, document_value, {AUDIT_COLUMNS}
                 FROM query_history WHERE attention_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![attention_id], |row| {
                Ok(QueryRecord {
                    id: row.get(0)?,
                    attention_id: row.get(1)?,
                    query_type: enum_from_row(row, 2)?,
                    document_type: row.get(3)?,
                    document_value: row.get(4)?,
                    audit: audit_from_row(row, 5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a survey. Returns `false` when the attention already has one.
pub async fn insert_survey(db: &Database, survey: Survey) -> Result<bool, AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &survey.audit.created_by)?;
            ensure_actor_opt(&tx, survey.user_id.as_deref())?;
            let inserted = tx.execute(
                "INSERT INTO surveys (id, attention_id, room_id, citizen_id, user_id, rating,
                                      comment, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(attention_id) DO NOTHING",
                params![
                    survey.id,
                    survey.attention_id,
                    survey.room_id,
                    survey.citizen_id,
                    survey.user_id,
                    survey.rating,
                    survey.comment,
                    survey.audit.created_by,
                    survey.audit.created_at,
                    survey.audit.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_survey(db: &Database, attention_id: &str) -> Result<Option<Survey>, AteneaError> {
    let attention_id = attention_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT id, attention_id, room_id, citizen_id, user_id, rating, comment,
                            {AUDIT_COLUMNS}
                     FROM surveys WHERE attention_id = ?1 AND deleted_at IS NULL"
                ),
                params![attention_id],
                |row| {
                    Ok(Survey {
                        id: row.get(0)?,
                        attention_id: row.get(1)?,
                        room_id: row.get(2)?,
                        citizen_id: row.get(3)?,
                        user_id: row.get(4)?,
                        rating: row.get(5)?,
                        comment: row.get(6)?,
                        audit: audit_from_row(row, 7)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditMeta, SYSTEM_ACTOR};
    use crate::queries::test_support::{at, seed_attention, setup_db};
    use atenea_core::types::QueryType;

    fn query(id: &str, minute: u32) -> QueryRecord {
        QueryRecord {
            id: id.into(),
            attention_id: "a1".into(),
            query_type: QueryType::TicketsByPlate,
            document_type: "PLATE".into(),
            document_value: "ABC-123".into(),
            audit: AuditMeta::created("agent-1", at(minute)),
        }
    }

    fn survey(id: &str, rating: u8) -> Survey {
        Survey {
            id: id.into(),
            attention_id: "a1".into(),
            room_id: "r1".into(),
            citizen_id: "c1".into(),
            user_id: Some("agent-1".into()),
            rating,
            comment: Some("gracias".into()),
            audit: AuditMeta::created(SYSTEM_ACTOR, at(9)),
        }
    }

    #[tokio::test]
    async fn query_history_is_append_only() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;
        insert_query(&db, query("q1", 3)).await.unwrap();
        insert_query(&db, query("q2", 4)).await.unwrap();
        let records = list_queries(&db, "a1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query_type, QueryType::TicketsByPlate);

        let delete = db
            .connection()
            .call(|conn| conn.execute("DELETE FROM query_history WHERE id = 'q1'", []))
            .await;
        assert!(delete.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn one_survey_per_attention() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;
        assert!(insert_survey(&db, survey("s1", 5)).await.unwrap());
        assert!(!insert_survey(&db, survey("s2", 1)).await.unwrap());
        let stored = get_survey(&db, "a1").await.unwrap().unwrap();
        assert_eq!(stored.id, "s1");
        assert_eq!(stored.rating, 5);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected_by_schema() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;
        assert!(insert_survey(&db, survey("s1", 6)).await.is_err());
        db.close().await.unwrap();
    }
}
