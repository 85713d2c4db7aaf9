// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ledger operations.
//!
//! Messages are append-only apart from the read flag. Ordering is by the
//! channel-reported timestamp with the insertion sequence as tie-breaker.

use atenea_core::AteneaError;
use atenea_core::types::format_timestamp;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{
    AUDIT_COLUMNS, AppendOutcome, Attachment, Message, NewMessage, audit_from_row, enum_from_row,
};
use crate::writer::{ensure_actor, ensure_actor_opt};

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT id, attention_id, room_id, channel, content, external_message_id, sender_type,
                sender_user_id, status, delivery, timestamp, read_by, read_at, seq,
                {AUDIT_COLUMNS}
         FROM messages WHERE {filter}"
    )
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        attention_id: row.get(1)?,
        room_id: row.get(2)?,
        channel: row.get(3)?,
        content: row.get(4)?,
        external_message_id: row.get(5)?,
        sender_type: enum_from_row(row, 6)?,
        sender_user_id: row.get(7)?,
        status: enum_from_row(row, 8)?,
        delivery: enum_from_row(row, 9)?,
        timestamp: row.get(10)?,
        read_by: row.get(11)?,
        read_at: row.get(12)?,
        seq: row.get(13)?,
        attachments: Vec::new(),
        audit: audit_from_row(row, 14)?,
    })
}

fn load_attachments(conn: &Connection, message: &mut Message) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, message_id, content, extension, size, kind
         FROM message_attachments WHERE message_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![message.id], |row| {
        Ok(Attachment {
            id: row.get(0)?,
            message_id: row.get(1)?,
            content: row.get(2)?,
            extension: row.get(3)?,
            size: row.get(4)?,
            kind: enum_from_row(row, 5)?,
        })
    })?;
    message.attachments = rows.collect::<Result<_, _>>()?;
    Ok(())
}

fn query_messages(
    conn: &Connection,
    filter: &str,
    key: &str,
) -> rusqlite::Result<Vec<Message>> {
    let mut stmt = conn.prepare(&select_sql(filter))?;
    let mut messages = stmt
        .query_map(params![key], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for message in &mut messages {
        load_attachments(conn, message)?;
    }
    Ok(messages)
}

fn get_tx(conn: &Connection, id: &str) -> rusqlite::Result<Option<Message>> {
    let message = conn
        .query_row(
            &select_sql("id = ?1 AND deleted_at IS NULL"),
            params![id],
            message_from_row,
        )
        .optional()?;
    match message {
        Some(mut message) => {
            load_attachments(conn, &mut message)?;
            Ok(Some(message))
        }
        None => Ok(None),
    }
}

/// Append a message and its attachments in one transaction.
///
/// When the (channel, external message id) pair is already recorded the
/// stored message is returned with `replayed = true` and nothing is written.
pub async fn append(db: &Database, message: NewMessage) -> Result<AppendOutcome, AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            if let Some(external_id) = &message.external_message_id {
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT id FROM messages WHERE channel = ?1 AND external_message_id = ?2",
                        params![message.channel, external_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(existing) = existing {
                    let stored =
                        get_tx(&tx, &existing)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
                    debug!(
                        message_id = %stored.id,
                        external_id = %external_id,
                        "duplicate inbound message replayed"
                    );
                    return Ok(AppendOutcome {
                        message: stored,
                        replayed: true,
                    });
                }
            }

            ensure_actor(&tx, &message.audit.created_by)?;
            ensure_actor_opt(&tx, message.sender_user_id.as_deref())?;
            tx.execute(
                "INSERT INTO messages (id, attention_id, room_id, channel, content,
                                       external_message_id, sender_type, sender_user_id, status,
                                       delivery, timestamp, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    message.id,
                    message.attention_id,
                    message.room_id,
                    message.channel,
                    message.content,
                    message.external_message_id,
                    message.sender_type.to_string(),
                    message.sender_user_id,
                    message.status.to_string(),
                    message.delivery.to_string(),
                    message.timestamp,
                    message.audit.created_by,
                    message.audit.created_at,
                    message.audit.updated_at,
                ],
            )?;
            for attachment in &message.attachments {
                tx.execute(
                    "INSERT INTO message_attachments (id, message_id, content, extension, size, kind)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        attachment.id,
                        message.id,
                        attachment.content,
                        attachment.extension,
                        attachment.size,
                        attachment.kind.to_string(),
                    ],
                )?;
            }
            let stored = get_tx(&tx, &message.id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(AppendOutcome {
                message: stored,
                replayed: false,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: &str) -> Result<Option<Message>, AteneaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| get_tx(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// The message recorded under (channel, external message id).
pub async fn find_by_external_id(
    db: &Database,
    channel: &str,
    external_message_id: &str,
) -> Result<Option<Message>, AteneaError> {
    let channel = channel.to_string();
    let external_message_id = external_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM messages WHERE channel = ?1 AND external_message_id = ?2",
                    params![channel, external_message_id],
                    |row| row.get(0),
                )
                .optional()?;
            match id {
                Some(id) => get_tx(conn, &id),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Flip unread messages to read. Already-read ids are left untouched.
pub async fn mark_read(
    db: &Database,
    ids: Vec<String>,
    reader: &str,
    at: DateTime<Utc>,
) -> Result<u64, AteneaError> {
    let reader = reader.to_string();
    let at = format_timestamp(at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_actor(&tx, &reader)?;
            let mut changed = 0u64;
            {
                let mut stmt = tx.prepare(
                    "UPDATE messages
                     SET status = 'read', read_by = ?1, read_at = ?2,
                         updated_by = ?1, updated_at = ?2
                     WHERE id = ?3 AND status = 'unread' AND deleted_at IS NULL",
                )?;
                for id in &ids {
                    changed += stmt.execute(params![reader, at, id])? as u64;
                }
            }
            tx.commit()?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Unread citizen-authored messages in the room.
pub async fn unread_count(db: &Database, room_id: &str) -> Result<u64, AteneaError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE room_id = ?1 AND sender_type = 'citizen' AND status = 'unread'
                   AND deleted_at IS NULL",
                params![room_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}

/// Room messages across all attentions, oldest first.
pub async fn list_for_room(db: &Database, room_id: &str) -> Result<Vec<Message>, AteneaError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            query_messages(
                conn,
                "room_id = ?1 AND deleted_at IS NULL ORDER BY timestamp ASC, seq ASC",
                &room_id,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Attention messages, oldest first.
pub async fn list_for_attention(
    db: &Database,
    attention_id: &str,
) -> Result<Vec<Message>, AteneaError> {
    let attention_id = attention_id.to_string();
    db.connection()
        .call(move |conn| {
            query_messages(
                conn,
                "attention_id = ?1 AND deleted_at IS NULL ORDER BY timestamp ASC, seq ASC",
                &attention_id,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// The newest message of the room by the ledger ordering.
pub async fn last_for_room(db: &Database, room_id: &str) -> Result<Option<Message>, AteneaError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = query_messages(
                conn,
                "room_id = ?1 AND deleted_at IS NULL ORDER BY timestamp DESC, seq DESC LIMIT 1",
                &room_id,
            )?;
            Ok(messages.pop())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditMeta, SYSTEM_ACTOR};
    use crate::queries::test_support::{at, seed_attention, setup_db};
    use atenea_core::types::{AttachmentType, Delivery, MessageStatus, SenderType};

    fn inbound(id: &str, external: Option<&str>, minute: u32) -> NewMessage {
        NewMessage {
            id: id.into(),
            attention_id: "a1".into(),
            room_id: "r1".into(),
            channel: "whatsapp".into(),
            content: format!("hola {id}"),
            external_message_id: external.map(String::from),
            sender_type: SenderType::Citizen,
            sender_user_id: None,
            status: MessageStatus::Unread,
            delivery: Delivery::Received,
            timestamp: format_timestamp(at(minute)),
            attachments: Vec::new(),
            audit: AuditMeta::created(SYSTEM_ACTOR, at(minute)),
        }
    }

    #[tokio::test]
    async fn duplicate_external_id_is_replayed() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;

        let first = append(&db, inbound("m1", Some("wamid.1"), 2)).await.unwrap();
        assert!(!first.replayed);
        let again = append(&db, inbound("m2", Some("wamid.1"), 3)).await.unwrap();
        assert!(again.replayed);
        assert_eq!(again.message.id, "m1");
        let found = find_by_external_id(&db, "whatsapp", "wamid.1").await.unwrap().unwrap();
        assert_eq!(found.id, "m1");
        assert!(find_by_external_id(&db, "telegram", "wamid.1").await.unwrap().is_none());
        assert_eq!(list_for_room(&db, "r1").await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ordering_uses_timestamp_then_insertion() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;
        append(&db, inbound("late", None, 9)).await.unwrap();
        append(&db, inbound("tie-a", None, 4)).await.unwrap();
        append(&db, inbound("tie-b", None, 4)).await.unwrap();
        append(&db, inbound("early", None, 2)).await.unwrap();

        let ids: Vec<String> = list_for_attention(&db, "a1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["early", "tie-a", "tie-b", "late"]);
        let last = last_for_room(&db, "r1").await.unwrap().unwrap();
        assert_eq!(last.id, "late");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn attachments_are_stored_with_message() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;
        let mut msg = inbound("m1", None, 2);
        msg.attachments.push(Attachment {
            id: "att1".into(),
            message_id: "m1".into(),
            content: "aGVsbG8=".into(),
            extension: "txt".into(),
            size: 5,
            kind: AttachmentType::File,
        });
        append(&db, msg).await.unwrap();
        let stored = get(&db, "m1").await.unwrap().unwrap();
        assert_eq!(stored.attachments.len(), 1);
        assert_eq!(stored.attachments[0].size, 5);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_read_counts_only_unread_citizen_messages() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;
        append(&db, inbound("m1", None, 2)).await.unwrap();
        append(&db, inbound("m2", None, 3)).await.unwrap();
        let mut reply = inbound("m3", None, 4);
        reply.sender_type = SenderType::Agent;
        reply.sender_user_id = Some("agent-1".into());
        reply.delivery = Delivery::Sent;
        append(&db, reply).await.unwrap();

        assert_eq!(unread_count(&db, "r1").await.unwrap(), 2);
        let changed = mark_read(&db, vec!["m1".into(), "m1".into()], "agent-1", at(5))
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(unread_count(&db, "r1").await.unwrap(), 1);

        let read = get(&db, "m1").await.unwrap().unwrap();
        assert_eq!(read.status, MessageStatus::Read);
        assert_eq!(read.read_by.as_deref(), Some("agent-1"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn content_cannot_be_rewritten() {
        let (db, _dir) = setup_db().await;
        seed_attention(&db).await;
        append(&db, inbound("m1", None, 2)).await.unwrap();
        let result = db
            .connection()
            .call(|conn| conn.execute("UPDATE messages SET content = 'x' WHERE id = 'm1'", []))
            .await;
        assert!(result.is_err());
        db.close().await.unwrap();
    }
}
