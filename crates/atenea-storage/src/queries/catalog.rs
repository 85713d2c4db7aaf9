// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup tables synced from configuration: channels, consult types,
//! telephony channel states and automatic messages.

use atenea_core::AteneaError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{AutomaticMessage, ChannelInfo, ChannelState, ConsultType, u32_from_row};

/// Upsert channel rows. Rows absent from `channels` are kept because
/// citizens, rooms and messages reference them.
pub async fn sync_channels(db: &Database, channels: Vec<ChannelInfo>) -> Result<(), AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for channel in &channels {
                tx.execute(
                    "INSERT INTO channels (code, name, category) VALUES (?1, ?2, ?3)
                     ON CONFLICT(code) DO UPDATE SET name = excluded.name, category = excluded.category",
                    params![channel.code, channel.name, channel.category],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_channel(db: &Database, code: &str) -> Result<Option<ChannelInfo>, AteneaError> {
    let code = code.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT code, name, category FROM channels WHERE code = ?1",
                params![code],
                |row| {
                    Ok(ChannelInfo {
                        code: row.get(0)?,
                        name: row.get(1)?,
                        category: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_channels(db: &Database) -> Result<Vec<ChannelInfo>, AteneaError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT code, name, category FROM channels ORDER BY code")?;
            let rows = stmt.query_map([], |row| {
                Ok(ChannelInfo {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Upsert consult type rows.
pub async fn sync_consult_types(
    db: &Database,
    types: Vec<ConsultType>,
) -> Result<(), AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for ct in &types {
                tx.execute(
                    "INSERT INTO consult_types (id, name) VALUES (?1, ?2)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                    params![ct.id, ct.name],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_consult_type(db: &Database, id: i64) -> Result<Option<ConsultType>, AteneaError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name FROM consult_types WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ConsultType {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Upsert telephony channel state rows.
pub async fn sync_channel_states(
    db: &Database,
    states: Vec<ChannelState>,
) -> Result<(), AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for state in &states {
                tx.execute(
                    "INSERT INTO channel_states (id, name, category) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name, category = excluded.category",
                    params![state.id, state.name, state.category],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_channel_state(
    db: &Database,
    id: &str,
) -> Result<Option<ChannelState>, AteneaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, category FROM channel_states WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ChannelState {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        category: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the automatic message catalog in one transaction.
pub async fn sync_automatic_messages(
    db: &Database,
    messages: Vec<AutomaticMessage>,
) -> Result<(), AteneaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM automatic_messages", [])?;
            for msg in &messages {
                tx.execute(
                    "INSERT INTO automatic_messages (channel_category, name, position, description)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![msg.channel_category, msg.name, msg.position, msg.description],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Variants for (channel category, name), ordered by position.
pub async fn automatic_messages(
    db: &Database,
    channel_category: &str,
    name: &str,
) -> Result<Vec<AutomaticMessage>, AteneaError> {
    let channel_category = channel_category.to_string();
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT channel_category, name, position, description
                 FROM automatic_messages
                 WHERE channel_category = ?1 AND name = ?2
                 ORDER BY position ASC",
            )?;
            let rows = stmt.query_map(params![channel_category, name], |row| {
                Ok(AutomaticMessage {
                    channel_category: row.get(0)?,
                    name: row.get(1)?,
                    position: u32_from_row(row, 2)?,
                    description: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn seeded_channels_are_present_and_overridable() {
        let (db, _dir) = setup_db().await;
        let all = list_channels(&db).await.unwrap();
        assert_eq!(all.len(), 7);

        sync_channels(
            &db,
            vec![ChannelInfo {
                code: "whatsapp".into(),
                name: "WhatsApp Business".into(),
                category: "chat".into(),
            }],
        )
        .await
        .unwrap();
        let wa = get_channel(&db, "whatsapp").await.unwrap().unwrap();
        assert_eq!(wa.name, "WhatsApp Business");
        assert_eq!(wa.category, "chat");
        assert!(get_channel(&db, "fax").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn automatic_messages_replace_and_order() {
        let (db, _dir) = setup_db().await;
        let msg = |position: u32, text: &str| AutomaticMessage {
            channel_category: "messaging".into(),
            name: "welcome".into(),
            position,
            description: text.into(),
        };
        sync_automatic_messages(&db, vec![msg(1, "second"), msg(0, "first")])
            .await
            .unwrap();
        let found = automatic_messages(&db, "messaging", "welcome").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].description, "first");

        sync_automatic_messages(&db, vec![msg(0, "only")]).await.unwrap();
        let found = automatic_messages(&db, "messaging", "welcome").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(automatic_messages(&db, "voice", "welcome").await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn consult_types_and_states_upsert() {
        let (db, _dir) = setup_db().await;
        sync_consult_types(&db, vec![ConsultType { id: 5, name: "Tributos".into() }])
            .await
            .unwrap();
        assert_eq!(get_consult_type(&db, 5).await.unwrap().unwrap().name, "Tributos");
        assert!(get_consult_type(&db, 6).await.unwrap().is_none());

        sync_channel_states(
            &db,
            vec![ChannelState {
                id: "PAUSED".into(),
                name: "Paused".into(),
                category: "paused".into(),
            }],
        )
        .await
        .unwrap();
        let state = get_channel_state(&db, "PAUSED").await.unwrap().unwrap();
        assert_eq!(state.category, "paused");
        db.close().await.unwrap();
    }
}
