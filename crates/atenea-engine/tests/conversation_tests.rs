// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the inbound pipeline, rooms, attentions and the
//! message ledger.
//!
//! Each test creates an isolated TestHarness with temp SQLite and mock
//! adapters. Tests are independent and order-insensitive.

use std::sync::Arc;

use atenea_core::{AteneaError, Clock};
use atenea_core::models::RoomFilter;
use atenea_core::types::{
    AttachmentPayload, AttachmentType, AttentionStatus, Handler, MessageStatus, OutgoingPayload,
    RoomStatus, SenderType,
};
use atenea_engine::LedgerEntry;
use atenea_engine::rooms::ROOM_COMPLETED;
use atenea_test_utils::TestHarness;
use atenea_test_utils::harness::PAPELETAS;
use chrono::Duration;

const CITIZEN: &str = "51999000111";

fn agent_reply(room_id: &str, text: &str) -> OutgoingPayload {
    OutgoingPayload {
        room_id: room_id.to_string(),
        message: text.to_string(),
        options: None,
        attachments: Vec::new(),
        bot_reply: false,
        sender_user_id: Some("agent-7".to_string()),
        idempotency_key: None,
    }
}

// ---- Test 1: Full WhatsApp attention ----

#[tokio::test]
async fn whatsapp_attention_from_first_message_to_completed_room() {
    let harness = TestHarness::new().await.unwrap();
    let whatsapp = harness.channel("whatsapp");

    let first = harness
        .ingest_text(CITIZEN, "Hola, quiero consultar mis papeletas", "wamid.1")
        .await
        .unwrap();
    assert!(first.attention_created);
    assert!(!first.replayed);
    assert_eq!(first.handler, Handler::Bot);

    let room = harness.center.get_room(&first.room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Pending);
    assert!(room.bot_replies);
    let attention = harness.center.get_attention(&first.attention_id).await.unwrap();
    assert_eq!(attention.status, AttentionStatus::IdentityVerification);

    let claimed = harness
        .center
        .handoff_to_agent(&first.room_id, "agent-7")
        .await
        .unwrap();
    assert!(!claimed.bot_replies);
    assert_eq!(claimed.user_id.as_deref(), Some("agent-7"));
    assert_eq!(claimed.status, RoomStatus::Priority);

    let reply = harness
        .center
        .send(agent_reply(&first.room_id, "Buenos días, ¿cuál es su placa?"))
        .await
        .unwrap();
    assert!(reply.delivered);
    assert_eq!(reply.message.sender_type, SenderType::Agent);
    assert_eq!(reply.message.sender_user_id.as_deref(), Some("agent-7"));
    assert_eq!(reply.message.attention_id, first.attention_id);

    harness.clock.advance(Duration::minutes(2));
    let second = harness
        .ingest_text(CITIZEN, "ABC-123", "wamid.2")
        .await
        .unwrap();
    assert_eq!(second.room_id, first.room_id);
    assert_eq!(second.attention_id, first.attention_id);
    assert!(!second.attention_created);
    assert_eq!(second.handler, Handler::Agent);

    let classified = harness
        .center
        .classify_attention(
            &first.attention_id,
            PAPELETAS,
            Some("placa ABC-123".to_string()),
            "agent-7",
        )
        .await
        .unwrap();
    assert_eq!(classified.status, AttentionStatus::InProgress);
    assert_eq!(classified.consult_type_id, Some(PAPELETAS));

    let closed = harness
        .center
        .close_attention(&first.attention_id, "agent-7")
        .await
        .unwrap();
    assert_eq!(closed.attention.status, AttentionStatus::Closed);
    assert!(closed.attention.end_date.is_some());
    assert!(closed.room_completed);
    assert_eq!(closed.room.status, RoomStatus::Completed);

    let texts = whatsapp.sent_texts().await;
    assert_eq!(texts.first().map(String::as_str), Some("Hola, soy Atenea del SAT."));
    assert_eq!(
        texts.last().map(String::as_str),
        Some("Gracias por comunicarte con el SAT.")
    );

    // The citizen writes again: a fresh room and attention.
    let next = harness
        .ingest_text(CITIZEN, "Hola otra vez", "wamid.3")
        .await
        .unwrap();
    assert_ne!(next.room_id, first.room_id);
    assert!(next.attention_created);
    assert_eq!(next.citizen_id, first.citizen_id);
    assert_eq!(next.handler, Handler::Bot);
}

// ---- Test 2: Idempotent ingestion ----

#[tokio::test]
async fn redelivered_external_id_is_recorded_once() {
    let harness = TestHarness::new().await.unwrap();
    let whatsapp = harness.channel("whatsapp");

    let first = harness.ingest_text(CITIZEN, "hola", "ext-123").await.unwrap();
    let sent_after_first = whatsapp.sent_count().await;
    let again = harness.ingest_text(CITIZEN, "hola", "ext-123").await.unwrap();

    assert!(again.replayed);
    assert_eq!(again.message_id, first.message_id);
    assert_eq!(again.room_id, first.room_id);
    assert_eq!(again.attention_id, first.attention_id);
    assert_eq!(whatsapp.sent_count().await, sent_after_first);
    assert_eq!(harness.bot.turns().await.len(), 1);

    let citizen_messages: Vec<_> = harness
        .center
        .room_messages(&first.room_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.sender_type == SenderType::Citizen)
        .collect();
    assert_eq!(citizen_messages.len(), 1);
    assert_eq!(citizen_messages[0].external_message_id.as_deref(), Some("ext-123"));
}

#[tokio::test]
async fn same_external_id_on_another_channel_is_a_new_message() {
    let harness = TestHarness::new().await.unwrap();
    let on_whatsapp = harness.ingest_text(CITIZEN, "hola", "ext-123").await.unwrap();
    let on_telegram = harness
        .center
        .ingest(harness.inbound("telegram", "tg-42", "hola", "ext-123"))
        .await
        .unwrap();
    assert!(!on_telegram.replayed);
    assert_ne!(on_telegram.room_id, on_whatsapp.room_id);
    assert_ne!(on_telegram.citizen_id, on_whatsapp.citizen_id);
}

// ---- Test 3: Concurrent first contact ----

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_messages_share_one_room_and_attention() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let center = Arc::clone(&harness.center);
        let event = harness.inbound("whatsapp", CITIZEN, &format!("mensaje {i}"), &format!("wamid.c{i}"));
        handles.push(tokio::spawn(async move { center.ingest(event).await }));
    }
    let outcomes: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let room_id = &outcomes[0].room_id;
    let attention_id = &outcomes[0].attention_id;
    assert!(outcomes.iter().all(|o| &o.room_id == room_id));
    assert!(outcomes.iter().all(|o| &o.attention_id == attention_id));
    assert_eq!(outcomes.iter().filter(|o| o.attention_created).count(), 1);

    let rooms = harness
        .center
        .list_rooms(&RoomFilter {
            channel: Some("whatsapp".to_string()),
            ..RoomFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].unread_count, 8);
    // Welcome goes out once.
    assert_eq!(harness.channel("whatsapp").sent_count().await, 1);
}

// ---- Test 4: Ledger ordering ----

#[tokio::test]
async fn messages_are_ordered_by_provider_timestamp() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();

    let mut late = harness.inbound("whatsapp", CITIZEN, "segundo", "wamid.late");
    late.timestamp += Duration::seconds(10);
    let early = harness.inbound("whatsapp", CITIZEN, "primero", "wamid.early");

    let outcome = harness.center.ingest(late).await.unwrap();
    harness.center.ingest(early).await.unwrap();

    let bodies: Vec<String> = harness
        .center
        .room_messages(&outcome.room_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.sender_type == SenderType::Citizen)
        .map(|m| m.content)
        .collect();
    assert_eq!(bodies, vec!["primero", "segundo"]);

    let last = harness.center.last_message(&outcome.room_id).await.unwrap().unwrap();
    assert_eq!(last.content, "segundo");
}

#[tokio::test]
async fn mark_read_clears_unread_citizen_messages() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let first = harness.ingest_text(CITIZEN, "uno", "wamid.1").await.unwrap();
    let second = harness.ingest_text(CITIZEN, "dos", "wamid.2").await.unwrap();
    assert_eq!(harness.center.unread_count(&first.room_id).await.unwrap(), 2);

    let changed = harness
        .center
        .mark_read(&[first.message_id.clone()], "agent-7")
        .await
        .unwrap();
    assert_eq!(changed, 1);
    // Already read messages are not counted twice.
    let changed = harness
        .center
        .mark_read(&[first.message_id.clone(), second.message_id.clone()], "agent-7")
        .await
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(harness.center.unread_count(&first.room_id).await.unwrap(), 0);

    let messages = harness.center.attention_messages(&first.attention_id).await.unwrap();
    let read = messages.iter().find(|m| m.id == first.message_id).unwrap();
    assert_eq!(read.status, MessageStatus::Read);
    assert_eq!(read.read_by.as_deref(), Some("agent-7"));
    assert_eq!(harness.center.mark_read(&[], "agent-7").await.unwrap(), 0);
}

#[tokio::test]
async fn append_to_closed_attention_is_rejected() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();
    harness
        .center
        .close_attention(&outcome.attention_id, "agent-7")
        .await
        .unwrap();

    let err = harness
        .center
        .append_message(
            &outcome.attention_id,
            LedgerEntry::inbound("tarde", Some("wamid.2".to_string()), harness.clock.now()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
}

#[tokio::test]
async fn closing_message_is_recorded_before_the_attention_closes() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let whatsapp = harness.channel("whatsapp");
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();
    harness.clock.advance(Duration::minutes(5));

    let closed = harness
        .center
        .close_attention(&outcome.attention_id, "agent-7")
        .await
        .unwrap();
    let end_date = closed.attention.end_date.clone().unwrap();

    let messages = harness
        .center
        .attention_messages(&outcome.attention_id)
        .await
        .unwrap();
    let farewell = messages
        .iter()
        .find(|m| m.content == "Gracias por comunicarte con el SAT.")
        .expect("closing message recorded on the attention");
    assert_eq!(farewell.sender_type, SenderType::Bot);
    for message in &messages {
        assert!(
            message.audit.created_at <= end_date,
            "message {} written after the attention closed",
            message.id
        );
    }
    assert_eq!(
        whatsapp.sent_texts().await.last().map(String::as_str),
        Some("Gracias por comunicarte con el SAT.")
    );
}

// ---- Test 5: Inbound validation ----

#[tokio::test]
async fn unknown_channel_and_empty_messages_are_rejected() {
    let harness = TestHarness::new().await.unwrap();

    let err = harness
        .center
        .ingest(harness.inbound("carrier-pigeon", CITIZEN, "hola", "x-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::NotFound { entity: "channel", .. }));

    let err = harness.ingest_text(CITIZEN, "   ", "wamid.empty").await.unwrap_err();
    assert!(matches!(err, AteneaError::Validation(_)));

    let mut bad_attachment = harness.inbound("whatsapp", CITIZEN, "foto", "wamid.img");
    bad_attachment.attachments.push(AttachmentPayload {
        content: "aGVsbG8=".to_string(),
        extension: "jpg".to_string(),
        size: 99,
        kind: AttachmentType::Image,
    });
    let err = harness.center.ingest(bad_attachment).await.unwrap_err();
    assert!(matches!(err, AteneaError::Validation(_)));

    // Nothing was recorded for rejected events.
    let rooms = harness.center.list_rooms(&RoomFilter::default()).await.unwrap();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn attachment_only_message_is_accepted() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let mut event = harness.inbound("whatsapp", CITIZEN, "", "wamid.doc");
    event.attachments.push(AttachmentPayload {
        content: "aGVsbG8=".to_string(),
        extension: "pdf".to_string(),
        size: 5,
        kind: AttachmentType::File,
    });
    let outcome = harness.center.ingest(event).await.unwrap();

    let summary = harness.center.room_summary(&outcome.room_id).await.unwrap();
    let last = summary.last_message.unwrap();
    assert!(last.has_attachments);
    assert_eq!(last.sender_type, SenderType::Citizen);
}

#[tokio::test]
async fn bot_echo_is_recorded_without_answering() {
    let harness = TestHarness::new().await.unwrap();
    let first = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();
    let turns_before = harness.bot.turns().await.len();

    let mut echo = harness.inbound("whatsapp", CITIZEN, "Hola, soy Atenea del SAT.", "wamid.echo");
    echo.message.bot_reply = Some(true);
    let outcome = harness.center.ingest(echo).await.unwrap();

    assert_eq!(outcome.room_id, first.room_id);
    assert_eq!(harness.bot.turns().await.len(), turns_before);
    let message = harness
        .storage
        .get_message(&outcome.message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.sender_type, SenderType::Bot);
    assert_eq!(message.status, MessageStatus::Read);
}

// ---- Test 6: Room lifecycle ----

#[tokio::test]
async fn room_status_moves_forward_only() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();

    let room = harness
        .center
        .mark_priority(&outcome.room_id, "supervisor")
        .await
        .unwrap();
    assert_eq!(room.status, RoomStatus::Priority);
    let err = harness
        .center
        .mark_priority(&outcome.room_id, "supervisor")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));

    let completed = harness
        .center
        .mark_completed(&outcome.room_id, "supervisor")
        .await
        .unwrap();
    assert_eq!(completed.room.status, RoomStatus::Completed);
    assert_eq!(completed.force_closed, vec![outcome.attention_id.clone()]);

    let attention = harness.center.get_attention(&outcome.attention_id).await.unwrap();
    assert_eq!(attention.status, AttentionStatus::Closed);
    assert_eq!(attention.close_reason.as_deref(), Some(ROOM_COMPLETED));

    let err = harness
        .center
        .mark_completed(&outcome.room_id, "supervisor")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
    let err = harness
        .center
        .open_or_get_attention(&outcome.room_id, "supervisor")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
    let err = harness
        .center
        .send(agent_reply(&outcome.room_id, "¿sigue ahí?"))
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
}

#[tokio::test]
async fn list_rooms_filters_and_summarizes() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let a = harness.ingest_text("51999000111", "hola", "wamid.a").await.unwrap();
    let b = harness.ingest_text("51999000222", "buenas", "wamid.b").await.unwrap();
    harness.center.handoff_to_agent(&b.room_id, "agent-7").await.unwrap();

    let mine = harness
        .center
        .list_rooms(&RoomFilter {
            user_id: Some("agent-7".to_string()),
            ..RoomFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].room_id, b.room_id);
    assert_eq!(mine[0].status, RoomStatus::Priority);
    assert!(!mine[0].bot_replies);

    let pending = harness
        .center
        .list_rooms(&RoomFilter {
            status: Some(RoomStatus::Pending),
            ..RoomFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let summary = &pending[0];
    assert_eq!(summary.room_id, a.room_id);
    assert_eq!(summary.external_room_id, "51999000111");
    assert_eq!(summary.attention.as_ref().map(|t| t.id.as_str()), Some(a.attention_id.as_str()));
    assert_eq!(summary.unread_count, 1);

    let err = harness.center.room_summary("missing").await.unwrap_err();
    assert!(matches!(err, AteneaError::NotFound { entity: "room", .. }));
}

// ---- Test 7: Attention lifecycle ----

#[tokio::test]
async fn classification_rules() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();

    let err = harness
        .center
        .classify_attention(&outcome.attention_id, 999, None, "agent-7")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::NotFound { entity: "consult_type", .. }));

    harness
        .center
        .classify_attention(&outcome.attention_id, 1, None, "agent-7")
        .await
        .unwrap();
    // Reclassifying keeps the attention in progress.
    let reclassified = harness
        .center
        .classify_attention(&outcome.attention_id, PAPELETAS, Some("detalle".into()), "agent-7")
        .await
        .unwrap();
    assert_eq!(reclassified.status, AttentionStatus::InProgress);
    assert_eq!(reclassified.consult_type_id, Some(PAPELETAS));
    assert_eq!(reclassified.attention_detail.as_deref(), Some("detalle"));

    harness
        .center
        .close_attention(&outcome.attention_id, "agent-7")
        .await
        .unwrap();
    let err = harness
        .center
        .classify_attention(&outcome.attention_id, PAPELETAS, None, "agent-7")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
    let err = harness
        .center
        .close_attention(&outcome.attention_id, "agent-7")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
}

#[tokio::test]
async fn open_or_get_returns_the_existing_attention() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();

    let opened = harness
        .center
        .open_or_get_attention(&outcome.room_id, "agent-7")
        .await
        .unwrap();
    assert!(!opened.created);
    assert_eq!(opened.attention.id, outcome.attention_id);

    let err = harness
        .center
        .open_or_get_attention("no-such-room", "agent-7")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::NotFound { .. }));
}

// ---- Test 8: Business hours ----

#[tokio::test]
async fn out_of_hours_message_is_sent_when_closed() {
    use atenea_config::model::{BusinessHoursConfig, DayOfWeek, DaySchedule};

    let harness = TestHarness::builder()
        .without_bot()
        .with_business_hours(BusinessHoursConfig {
            enabled: true,
            utc_offset_minutes: -300,
            days: vec![DaySchedule {
                day: DayOfWeek::Monday,
                start: "08:00".to_string(),
                end: "17:00".to_string(),
            }],
            holidays: Vec::new(),
        })
        .build()
        .await
        .unwrap();
    let whatsapp = harness.channel("whatsapp");

    // 09:00 in Lima: open.
    harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();
    assert!(
        !whatsapp
            .sent_texts()
            .await
            .iter()
            .any(|t| t.contains("horario"))
    );

    // 18:00 in Lima: closed.
    harness.clock.advance(Duration::hours(9));
    harness.ingest_text(CITIZEN, "¿siguen ahí?", "wamid.2").await.unwrap();
    assert_eq!(
        whatsapp.sent_texts().await.last().map(String::as_str),
        Some("Nuestro horario es de 8:00 a 17:00.")
    );
}
