// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for identity verification, query history and surveys.

use atenea_core::AteneaError;
use atenea_core::types::QueryType;
use atenea_test_utils::TestHarness;

const CITIZEN: &str = "51999000111";

// ---- Test 1: Identity ----

#[tokio::test]
async fn citizen_document_is_set_once() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();

    let citizen = harness.center.get_citizen(&outcome.citizen_id).await.unwrap();
    assert_eq!(citizen.name.as_deref(), Some("Rosa"));
    assert_eq!(citizen.full_name.as_deref(), Some("Rosa Quispe"));
    assert_eq!(citizen.document_number, None);

    let verified = harness
        .center
        .verify_identity(&outcome.citizen_id, "DNI", "45678912", "agent-7")
        .await
        .unwrap();
    assert_eq!(verified.document_type.as_deref(), Some("DNI"));
    assert_eq!(verified.document_number.as_deref(), Some("45678912"));

    // Repeating the same document is idempotent.
    harness
        .center
        .verify_identity(&outcome.citizen_id, "DNI", "45678912", "agent-7")
        .await
        .unwrap();

    let err = harness
        .center
        .verify_identity(&outcome.citizen_id, "DNI", "11111111", "agent-7")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
}

#[tokio::test]
async fn document_cannot_belong_to_two_citizens() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let rosa = harness.ingest_text("51999000111", "hola", "wamid.1").await.unwrap();
    let other = harness.ingest_text("51999000222", "hola", "wamid.2").await.unwrap();
    harness
        .center
        .verify_identity(&rosa.citizen_id, "DNI", "45678912", "agent-7")
        .await
        .unwrap();

    let err = harness
        .center
        .verify_identity(&other.citizen_id, "DNI", "45678912", "agent-7")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));

    let err = harness
        .center
        .verify_identity(&other.citizen_id, "DNI", "", "agent-7")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::Validation(_)));
}

// ---- Test 2: Query history ----

#[tokio::test]
async fn queries_are_recorded_during_open_attentions() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();

    harness
        .center
        .record_query(
            &outcome.attention_id,
            QueryType::TicketsByPlate,
            "PLACA",
            "ABC-123",
            "agent-7",
        )
        .await
        .unwrap();
    harness
        .center
        .record_query(
            &outcome.attention_id,
            QueryType::TaxesByDocument,
            "DNI",
            "45678912",
            "agent-7",
        )
        .await
        .unwrap();

    let queries = harness.center.list_queries(&outcome.attention_id).await.unwrap();
    let kinds: Vec<_> = queries.iter().map(|q| q.query_type).collect();
    assert_eq!(
        kinds,
        vec![QueryType::TicketsByPlate, QueryType::TaxesByDocument]
    );
    assert_eq!(queries[0].document_value, "ABC-123");
    assert_eq!(queries[0].audit.created_by, "agent-7");

    harness
        .center
        .close_attention(&outcome.attention_id, "agent-7")
        .await
        .unwrap();
    let err = harness
        .center
        .record_query(
            &outcome.attention_id,
            QueryType::VehicleByPlate,
            "PLACA",
            "ABC-123",
            "agent-7",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
}

// ---- Test 3: Surveys ----

#[tokio::test]
async fn survey_after_close_rates_the_assigned_agent() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();
    harness
        .center
        .handoff_to_agent(&outcome.room_id, "agent-7")
        .await
        .unwrap();

    let err = harness
        .center
        .create_survey(&outcome.attention_id, 5, None, None, "system")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));

    harness
        .center
        .close_attention(&outcome.attention_id, "agent-7")
        .await
        .unwrap();

    let survey = harness
        .center
        .create_survey(
            &outcome.attention_id,
            5,
            Some("Muy amable".to_string()),
            None,
            "system",
        )
        .await
        .unwrap();
    assert_eq!(survey.rating, 5);
    assert_eq!(survey.user_id.as_deref(), Some("agent-7"));
    assert_eq!(survey.room_id, outcome.room_id);
    assert_eq!(survey.citizen_id, outcome.citizen_id);

    let stored = harness.center.get_survey(&outcome.attention_id).await.unwrap();
    assert_eq!(stored.id, survey.id);
    assert_eq!(stored.comment.as_deref(), Some("Muy amable"));

    let err = harness
        .center
        .create_survey(&outcome.attention_id, 4, None, None, "system")
        .await
        .unwrap_err();
    assert!(matches!(err, AteneaError::InvalidTransition { .. }));
}

#[tokio::test]
async fn survey_rating_must_be_one_to_five() {
    let harness = TestHarness::builder().without_bot().build().await.unwrap();
    let outcome = harness.ingest_text(CITIZEN, "hola", "wamid.1").await.unwrap();
    harness
        .center
        .close_attention(&outcome.attention_id, "agent-7")
        .await
        .unwrap();

    for rating in [0, 6] {
        let err = harness
            .center
            .create_survey(&outcome.attention_id, rating, None, None, "system")
            .await
            .unwrap_err();
        assert!(matches!(err, AteneaError::Validation(_)));
    }
    let err = harness.center.get_survey(&outcome.attention_id).await.unwrap_err();
    assert!(matches!(err, AteneaError::NotFound { entity: "survey", .. }));

    // An explicit agent overrides the room assignee.
    let survey = harness
        .center
        .create_survey(
            &outcome.attention_id,
            1,
            Some("  ".to_string()),
            Some("agent-9".to_string()),
            "system",
        )
        .await
        .unwrap();
    assert_eq!(survey.user_id.as_deref(), Some("agent-9"));
    assert_eq!(survey.comment, None);
}
