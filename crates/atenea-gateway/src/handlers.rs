// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handlers are thin: they deserialize the request, call one
//! [`ContactCenter`](atenea_engine::ContactCenter) operation and serialize
//! its result. Every failure goes through [`ApiError`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use atenea_core::HealthStatus;
use atenea_core::models::{
    Attention, Citizen, HandoffEvent, Message, OpenedAttention, PresenceRecord, QueryRecord, Room,
    RoomFilter, RoomSummary, Survey, VicidialUser,
};
use atenea_core::types::{IncomingEvent, OutgoingPayload, QueryType};
use atenea_engine::{ClosedAttention, IngestOutcome, NewAgent, PresenceSnapshot};

use crate::error::ApiError;
use crate::server::GatewayState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Request body for POST /v1/rooms/{id}/handoff/agent.
#[derive(Debug, Deserialize)]
pub struct AgentHandoffRequest {
    pub user_id: String,
}

/// Request body for actions that only need the acting user.
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor: String,
}

/// Request body for POST /v1/attentions/{id}/classify.
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub consult_type_id: i64,
    #[serde(default)]
    pub detail: Option<String>,
    pub actor: String,
}

/// Request body for POST /v1/attentions/{id}/queries.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query_type: QueryType,
    pub document_type: String,
    pub document_value: String,
    pub actor: String,
}

/// Request body for POST /v1/attentions/{id}/survey.
#[derive(Debug, Deserialize)]
pub struct SurveyRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    /// Rated agent; defaults to the room's assignee.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "system_actor")]
    pub actor: String,
}

/// Request body for POST /v1/citizens/{id}/identity.
#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    pub document_type: String,
    pub document_number: String,
    pub actor: String,
}

/// Request body for POST /v1/messages/read.
#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub message_ids: Vec<String>,
    pub reader: String,
}

/// Response body for POST /v1/messages/read.
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Request body for POST /v1/presence/agents.
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    #[serde(flatten)]
    pub agent: NewAgent,
    pub actor: String,
}

/// Telephony state change for POST /v1/presence/{id}/transition.
#[derive(Debug, Deserialize)]
pub struct PresenceTransitionRequest {
    pub channel_state_id: String,
    #[serde(default)]
    pub pause_code: Option<String>,
    pub actor: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn system_actor() -> String {
    atenea_core::models::SYSTEM_ACTOR.to_string()
}

/// GET /health
///
/// Unauthenticated liveness and dependency health.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (status, label, detail) = match state.center.health_check().await {
        HealthStatus::Healthy => (StatusCode::OK, "ok", None),
        HealthStatus::Degraded(reason) => (StatusCode::OK, "degraded", Some(reason)),
        HealthStatus::Unhealthy(reason) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(reason))
        }
    };
    let body = HealthResponse {
        status: label.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        detail,
    };
    (status, Json(body)).into_response()
}

/// POST /v1/webhooks/inbound
pub async fn post_inbound(
    State(state): State<GatewayState>,
    Json(event): Json<IncomingEvent>,
) -> ApiResult<IngestOutcome> {
    Ok(Json(state.center.ingest(event).await?))
}

/// GET /v1/rooms
pub async fn list_rooms(
    State(state): State<GatewayState>,
    Query(filter): Query<RoomFilter>,
) -> ApiResult<Vec<RoomSummary>> {
    Ok(Json(state.center.list_rooms(&filter).await?))
}

/// GET /v1/rooms/{id}
pub async fn get_room(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
) -> ApiResult<RoomSummary> {
    Ok(Json(state.center.room_summary(&room_id).await?))
}

/// GET /v1/rooms/{id}/messages
pub async fn get_room_messages(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
) -> ApiResult<Vec<Message>> {
    Ok(Json(state.center.room_messages(&room_id).await?))
}

/// GET /v1/rooms/{id}/handoffs
pub async fn get_handoffs(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
) -> ApiResult<Vec<HandoffEvent>> {
    Ok(Json(state.center.handoff_history(&room_id).await?))
}

/// POST /v1/rooms/{id}/handoff/agent
pub async fn post_handoff_agent(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Json(body): Json<AgentHandoffRequest>,
) -> ApiResult<Room> {
    Ok(Json(
        state.center.handoff_to_agent(&room_id, &body.user_id).await?,
    ))
}

/// POST /v1/rooms/{id}/handoff/bot
pub async fn post_handoff_bot(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<Room> {
    Ok(Json(state.center.handoff_to_bot(&room_id, &body.actor).await?))
}

/// POST /v1/rooms/{id}/priority
pub async fn post_priority(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<Room> {
    Ok(Json(state.center.mark_priority(&room_id, &body.actor).await?))
}

/// POST /v1/rooms/{id}/complete
pub async fn post_complete(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<Room> {
    let completed = state.center.mark_completed(&room_id, &body.actor).await?;
    Ok(Json(completed.room))
}

/// POST /v1/rooms/{id}/attention
pub async fn post_attention(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Json(body): Json<ActorRequest>,
) -> Result<Response, ApiError> {
    let opened: OpenedAttention = state
        .center
        .open_or_get_attention(&room_id, &body.actor)
        .await?;
    let status = if opened.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(opened)).into_response())
}

/// POST /v1/attentions/{id}/classify
pub async fn post_classify(
    State(state): State<GatewayState>,
    Path(attention_id): Path<String>,
    Json(body): Json<ClassifyRequest>,
) -> ApiResult<Attention> {
    Ok(Json(
        state
            .center
            .classify_attention(&attention_id, body.consult_type_id, body.detail, &body.actor)
            .await?,
    ))
}

/// POST /v1/attentions/{id}/close
pub async fn post_close(
    State(state): State<GatewayState>,
    Path(attention_id): Path<String>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ClosedAttention> {
    Ok(Json(
        state
            .center
            .close_attention(&attention_id, &body.actor)
            .await?,
    ))
}

/// POST /v1/attentions/{id}/queries
pub async fn post_query(
    State(state): State<GatewayState>,
    Path(attention_id): Path<String>,
    Json(body): Json<QueryRequest>,
) -> Result<(StatusCode, Json<QueryRecord>), ApiError> {
    let record = state
        .center
        .record_query(
            &attention_id,
            body.query_type,
            &body.document_type,
            &body.document_value,
            &body.actor,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/attentions/{id}/queries
pub async fn get_queries(
    State(state): State<GatewayState>,
    Path(attention_id): Path<String>,
) -> ApiResult<Vec<QueryRecord>> {
    Ok(Json(state.center.list_queries(&attention_id).await?))
}

/// POST /v1/attentions/{id}/survey
pub async fn post_survey(
    State(state): State<GatewayState>,
    Path(attention_id): Path<String>,
    Json(body): Json<SurveyRequest>,
) -> Result<(StatusCode, Json<Survey>), ApiError> {
    let survey = state
        .center
        .create_survey(
            &attention_id,
            body.rating,
            body.comment,
            body.user_id,
            &body.actor,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(survey)))
}

/// GET /v1/attentions/{id}/survey
pub async fn get_survey(
    State(state): State<GatewayState>,
    Path(attention_id): Path<String>,
) -> ApiResult<Survey> {
    Ok(Json(state.center.get_survey(&attention_id).await?))
}

/// POST /v1/citizens/{id}/identity
pub async fn post_identity(
    State(state): State<GatewayState>,
    Path(citizen_id): Path<String>,
    Json(body): Json<IdentityRequest>,
) -> ApiResult<Citizen> {
    Ok(Json(
        state
            .center
            .verify_identity(
                &citizen_id,
                &body.document_type,
                &body.document_number,
                &body.actor,
            )
            .await?,
    ))
}

/// POST /v1/messages/read
pub async fn post_mark_read(
    State(state): State<GatewayState>,
    Json(body): Json<MarkReadRequest>,
) -> ApiResult<MarkReadResponse> {
    let updated = state
        .center
        .mark_read(&body.message_ids, &body.reader)
        .await?;
    Ok(Json(MarkReadResponse { updated }))
}

/// POST /v1/outbound
///
/// An undelivered send is answered with 502 and the recorded result.
pub async fn post_outbound(
    State(state): State<GatewayState>,
    Json(payload): Json<OutgoingPayload>,
) -> Result<Response, ApiError> {
    let result = state.center.send(payload).await?;
    let status = if result.delivered {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(result)).into_response())
}

/// POST /v1/presence/agents
pub async fn post_register_agent(
    State(state): State<GatewayState>,
    Json(body): Json<RegisterAgentRequest>,
) -> Result<(StatusCode, Json<VicidialUser>), ApiError> {
    let user = state.center.register_agent(body.agent, &body.actor).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /v1/presence/{id}
pub async fn get_presence(
    State(state): State<GatewayState>,
    Path(vicidial_user_id): Path<String>,
) -> ApiResult<PresenceSnapshot> {
    Ok(Json(state.center.current_presence(&vicidial_user_id).await?))
}

/// POST /v1/presence/{id}/transition
pub async fn post_presence_transition(
    State(state): State<GatewayState>,
    Path(vicidial_user_id): Path<String>,
    Json(body): Json<PresenceTransitionRequest>,
) -> ApiResult<PresenceRecord> {
    Ok(Json(
        state
            .center
            .transition_presence(
                &vicidial_user_id,
                &body.channel_state_id,
                body.pause_code,
                &body.actor,
            )
            .await?,
    ))
}

/// GET /v1/presence/{id}/history
pub async fn get_presence_history(
    State(state): State<GatewayState>,
    Path(vicidial_user_id): Path<String>,
) -> ApiResult<Vec<PresenceRecord>> {
    Ok(Json(
        state.center.presence_history(&vicidial_user_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survey_request_defaults_actor_to_system() {
        let req: SurveyRequest = serde_json::from_str(r#"{"rating": 4}"#).unwrap();
        assert_eq!(req.rating, 4);
        assert_eq!(req.actor, "system");
        assert!(req.user_id.is_none());
    }

    #[test]
    fn query_request_uses_snake_case_types() {
        let json = r#"{
            "query_type": "tickets_by_plate",
            "document_type": "PLACA",
            "document_value": "ABC-123",
            "actor": "agent-7"
        }"#;
        let req: QueryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.query_type, QueryType::TicketsByPlate);
    }

    #[test]
    fn register_agent_request_flattens_agent() {
        let json = r#"{
            "username": "vici-7",
            "user_id": "agent-7",
            "channel_state_id": "AVAILABLE",
            "actor": "supervisor"
        }"#;
        let req: RegisterAgentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.agent.username, "vici-7");
        assert!(req.agent.phone_login.is_none());
        assert_eq!(req.actor, "supervisor");
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            detail: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
        assert!(!json.contains("detail"));
    }
}
