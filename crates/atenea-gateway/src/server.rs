// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::{Duration, Instant};

use atenea_config::model::GatewayConfig;
use atenea_core::AteneaError;
use atenea_engine::ContactCenter;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The engine every route delegates to.
    pub center: Arc<ContactCenter>,
    /// Process start time for uptime calculation.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(center: Arc<ContactCenter>) -> Self {
        Self {
            center,
            started: Instant::now(),
        }
    }
}

/// Gateway server configuration (mirrors `GatewayConfig` from atenea-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Authentication settings.
    pub auth: AuthConfig,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            auth: AuthConfig {
                bearer_token: config.bearer_token.clone(),
            },
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            cors_origins: config.cors_origins.clone(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Builds the gateway router.
///
/// `GET /health` is public; every `/v1` route goes through bearer auth.
pub fn build_router(config: &ServerConfig, state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/webhooks/inbound", post(handlers::post_inbound))
        .route("/v1/rooms", get(handlers::list_rooms))
        .route("/v1/rooms/{id}", get(handlers::get_room))
        .route("/v1/rooms/{id}/messages", get(handlers::get_room_messages))
        .route("/v1/rooms/{id}/handoffs", get(handlers::get_handoffs))
        .route("/v1/rooms/{id}/handoff/agent", post(handlers::post_handoff_agent))
        .route("/v1/rooms/{id}/handoff/bot", post(handlers::post_handoff_bot))
        .route("/v1/rooms/{id}/priority", post(handlers::post_priority))
        .route("/v1/rooms/{id}/complete", post(handlers::post_complete))
        .route("/v1/rooms/{id}/attention", post(handlers::post_attention))
        .route("/v1/attentions/{id}/classify", post(handlers::post_classify))
        .route("/v1/attentions/{id}/close", post(handlers::post_close))
        .route(
            "/v1/attentions/{id}/queries",
            post(handlers::post_query).get(handlers::get_queries),
        )
        .route(
            "/v1/attentions/{id}/survey",
            post(handlers::post_survey).get(handlers::get_survey),
        )
        .route("/v1/citizens/{id}/identity", post(handlers::post_identity))
        .route("/v1/messages/read", post(handlers::post_mark_read))
        .route("/v1/outbound", post(handlers::post_outbound))
        .route("/v1/presence/agents", post(handlers::post_register_agent))
        .route("/v1/presence/{id}", get(handlers::get_presence))
        .route(
            "/v1/presence/{id}/transition",
            post(handlers::post_presence_transition),
        )
        .route(
            "/v1/presence/{id}/history",
            get(handlers::get_presence_history),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            config.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Serves until `shutdown` is cancelled, then stops accepting connections
/// and lets in-flight requests finish.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), AteneaError> {
    if config.auth.bearer_token.is_none() {
        tracing::warn!("gateway bearer token not configured, API is unauthenticated");
    }
    let app = build_router(config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AteneaError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AteneaError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_from_gateway_config() {
        let gateway = GatewayConfig {
            bearer_token: Some("secret".to_string()),
            cors_origins: vec!["https://agentes.sat.gob.pe".to_string()],
            ..GatewayConfig::default()
        };
        let config = ServerConfig::from(&gateway);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.auth.bearer_token.as_deref(), Some("secret"));
        assert_eq!(config.cors_origins.len(), 1);
    }

    #[test]
    fn server_config_debug_redacts_token() {
        let gateway = GatewayConfig {
            bearer_token: Some("secret".to_string()),
            ..GatewayConfig::default()
        };
        let debug = format!("{:?}", ServerConfig::from(&gateway));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn invalid_cors_origins_are_skipped() {
        // Builds without panicking on a header-invalid origin.
        let _layer = cors_layer(&["https://ok.example".to_string(), "bad\norigin".to_string()]);
    }
}
