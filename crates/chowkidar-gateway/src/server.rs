// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, static snapshot serving, and shared state.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use chowkidar_core::traits::stt::SttProvider;
use chowkidar_core::traits::tts::TtsSynthesizer;
use chowkidar_core::ChowkidarError;
use chowkidar_orchestrator::Orchestrator;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Orchestrator,
    pub stt: Arc<dyn SttProvider>,
    pub tts: Arc<dyn TtsSynthesizer>,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Start the gateway HTTP/WebSocket server; resolves when the shutdown
/// future completes and in-flight connections have drained.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), ChowkidarError> {
    let data_root = state.orchestrator.data().root().to_path_buf();

    // Public API routes.
    let api_routes = Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/ring", post(handlers::post_ring))
        .route("/api/session/{id}/status", get(handlers::get_session_status))
        .route("/api/session/{id}/detail", get(handlers::get_session_detail))
        .route("/api/logs", get(handlers::get_logs))
        .route("/api/ai-reply", post(handlers::post_ai_reply))
        .route("/api/transcribe", post(handlers::post_transcribe))
        .route("/api/tts", post(handlers::post_tts))
        .route("/api/auth/register", post(handlers::post_register))
        .route("/api/auth/login", post(handlers::post_login))
        .route("/api/auth/logout", post(handlers::post_logout))
        .with_state(state.clone());

    // Routes requiring a bearer token resolved against the tokens table.
    let owner_routes = Router::new()
        .route("/api/auth/me", get(handlers::get_me))
        .route("/api/owner-reply", post(handlers::post_owner_reply))
        .route("/api/members", get(handlers::get_members))
        .route("/api/members", post(handlers::post_member))
        .route("/api/members/{id}", put(handlers::put_member))
        .route("/api/members/{id}", delete(handlers::delete_member))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    // WebSocket route (no auth; channels carry no secrets).
    let ws_routes = Router::new()
        .route("/api/ws/{channel}", get(ws::ws_handler))
        .with_state(state);

    // Static assets for the dashboard: snapshots, TTS audio, member photos.
    let static_routes = Router::new()
        .nest_service("/static/snaps", ServeDir::new(data_root.join("snaps")))
        .nest_service("/static/tts", ServeDir::new(data_root.join("tts")))
        .nest_service("/static/members", ServeDir::new(data_root.join("members")));

    let app = Router::new()
        .merge(api_routes)
        .merge(owner_routes)
        .merge(ws_routes)
        .merge(static_routes)
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ChowkidarError::Config(format!(
                "failed to bind gateway to {addr}: {e}"
            )))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ChowkidarError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
