// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Ingress surfaces only 400/429/503 for pipeline failures; everything else
//! is observable via the session status transitioning to `error`.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};

use chowkidar_agents::sanitize_reply;
use chowkidar_core::traits::tts::detect_voice;
use chowkidar_core::{ChowkidarError, RingEvent};
use chowkidar_orchestrator::now_rfc3339;
use chowkidar_store::queries::{auth as auth_queries, members as member_queries};
use chowkidar_store::{MemberUpdate, Owner};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Wrapper mapping pipeline errors onto transport status codes.
pub struct ApiError(ChowkidarError);

impl From<ChowkidarError> for ApiError {
    fn from(e: ChowkidarError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChowkidarError::ContractViolation { .. } | ChowkidarError::SecurityContract { .. } => {
                StatusCode::BAD_REQUEST
            }
            ChowkidarError::BackPressure { .. } => StatusCode::TOO_MANY_REQUESTS,
            ChowkidarError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::debug!(status = %status, error = %self.0, "request failed");
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("{what} not found"),
        }),
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
}

// ---- Health ----

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "chowkidar",
    })
}

// ---- Ring ingress ----

#[derive(Debug, Deserialize)]
pub struct RingRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub device_id: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RingResponse {
    pub session_id: String,
    pub status: String,
    pub greeting: Option<String>,
    pub image_url: Option<String>,
}

pub async fn post_ring(
    State(state): State<GatewayState>,
    Json(body): Json<RingRequest>,
) -> Response {
    let image_bytes = match decode_optional_base64(&body.image_base64) {
        Ok(bytes) => bytes,
        Err(e) => return bad_request(format!("invalid base64 image data: {e}")),
    };
    let audio_bytes = match decode_optional_base64(&body.audio_base64) {
        Ok(bytes) => bytes,
        Err(e) => return bad_request(format!("invalid base64 audio data: {e}")),
    };

    let event = RingEvent {
        session_id: body.session_id,
        device_id: body.device_id,
        timestamp: body.timestamp.unwrap_or_else(now_rfc3339),
        image_bytes,
        audio_bytes,
        metadata: body.metadata,
    };

    match state.orchestrator.ring(event).await {
        Ok(accepted) => Json(RingResponse {
            session_id: accepted.session_id,
            status: accepted.status.to_string(),
            // The greeting follows over the event bus once available.
            greeting: None,
            image_url: accepted.image_url,
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

fn decode_optional_base64(
    field: &Option<String>,
) -> Result<Option<Vec<u8>>, base64::DecodeError> {
    match field.as_deref().map(str::trim) {
        Some(data) if !data.is_empty() => {
            base64::engine::general_purpose::STANDARD.decode(data).map(Some)
        }
        _ => Ok(None),
    }
}

// ---- Session views ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub status: String,
    pub last_updated: String,
    pub risk_score: f64,
    pub final_action: Option<String>,
}

pub async fn get_session_status(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.orchestrator.session_status(&id).await {
        Ok(Some(session)) => Json(SessionStatusResponse {
            session_id: session.id,
            status: session.status.to_string(),
            last_updated: session.last_updated_at,
            risk_score: session.risk_score,
            final_action: session.final_action.map(|a| a.to_string()),
        })
        .into_response(),
        Ok(None) => not_found("session"),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn get_session_detail(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.orchestrator.session_detail(&id).await {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => not_found("session"),
        Err(e) => ApiError(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_logs_limit")]
    pub limit: usize,
}

fn default_logs_limit() -> usize {
    50
}

pub async fn get_logs(
    State(state): State<GatewayState>,
    Query(query): Query<LogsQuery>,
) -> Response {
    match state.orchestrator.logs(query.limit.min(500)).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

// ---- Conversation follow-ups ----

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub session_id: String,
    pub reply: String,
    pub timestamp: String,
}

pub async fn post_ai_reply(
    State(state): State<GatewayState>,
    Json(body): Json<ReplyRequest>,
) -> Response {
    match state
        .orchestrator
        .conversation_reply(&body.session_id, &body.message)
        .await
    {
        Ok(reply) => Json(ReplyResponse {
            session_id: body.session_id,
            reply,
            timestamp: now_rfc3339(),
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn post_owner_reply(
    State(state): State<GatewayState>,
    Extension(_owner): Extension<Owner>,
    Json(body): Json<ReplyRequest>,
) -> Response {
    match state
        .orchestrator
        .owner_reply(&body.session_id, &body.message)
        .await
    {
        Ok(()) => Json(ReplyResponse {
            session_id: body.session_id,
            reply: body.message,
            timestamp: now_rfc3339(),
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

// ---- Provider delegations ----

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub audio_base64: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
    pub confidence: f64,
}

pub async fn post_transcribe(
    State(state): State<GatewayState>,
    Json(body): Json<TranscribeRequest>,
) -> Response {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(body.audio_base64.trim()) {
        Ok(bytes) => bytes,
        Err(e) => return bad_request(format!("invalid base64 audio data: {e}")),
    };

    let data = state.orchestrator.data();
    let stamp = uuid::Uuid::new_v4().simple().to_string();
    let path = data.tmp_audio_path("transcribe", &stamp[..8]);
    if let Err(e) = data.write_atomic(&path, &bytes).await {
        return ApiError(e).into_response();
    }

    match state.stt.transcribe(&path).await {
        Ok(result) => Json(TranscribeResponse {
            transcript: result.transcript,
            confidence: (result.confidence * 1000.0).round() / 1000.0,
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    pub audio_url: Option<String>,
    pub session_id: String,
}

pub async fn post_tts(State(state): State<GatewayState>, Json(body): Json<TtsRequest>) -> Response {
    let session_id = body
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| {
            let hex = uuid::Uuid::new_v4().simple().to_string();
            format!("tts_{}", &hex[..8])
        });

    let text = sanitize_reply(&body.text);
    if text.is_empty() {
        return bad_request("empty text after sanitization".into());
    }

    let path = state.orchestrator.data().tts_audio_path(&session_id);
    match state.tts.synthesize(&text, detect_voice(&text), &path).await {
        Ok(()) => Json(TtsResponse {
            audio_url: Some(format!("/static/tts/{session_id}.wav")),
            session_id,
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

// ---- Owner auth ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: Owner,
    pub token: String,
}

pub async fn post_register(
    State(state): State<GatewayState>,
    Json(body): Json<RegisterRequest>,
) -> Response {
    let db = state.orchestrator.db();
    match auth_queries::register_owner(db, &body.username, &body.password, &body.name, &now_rfc3339())
        .await
    {
        Ok(Some(owner)) => match auth_queries::create_token(db, owner.id, &now_rfc3339()).await {
            Ok(token) => Json(AuthResponse { user: owner, token }).into_response(),
            Err(e) => ApiError(e).into_response(),
        },
        Ok(None) => (
            StatusCode::CONFLICT,
            Json(ErrorBody {
                error: "username already taken".into(),
            }),
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn post_login(
    State(state): State<GatewayState>,
    Json(body): Json<LoginRequest>,
) -> Response {
    let db = state.orchestrator.db();
    match auth_queries::verify_owner(db, &body.username, &body.password).await {
        Ok(Some(owner)) => match auth_queries::create_token(db, owner.id, &now_rfc3339()).await {
            Ok(token) => Json(AuthResponse { user: owner, token }).into_response(),
            Err(e) => ApiError(e).into_response(),
        },
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "invalid username or password".into(),
            }),
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn post_logout(
    State(state): State<GatewayState>,
    headers: axum::http::HeaderMap,
) -> Response {
    if let Some(token) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let _ = auth_queries::delete_token(state.orchestrator.db(), token.trim()).await;
    }
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

pub async fn get_me(Extension(owner): Extension<Owner>) -> Response {
    Json(serde_json::json!({ "user": owner })).into_response()
}

// ---- Member directory ----

#[derive(Debug, Deserialize)]
pub struct MemberCreate {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_member_role")]
    pub role: String,
    #[serde(default)]
    pub photo_base64: Option<String>,
}

fn default_member_role() -> String {
    "family".to_string()
}

#[derive(Debug, Deserialize)]
pub struct MemberPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub permitted: Option<bool>,
    #[serde(default)]
    pub photo_base64: Option<String>,
}

pub async fn get_members(
    State(state): State<GatewayState>,
    Extension(owner): Extension<Owner>,
) -> Response {
    match member_queries::list_members(state.orchestrator.db(), owner.id).await {
        Ok(members) => Json(members).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn post_member(
    State(state): State<GatewayState>,
    Extension(owner): Extension<Owner>,
    Json(body): Json<MemberCreate>,
) -> Response {
    let photo_path = match save_member_photo(&state, &body.name, &body.photo_base64).await {
        Ok(path) => path,
        Err(response) => return response,
    };

    match member_queries::add_member(
        state.orchestrator.db(),
        owner.id,
        &body.name,
        &body.phone,
        &body.role,
        &photo_path,
        &now_rfc3339(),
    )
    .await
    {
        Ok(member) => Json(member).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn put_member(
    State(state): State<GatewayState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<i64>,
    Json(body): Json<MemberPatch>,
) -> Response {
    let photo_path = match &body.photo_base64 {
        Some(_) => {
            let name = body.name.clone().unwrap_or_else(|| format!("member_{id}"));
            match save_member_photo(&state, &name, &body.photo_base64).await {
                Ok(path) if !path.is_empty() => Some(path),
                Ok(_) => None,
                Err(response) => return response,
            }
        }
        None => None,
    };

    let update = MemberUpdate {
        name: body.name,
        phone: body.phone,
        role: body.role,
        photo_path,
        permitted: body.permitted,
    };

    match member_queries::update_member(state.orchestrator.db(), id, owner.id, update).await {
        Ok(true) => Json(serde_json::json!({ "status": "updated" })).into_response(),
        Ok(false) => not_found("member"),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn delete_member(
    State(state): State<GatewayState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<i64>,
) -> Response {
    match member_queries::delete_member(state.orchestrator.db(), id, owner.id).await {
        Ok(true) => Json(serde_json::json!({ "status": "deleted" })).into_response(),
        Ok(false) => not_found("member"),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn save_member_photo(
    state: &GatewayState,
    name: &str,
    photo_base64: &Option<String>,
) -> Result<String, Response> {
    let Some(data) = photo_base64.as_deref().map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(String::new());
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| bad_request(format!("invalid base64 photo data: {e}")))?;

    let data_dir = state.orchestrator.data();
    let hex = uuid::Uuid::new_v4().simple().to_string();
    let path = data_dir.member_photo_path(&name.to_lowercase(), &hex[..8]);
    data_dir
        .write_atomic(&path, &bytes)
        .await
        .map_err(|e| ApiError(e).into_response())?;
    Ok(path.to_string_lossy().into_owned())
}
