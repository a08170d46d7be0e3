// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication middleware backed by the tokens table.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use chowkidar_store::queries::auth as auth_queries;
use chowkidar_store::Owner;

use crate::handlers::ErrorBody;
use crate::server::GatewayState;

/// Validate the `Authorization: Bearer` header and stash the owner in the
/// request extensions for downstream handlers.
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .map(str::to_string);

    let Some(token) = token else {
        return unauthorized("missing or invalid Authorization header");
    };

    match auth_queries::verify_token(state.orchestrator.db(), &token).await {
        Ok(Some(owner)) => {
            request.extensions_mut().insert::<Owner>(owner);
            next.run(request).await
        }
        Ok(None) => unauthorized("invalid or expired token"),
        Err(e) => {
            tracing::error!(error = %e, "token lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "auth backend unavailable".into(),
                }),
            )
                .into_response()
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
