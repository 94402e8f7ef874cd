//! VAPID public key lookup for browsers about to subscribe.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use pushcast_common::error::AppError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/vapid-public-key", get(vapid_public_key))
}

/// GET /api/vapid-public-key: The application server key for `PushManager.subscribe`.
async fn vapid_public_key(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let key = state
        .vapid_public_key
        .as_ref()
        .ok_or_else(|| AppError::NotFound("VAPID public key is not configured".to_string()))?;
    Ok(Json(json!({ "publicKey": key })))
}
