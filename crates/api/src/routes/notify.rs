//! Notification fan-out route.

use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use serde_json::json;

use pushcast_common::error::AppError;
use pushcast_common::types::NotifyRequest;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/notify", post(notify))
}

/// POST /notify: Push a notification to every browser the form targets.
///
/// Per-browser delivery failures are absorbed (the browser is pruned); the
/// response only fails when the registry cannot be persisted.
async fn notify(
    State(state): State<AppState>,
    Form(req): Form<NotifyRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(?req, "Notify request");
    state.dispatcher.notify(&req).await?;
    Ok(Json(json!({ "ok": true })))
}
