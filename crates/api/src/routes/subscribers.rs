//! Subscriber registration routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use pushcast_common::error::AppError;
use pushcast_common::types::{SubscribeRequest, SubscriberRecord, UnsubscribeRequest};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribers", get(list_subscribers))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
}

/// GET /subscribers: Every registered browser.
async fn list_subscribers(State(state): State<AppState>) -> Json<Vec<SubscriberRecord>> {
    Json(state.registry.list().await.collect())
}

/// POST /subscribe: Register a browser, replacing any previous registration
/// for the same user, store and fingerprint.
async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(?req, "Subscribe request");
    let record = req.into_record()?;
    state.registry.upsert(record).await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /unsubscribe: Forget a browser. Unknown browsers are not an error.
async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(?req, "Unsubscribe request");
    let (user_id, store_id, fingerprint) = req.into_parts()?;
    state
        .registry
        .remove(&user_id, &store_id, &fingerprint)
        .await?;
    Ok(Json(json!({ "ok": true })))
}
