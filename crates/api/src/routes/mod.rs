pub mod health;
pub mod notify;
pub mod subscribers;
pub mod vapid;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(vapid::router())
        .merge(subscribers::router())
        .merge(notify::router())
        .with_state(state)
}
