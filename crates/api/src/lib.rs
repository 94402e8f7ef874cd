//! HTTP surface for subscriber registration and notification fan-out.
//!
//! Endpoints:
//! - GET  /health: Liveness probe
//! - GET  /api/vapid-public-key: Key browsers subscribe with
//! - GET  /subscribers: Registered browsers
//! - POST /subscribe: Register or refresh a browser
//! - POST /unsubscribe: Forget a browser
//! - POST /notify: Fan a notification out to matching browsers

pub mod routes;
pub mod state;
