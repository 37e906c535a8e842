use crate::interface_adapters::protocol::HealthResponse;
use crate::interface_adapters::state::AppState;

use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Copy out of the watch immediately; never hold the borrow across an await.
    let stats = *state.stats_tx.borrow();
    Json(HealthResponse::from(stats))
}
