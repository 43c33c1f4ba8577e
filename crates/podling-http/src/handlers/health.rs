use axum::extract::State;
use axum::Json;

use crate::response::HealthResponse;
use crate::state::AppState;

/// `GET /health` — plain liveness check, no auth or validation.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "podling-worker",
        node_id: state.agent.node_id().await,
    })
}
