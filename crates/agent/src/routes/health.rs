use axum::Json;
use tracebench_core::protocol::HealthResponse;

/// GET /health: agent liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
