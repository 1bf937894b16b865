use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Liveness only; the backend is reported as configured or not, never probed
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "backend_configured": state.gateway.backend().is_configured(),
        }
    }))
}
