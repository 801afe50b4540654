use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::server::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "rowgate",
        "version": version,
        "description": "JSON-over-HTTP gateway to PostgreSQL tables with role and row-level security",
        "endpoints": {
            "home": "/",
            "health": "/health",
            "records": "/api/:schema/:table[/:record]",
        }
    }))
}

/// GET /health - database round-trip check
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok",
                "cache_entries": state.store.cache().map(|c| c.len()),
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string(),
                })),
            )
        }
    }
}
