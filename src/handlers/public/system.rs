// handlers/public/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service info and route overview
pub async fn root_get(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Journal Backend",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "endpoints": {
                "public": ["/", "/health", "/login", "/register", "/refresh", "/profiles"],
                "session": ["/logout", "/whoami"],
                "profiles": ["/profiles/me"],
                "entries": ["/entries", "/delete"],
                "keys": ["/keys/bundle", "/keys/bundle/:user_id", "/keys/bundle/:user_id/count"],
            }
        }
    }))
}

/// GET /health - Store liveness
pub async fn health_get(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
