// Service health: model readiness and feature schema

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{app::AppState, models::SCHEMA_VERSION};

/// GET /api/v1/health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let model = state.detector.model_status().await;

    Json(json!({
        "status": "healthy",
        "service": "phishing-detector",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.config.server.environment.to_string(),
        "feature_schema_version": SCHEMA_VERSION,
        "scoring": if model.ready { "model" } else { "heuristic" },
        "model": model,
    }))
}
