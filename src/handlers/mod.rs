// HTTP handlers for the analyzer API

pub mod analyze;
pub mod health;

use crate::app::AppState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// Analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze::analyze))
        .route("/analyze/bulk", post(analyze::analyze_bulk))
        .route("/features", post(analyze::features))
        .route("/feedback", post(analyze::feedback))
        .route("/health", get(health::health_check))
}

/// Complete application router, API nested under `/api/v1`
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .nest("/api/v1", analyze_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
