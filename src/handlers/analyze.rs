// URL analysis endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    app::AppState,
    models::{
        AnalyzeRequest, BulkAnalyzeItem, BulkAnalyzeResponse, BulkAnalyzeSkipped,
        FeaturesResponse, FeedbackRequest, FeedbackResponse, SCHEMA_VERSION,
    },
    utils::{
        api_errors::{ApiError, ApiResult},
        csv_rows::CsvTable,
        url_validator::normalize_input,
    },
};

/// Upper bound on URLs per bulk upload
pub const MAX_BULK_URLS: usize = 100;

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// =============================================================================
// ANALYSIS HANDLERS
// =============================================================================

/// Classify a single URL
/// POST /api/v1/analyze
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(body)?;
    request.validate()?;
    let url = normalize_input(&request.url)?;

    let result = state.detector.predict(&url).await;
    Ok(Json(result))
}

/// Classify every URL in the `url` column of an uploaded CSV
/// POST /api/v1/analyze/bulk
pub async fn analyze_bulk(State(state): State<AppState>, body: String) -> ApiResult<impl IntoResponse> {
    let table = CsvTable::parse(&body)?;
    let urls = table.column("url")?;

    if urls.len() > MAX_BULK_URLS {
        return Err(ApiError::BadRequest(format!(
            "Maximum {} URLs can be analyzed at once",
            MAX_BULK_URLS
        )));
    }

    let mut skipped = Vec::new();
    let mut targets = Vec::with_capacity(urls.len());
    for raw in urls {
        match normalize_input(&raw) {
            Ok(url) => targets.push(url),
            Err(e) => {
                warn!("Skipping bulk row {:?}: {}", raw, e);
                skipped.push(BulkAnalyzeSkipped {
                    url: raw,
                    error: e.to_string(),
                });
            },
        }
    }

    info!("Bulk analysis of {} URLs", targets.len());

    let detector = &state.detector;
    let results: Vec<BulkAnalyzeItem> = stream::iter(targets)
        .map(|url| async move {
            let result = detector.predict(&url).await;
            BulkAnalyzeItem {
                url,
                is_phishing: result.is_phishing,
                confidence: result.confidence,
                risk_level: result.risk_level,
            }
        })
        .buffered(detector.settings().bulk_concurrency.max(1))
        .collect()
        .await;

    Ok(Json(BulkAnalyzeResponse { results, skipped }))
}

/// Merged feature vector for a URL
/// POST /api/v1/features
pub async fn features(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(body)?;
    request.validate()?;
    let url = normalize_input(&request.url)?;

    let features = state.detector.extract_features(&url).await;
    Ok(Json(FeaturesResponse {
        url,
        schema_version: SCHEMA_VERSION,
        features,
    }))
}

/// Record a user verdict; it is only logged
/// POST /api/v1/feedback
pub async fn feedback(
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(body)?;
    request.validate()?;

    info!(
        url = %request.url,
        is_phishing = request.is_phishing,
        comment = request.comment.as_deref().unwrap_or(""),
        "User feedback received"
    );

    Ok(Json(FeedbackResponse { success: true }))
}
