// Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{FeatureVector, RiskLevel};

// =============================================================================
// REQUEST MODELS
// =============================================================================

/// Body of `/analyze` and `/features`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 8192, message = "URL must be 1-8192 characters"))]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(min = 1, max = 8192, message = "URL must be 1-8192 characters"))]
    pub url: String,
    pub is_phishing: bool,
    #[validate(length(max = 1000, message = "Comment cannot exceed 1000 characters"))]
    pub comment: Option<String>,
}

// =============================================================================
// RESPONSE MODELS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAnalyzeItem {
    pub url: String,
    pub is_phishing: bool,
    pub confidence: f64,
    pub risk_level: RiskLevel,
}

/// Row of a bulk upload that could not be analyzed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAnalyzeSkipped {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAnalyzeResponse {
    pub results: Vec<BulkAnalyzeItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<BulkAnalyzeSkipped>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub url: String,
    pub schema_version: u32,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub success: bool,
}
