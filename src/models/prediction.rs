// Prediction and training records exchanged with callers

use serde::{Deserialize, Serialize};

/// Maximum number of indicators reported per list
pub const MAX_INDICATORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,      // < 0.2
    Medium,   // 0.2 - 0.5
    High,     // 0.5 - 0.8
    VeryHigh, // >= 0.8
}

impl RiskLevel {
    /// Tier for a confidence score; each tier includes its lower bound
    pub fn from_score(score: f64) -> Self {
        if score < 0.2 {
            RiskLevel::Low
        } else if score < 0.5 {
            RiskLevel::Medium
        } else if score < 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
            RiskLevel::VeryHigh => write!(f, "Very High"),
        }
    }
}

/// Which classifier produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoredBy {
    Model,
    Heuristic,
}

/// Label and score from a classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_phishing: bool,
    /// Phishing probability in [0, 1]
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub is_phishing: bool,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub negative_indicators: Vec<String>,
    pub positive_indicators: Vec<String>,
    pub scored_by: ScoredBy,
}

/// Labelled URL used to fit the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub url: String,
    pub is_phishing: bool,
}

impl TrainingSample {
    pub fn new(url: impl Into<String>, is_phishing: bool) -> Self {
        Self {
            url: url.into(),
            is_phishing,
        }
    }
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub phishing_samples: usize,
    pub columns: usize,
    pub trees: usize,
}
