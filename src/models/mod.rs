// Data models for the phishing detector

pub mod api;
pub mod features;
pub mod prediction;

pub use api::{
    AnalyzeRequest, BulkAnalyzeItem, BulkAnalyzeResponse, BulkAnalyzeSkipped, FeaturesResponse,
    FeedbackRequest, FeedbackResponse,
};
pub use features::{
    Feature, FeatureKind, FeatureSource, FeatureVector, SchemaError, SCHEMA_VERSION, UNKNOWN,
};
pub use prediction::{
    PredictionResult, RiskLevel, ScoredBy, TrainingReport, TrainingSample, Verdict, MAX_INDICATORS,
};
