// Services module for the phishing detector
// Feature extraction, classification and the scoring orchestrator

pub mod classifier;
pub mod detector;
pub mod extractors;
pub mod indicators;

// Re-export commonly used services
pub use classifier::{
    Classifier, ClassifierError, ForestModel, ForestParams, HeuristicClassifier, TrainingMatrix,
};
pub use detector::{DetectorError, DetectorSettings, ModelStatus, PhishingDetector, Primitives};
pub use extractors::{
    ContentFeatureExtractor, FeatureExtractor, TlsFeatureExtractor, UrlFeatureExtractor,
};
pub use indicators::{negative_indicators, positive_indicators};
