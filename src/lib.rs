// Library exports for the phishing detector
// This file exposes modules and functions for library consumers

pub mod app;
pub mod app_config;
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;

use tracing::{info, warn};

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, ConfigError};
pub use config::Watchlists;
pub use handlers::app_router;
pub use models::{Feature, FeatureVector, PredictionResult, RiskLevel, TrainingSample};
pub use services::{DetectorError, DetectorSettings, PhishingDetector, Primitives};

/// Read labelled samples from a CSV with `url` and `is_phishing` columns
pub async fn load_training_samples(path: impl AsRef<Path>) -> anyhow::Result<Vec<TrainingSample>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(utils::read_training_samples(&text)?)
}

/// Bring the classifier up: load the saved model, otherwise train on the bundled
/// dataset and save it, otherwise stay on the heuristic
pub async fn prepare_model(detector: &PhishingDetector, config: &AppConfig) {
    let model_path = Path::new(&config.model.model_path);

    if model_path.exists() {
        match detector.load_model(model_path).await {
            Ok(()) => return,
            Err(e) => warn!("Failed to load model from {}: {}", model_path.display(), e),
        }
    }

    let dataset = Path::new(&config.model.training_csv_path);
    if !dataset.exists() {
        warn!(
            "No model at {} and no dataset at {}, scoring with the heuristic",
            model_path.display(),
            dataset.display()
        );
        return;
    }

    let samples = match load_training_samples(dataset).await {
        Ok(samples) => samples,
        Err(e) => {
            warn!("Failed to read {}: {}", dataset.display(), e);
            return;
        },
    };

    match detector.train(&samples).await {
        Ok(report) => {
            info!(
                "Trained on {} samples ({} phishing, {} columns, {} trees)",
                report.samples, report.phishing_samples, report.columns, report.trees
            );
            if let Err(e) = detector.save_model(model_path).await {
                warn!("Failed to save model to {}: {}", model_path.display(), e);
            }
        },
        Err(e) => warn!("Training failed, scoring with the heuristic: {}", e),
    }
}

/// Library initialization for external consumers
pub async fn initialize_app_state() -> anyhow::Result<AppState> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    let detector = PhishingDetector::from_config(&config)?;
    prepare_model(&detector, &config).await;

    Ok(AppState::new(detector, config))
}
