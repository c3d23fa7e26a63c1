// Offline training: fit the classifier on a labelled CSV and save it

use std::env;

use phishing_detector::{load_training_samples, AppConfig, PhishingDetector};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phishing_detector=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Usage: phishing-detector-train [dataset.csv] [model.json]
    let mut args = env::args().skip(1);
    let dataset = args
        .next()
        .unwrap_or_else(|| config.model.training_csv_path.clone());
    let model_path = args.next().unwrap_or_else(|| config.model.model_path.clone());

    let samples = load_training_samples(&dataset).await?;
    info!("Loaded {} samples from {}", samples.len(), dataset);

    let detector = PhishingDetector::from_config(&config)?;
    let report = detector.train(&samples).await?;
    info!(
        "Trained {} trees over {} columns ({} of {} samples phishing)",
        report.trees, report.columns, report.phishing_samples, report.samples
    );

    if detector.save_model(&model_path).await? {
        info!("Model written to {}", model_path);
    }

    Ok(())
}
