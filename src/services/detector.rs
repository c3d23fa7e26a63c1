// Scoring orchestrator
// Runs the extractors concurrently, merges their output and scores it with the
// trained model when one is ready, the heuristic otherwise

use super::classifier::{
    Classifier, ClassifierError, ForestModel, ForestParams, HeuristicClassifier, TrainingMatrix,
};
use super::extractors::{
    ContentFeatureExtractor, FeatureExtractor, TlsFeatureExtractor, UrlFeatureExtractor,
};
use super::indicators::{negative_indicators, positive_indicators};
use crate::app_config::AppConfig;
use crate::config::Watchlists;
use crate::models::{
    FeatureVector, PredictionResult, RiskLevel, ScoredBy, TrainingReport, TrainingSample, Verdict,
    SCHEMA_VERSION,
};
use crate::utils::http_fetch::{FetchConfig, FetchError, HttpFetcher, PageFetcher};
use crate::utils::tls_probe::{CertificateSource, TlsProbe, TlsProbeError};
use crate::utils::domain_age::{DomainAgeLookup, RdapLookup};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Model file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Training task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("HTTP client setup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("TLS probe setup failed: {0}")]
    TlsProbe(#[from] TlsProbeError),
}

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub forest: ForestParams,
    pub training_concurrency: usize,
    /// Concurrent predictions in one bulk upload
    pub bulk_concurrency: usize,
    /// Upper bound on feature extraction for a single prediction
    pub deadline: Duration,
    pub tls_port: u16,
    pub tls_timeout: Duration,
    pub domain_age_timeout: Duration,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            training_concurrency: 8,
            bulk_concurrency: 8,
            deadline: Duration::from_secs(20),
            tls_port: 443,
            tls_timeout: Duration::from_secs(5),
            domain_age_timeout: Duration::from_secs(5),
        }
    }
}

impl DetectorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            forest: ForestParams {
                n_trees: config.model.forest_size,
                max_depth: config.model.forest_max_depth,
                seed: config.model.forest_seed,
            },
            training_concurrency: config.model.training_concurrency.max(1),
            bulk_concurrency: config.model.bulk_concurrency.max(1),
            deadline: config.network.predict_deadline(),
            tls_port: config.network.tls_port,
            tls_timeout: config.network.tls_timeout(),
            domain_age_timeout: config.network.domain_age_timeout(),
        }
    }
}

/// Network primitives the extractors are built on
#[derive(Clone)]
pub struct Primitives {
    pub fetcher: Arc<dyn PageFetcher>,
    pub certificates: Arc<dyn CertificateSource>,
    pub domain_age: Arc<dyn DomainAgeLookup>,
}

/// Snapshot of the loaded model for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub ready: bool,
    pub loaded: bool,
    pub schema_version: u32,
    pub trees: usize,
    pub columns: usize,
}

// =============================================================================
// DETECTOR
// =============================================================================

pub struct PhishingDetector {
    url: Arc<dyn FeatureExtractor>,
    content: Arc<dyn FeatureExtractor>,
    tls: Arc<dyn FeatureExtractor>,
    heuristic: HeuristicClassifier,
    model: RwLock<Option<ForestModel>>,
    train_lock: Mutex<()>,
    settings: DetectorSettings,
}

impl PhishingDetector {
    pub fn new(
        url: Arc<dyn FeatureExtractor>,
        content: Arc<dyn FeatureExtractor>,
        tls: Arc<dyn FeatureExtractor>,
        settings: DetectorSettings,
    ) -> Self {
        Self {
            url,
            content,
            tls,
            heuristic: HeuristicClassifier,
            model: RwLock::new(None),
            train_lock: Mutex::new(()),
            settings,
        }
    }

    /// Standard extractors over the given primitives
    pub fn with_primitives(
        primitives: Primitives,
        watchlists: Arc<Watchlists>,
        settings: DetectorSettings,
    ) -> Self {
        let url = UrlFeatureExtractor::new(
            watchlists.clone(),
            primitives.domain_age,
            settings.domain_age_timeout,
        );
        let content = ContentFeatureExtractor::new(primitives.fetcher, watchlists.clone());
        let tls = TlsFeatureExtractor::new(
            primitives.certificates,
            watchlists,
            settings.tls_port,
            settings.tls_timeout,
        );

        Self::new(Arc::new(url), Arc::new(content), Arc::new(tls), settings)
    }

    /// Live network primitives: page fetches skip certificate verification, RDAP does not
    pub fn from_config(config: &AppConfig) -> Result<Self, DetectorError> {
        let watchlists = Watchlists::load(&config.watchlists_path);

        let content_fetcher = HttpFetcher::new(FetchConfig::from_network(&config.network, false))?;
        let rdap_fetcher = HttpFetcher::new(FetchConfig::from_network(&config.network, true))?;

        let primitives = Primitives {
            fetcher: Arc::new(content_fetcher),
            certificates: Arc::new(TlsProbe::new()?),
            domain_age: Arc::new(RdapLookup::new(
                rdap_fetcher,
                config.network.rdap_base_url.clone(),
            )),
        };

        Ok(Self::with_primitives(
            primitives,
            watchlists,
            DetectorSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Features
    // -------------------------------------------------------------------------

    pub async fn extract_features(&self, url: &str) -> FeatureVector {
        self.extract_features_within(url, self.settings.deadline)
            .await
    }

    /// Merged vector from all three extractors with schema defaults applied.
    ///
    /// An extractor that misses the deadline contributes its fallback vector.
    pub async fn extract_features_within(&self, url: &str, deadline: Duration) -> FeatureVector {
        let (url_features, content_features, tls_features) = tokio::join!(
            bounded(self.url.as_ref(), url, deadline),
            bounded(self.content.as_ref(), url, deadline),
            bounded(self.tls.as_ref(), url, deadline),
        );

        let mut merged = FeatureVector::new();
        for (source, features) in [
            (self.url.source(), url_features),
            (self.content.source(), content_features),
            (self.tls.source(), tls_features),
        ] {
            for rejected in merged.merge_from(source, features) {
                warn!("Dropping feature outside extractor namespace: {}", rejected);
            }
        }

        merged.with_defaults()
    }

    // -------------------------------------------------------------------------
    // Prediction
    // -------------------------------------------------------------------------

    pub async fn predict(&self, url: &str) -> PredictionResult {
        self.predict_within(url, self.settings.deadline).await
    }

    pub async fn predict_within(&self, url: &str, deadline: Duration) -> PredictionResult {
        let started = Instant::now();
        let features = self.extract_features_within(url, deadline).await;
        let result = self.score(&features).await;

        info!(
            "Scored {} as {} ({:.2}, {}) by {:?} in {:?}",
            url,
            if result.is_phishing { "phishing" } else { "legitimate" },
            result.confidence,
            result.risk_level,
            result.scored_by,
            started.elapsed()
        );
        result
    }

    /// Verdict for a prepared vector; missing features take schema defaults
    pub async fn score(&self, features: &FeatureVector) -> PredictionResult {
        let features = features.with_defaults();

        let (verdict, scored_by) = {
            let model = self.model.read().await;
            match model.as_ref().filter(|m| m.is_ready()) {
                Some(model) => match classify(model, &features) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Model prediction failed, using heuristic: {}", e);
                        (self.heuristic.score(&features), self.heuristic.scored_by())
                    },
                },
                None => {
                    debug!("No ready model, using heuristic");
                    (self.heuristic.score(&features), self.heuristic.scored_by())
                },
            }
        };

        let confidence = verdict.score.clamp(0.0, 1.0);
        PredictionResult {
            is_phishing: verdict.is_phishing,
            confidence,
            risk_level: RiskLevel::from_score(confidence),
            negative_indicators: negative_indicators(&features),
            positive_indicators: positive_indicators(&features),
            scored_by,
        }
    }

    // -------------------------------------------------------------------------
    // Model lifecycle
    // -------------------------------------------------------------------------

    pub async fn is_model_ready(&self) -> bool {
        self.model
            .read()
            .await
            .as_ref()
            .is_some_and(ForestModel::is_ready)
    }

    pub async fn model_status(&self) -> ModelStatus {
        let model = self.model.read().await;
        match model.as_ref() {
            Some(m) => ModelStatus {
                ready: m.is_ready(),
                loaded: true,
                schema_version: m.schema_version(),
                trees: m.n_trees(),
                columns: m.columns().len(),
            },
            None => ModelStatus {
                ready: false,
                loaded: false,
                schema_version: SCHEMA_VERSION,
                trees: 0,
                columns: 0,
            },
        }
    }

    /// Extract features for every sample, fit a new ensemble and swap it in.
    ///
    /// Concurrent calls run one after another.
    pub async fn train(&self, samples: &[TrainingSample]) -> Result<TrainingReport, DetectorError> {
        let _training = self.train_lock.lock().await;

        if samples.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet.into());
        }
        let phishing_samples = samples.iter().filter(|s| s.is_phishing).count();
        if phishing_samples == 0 || phishing_samples == samples.len() {
            return Err(ClassifierError::SingleClass.into());
        }

        info!(
            "Extracting features for {} training samples ({} phishing)",
            samples.len(),
            phishing_samples
        );
        let started = Instant::now();

        let vectors: Vec<FeatureVector> = stream::iter(samples)
            .map(|sample| self.extract_features(&sample.url))
            .buffered(self.settings.training_concurrency.max(1))
            .collect()
            .await;
        let labels = samples.iter().map(|s| s.is_phishing).collect();
        let matrix = TrainingMatrix::assemble(&vectors, labels);
        let columns = matrix.columns.len();

        debug!(
            "Features extracted in {:?}, fitting {} trees over {} columns",
            started.elapsed(),
            self.settings.forest.n_trees,
            columns
        );

        let params = self.settings.forest;
        let model = tokio::task::spawn_blocking(move || ForestModel::fit(&matrix, &params)).await??;
        let trees = model.n_trees();

        *self.model.write().await = Some(model);

        info!(
            "Model trained on {} samples in {:?}",
            samples.len(),
            started.elapsed()
        );

        Ok(TrainingReport {
            samples: samples.len(),
            phishing_samples,
            columns,
            trees,
        })
    }

    /// Write the model as JSON; `Ok(false)` when there is nothing to save
    pub async fn save_model(&self, path: impl AsRef<Path>) -> Result<bool, DetectorError> {
        let path = path.as_ref();
        let json = {
            let model = self.model.read().await;
            match model.as_ref() {
                Some(model) => model.to_json()?,
                None => {
                    warn!("No trained model to save");
                    return Ok(false);
                },
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;

        info!("Model saved to {}", path.display());
        Ok(true)
    }

    /// Replace the current model with one read from disk
    pub async fn load_model(&self, path: impl AsRef<Path>) -> Result<(), DetectorError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let model = ForestModel::from_json(&json)?;

        if model.is_ready() {
            info!(
                "Model loaded from {} ({} trees, {} columns)",
                path.display(),
                model.n_trees(),
                model.columns().len()
            );
        } else {
            warn!(
                "Model at {} targets feature schema v{} (current v{}), heuristic stays in use",
                path.display(),
                model.schema_version(),
                SCHEMA_VERSION
            );
        }

        *self.model.write().await = Some(model);
        Ok(())
    }
}

async fn bounded(extractor: &dyn FeatureExtractor, url: &str, deadline: Duration) -> FeatureVector {
    match tokio::time::timeout(deadline, extractor.extract(url)).await {
        Ok(features) => features,
        Err(_) => {
            warn!(
                "{} extractor missed the {:?} deadline for {}",
                extractor.source(),
                deadline,
                url
            );
            extractor.fallback(url)
        },
    }
}

fn classify(
    classifier: &dyn Classifier,
    features: &FeatureVector,
) -> Result<(Verdict, ScoredBy), ClassifierError> {
    Ok((classifier.classify(features)?, classifier.scored_by()))
}
