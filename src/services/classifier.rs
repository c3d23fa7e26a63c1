// Classifiers over a merged feature vector
// A bagged decision-tree ensemble when one is trained, a fixed rule scorer otherwise

use crate::models::{Feature, FeatureVector, ScoredBy, Verdict, SCHEMA_VERSION, UNKNOWN};
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model is not fitted")]
    NotFitted,

    #[error("Model was trained for feature schema v{found}, current is v{expected}")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Training set needs both phishing and legitimate samples")]
    SingleClass,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Fit failed: {0}")]
    Fit(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait Classifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<Verdict, ClassifierError>;

    fn scored_by(&self) -> ScoredBy;
}

// =============================================================================
// HEURISTIC
// =============================================================================

/// Nine fixed suspicion criteria; the score is the fraction that hold
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub const THRESHOLD: f64 = 0.4;

    /// Each criterion reads its feature with its own default
    pub fn criteria(features: &FeatureVector) -> [bool; 9] {
        let f = |feature: Feature, default: f64| features.get_or(feature, default);
        [
            f(Feature::UsesHttps, 1.0) == 0.0,
            f(Feature::UsesIpAddress, 0.0) == 1.0,
            f(Feature::SuspiciousTld, 0.0) == 1.0,
            f(Feature::ContainsPopularDomain, 0.0) == 1.0,
            // an unknown age (-1) counts as young
            f(Feature::DomainAgeDays, 365.0) < 30.0,
            f(Feature::FormExternalAction, 0.0) == 1.0,
            f(Feature::HasRedirect, 0.0) == 1.0,
            f(Feature::DomainMatch, 1.0) == 0.0 && f(Feature::HasSsl, 0.0) == 1.0,
            f(Feature::SuspiciousTextScore, 0.0) >= 2.0,
        ]
    }

    pub fn score(&self, features: &FeatureVector) -> Verdict {
        let criteria = Self::criteria(features);
        let hits = criteria.iter().filter(|hit| **hit).count();
        let score = hits as f64 / criteria.len() as f64;

        Verdict {
            is_phishing: score > Self::THRESHOLD,
            score,
        }
    }
}

impl Classifier for HeuristicClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<Verdict, ClassifierError> {
        Ok(self.score(features))
    }

    fn scored_by(&self) -> ScoredBy {
        ScoredBy::Heuristic
    }
}

// =============================================================================
// TREE ENSEMBLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            seed: 42,
        }
    }
}

/// Labelled rows aligned to a fixed column order
#[derive(Debug, Clone)]
pub struct TrainingMatrix {
    pub columns: Vec<Feature>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<bool>,
}

impl TrainingMatrix {
    /// Columns are the union of features seen in any vector, in schema order;
    /// cells a vector lacks are filled with the unknown sentinel
    pub fn assemble(vectors: &[FeatureVector], labels: Vec<bool>) -> Self {
        let columns: Vec<Feature> = Feature::ALL
            .into_iter()
            .filter(|f| vectors.iter().any(|v| v.contains(*f)))
            .collect();
        let rows = vectors.iter().map(|v| v.row(&columns, UNKNOWN)).collect();

        Self {
            columns,
            rows,
            labels,
        }
    }

    pub fn phishing_count(&self) -> usize {
        self.labels.iter().filter(|l| **l).count()
    }
}

/// Bagged decision trees; the score is the share of trees voting phishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    schema_version: u32,
    columns: Vec<Feature>,
    trees: Vec<DecisionTree<f64, usize>>,
}

impl ForestModel {
    pub const THRESHOLD: f64 = 0.5;

    pub fn fit(matrix: &TrainingMatrix, params: &ForestParams) -> Result<Self, ClassifierError> {
        let n_rows = matrix.rows.len();
        let n_cols = matrix.columns.len();

        if n_rows == 0 || n_cols == 0 {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if matrix.labels.len() != n_rows {
            return Err(ClassifierError::InvalidInput(format!(
                "{} rows but {} labels",
                n_rows,
                matrix.labels.len()
            )));
        }
        let phishing = matrix.phishing_count();
        if phishing == 0 || phishing == n_rows {
            return Err(ClassifierError::SingleClass);
        }
        if params.n_trees == 0 {
            return Err(ClassifierError::InvalidInput(
                "ensemble needs at least one tree".to_string(),
            ));
        }

        let flat: Vec<f64> = matrix.rows.iter().flatten().copied().collect();
        let records = Array2::from_shape_vec((n_rows, n_cols), flat)?;
        let targets: Array1<usize> = matrix.labels.iter().map(|l| usize::from(*l)).collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let dataset = Dataset::new(
                records.select(Axis(0), &sample),
                targets.select(Axis(0), &sample),
            );

            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(Some(params.max_depth))
                .fit(&dataset)
                .map_err(|e| ClassifierError::Fit(e.to_string()))?;
            trees.push(tree);
        }

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            columns: matrix.columns.clone(),
            trees,
        })
    }

    /// Fitted against the current feature schema
    pub fn is_ready(&self) -> bool {
        self.schema_version == SCHEMA_VERSION && !self.trees.is_empty() && !self.columns.is_empty()
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn columns(&self) -> &[Feature] {
        &self.columns
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Verdict, ClassifierError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ClassifierError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: self.schema_version,
            });
        }
        if !self.is_ready() {
            return Err(ClassifierError::NotFitted);
        }

        let row = features.row(&self.columns, UNKNOWN);
        if let Some(bad) = row.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::InvalidInput(format!(
                "non-finite value for {}",
                self.columns[bad]
            )));
        }
        let record = Array2::from_shape_vec((1, row.len()), row)?;

        let votes = self
            .trees
            .iter()
            .filter(|tree| tree.predict(&record).get(0).copied() == Some(1))
            .count();
        let score = votes as f64 / self.trees.len() as f64;

        Ok(Verdict {
            is_phishing: score > Self::THRESHOLD,
            score,
        })
    }

    pub fn to_json(&self) -> Result<String, ClassifierError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Classifier for ForestModel {
    fn classify(&self, features: &FeatureVector) -> Result<Verdict, ClassifierError> {
        self.predict(features)
    }

    fn scored_by(&self) -> ScoredBy {
        ScoredBy::Model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(Feature, f64)]) -> FeatureVector {
        pairs.iter().copied().collect()
    }

    /// https sites with old domains vs. http sites on suspicious TLDs
    fn separable_matrix() -> TrainingMatrix {
        let mut vectors = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            vectors.push(vector(&[
                (Feature::UsesHttps, 1.0),
                (Feature::SuspiciousTld, 0.0),
                (Feature::DomainAgeDays, 1000.0 + i as f64),
            ]));
            labels.push(false);
            vectors.push(vector(&[
                (Feature::UsesHttps, 0.0),
                (Feature::SuspiciousTld, 1.0),
                (Feature::DomainAgeDays, i as f64),
            ]));
            labels.push(true);
        }
        TrainingMatrix::assemble(&vectors, labels)
    }

    #[test]
    fn test_heuristic_clean_vector_scores_zero() {
        let verdict = HeuristicClassifier.score(&vector(&[
            (Feature::UsesHttps, 1.0),
            (Feature::DomainAgeDays, 4000.0),
            (Feature::HasSsl, 1.0),
            (Feature::DomainMatch, 1.0),
        ]));

        assert_eq!(verdict.score, 0.0);
        assert!(!verdict.is_phishing);
    }

    #[test]
    fn test_heuristic_defaults_apply_per_rule() {
        // empty vector: https assumed, age 365, nothing else suspicious
        let verdict = HeuristicClassifier.score(&FeatureVector::new());
        assert_eq!(verdict.score, 0.0);

        // unknown age counts as recently registered
        let verdict = HeuristicClassifier.score(&vector(&[(Feature::DomainAgeDays, -1.0)]));
        assert_eq!(verdict.score, 1.0 / 9.0);
    }

    #[test]
    fn test_heuristic_threshold() {
        // four of nine: 0.444 > 0.4
        let verdict = HeuristicClassifier.score(&vector(&[
            (Feature::UsesHttps, 0.0),
            (Feature::SuspiciousTld, 1.0),
            (Feature::ContainsPopularDomain, 1.0),
            (Feature::DomainAgeDays, 5.0),
        ]));
        assert!((verdict.score - 4.0 / 9.0).abs() < 1e-12);
        assert!(verdict.is_phishing);

        // three of nine: 0.333
        let verdict = HeuristicClassifier.score(&vector(&[
            (Feature::UsesHttps, 0.0),
            (Feature::SuspiciousTld, 1.0),
            (Feature::DomainAgeDays, 5.0),
        ]));
        assert!(!verdict.is_phishing);
    }

    #[test]
    fn test_certificate_mismatch_needs_ssl() {
        let mismatch_without_ssl = vector(&[(Feature::DomainMatch, 0.0), (Feature::HasSsl, 0.0)]);
        assert_eq!(HeuristicClassifier.score(&mismatch_without_ssl).score, 0.0);

        let mismatch_with_ssl = vector(&[(Feature::DomainMatch, 0.0), (Feature::HasSsl, 1.0)]);
        assert_eq!(HeuristicClassifier.score(&mismatch_with_ssl).score, 1.0 / 9.0);
    }

    #[test]
    fn test_matrix_columns_follow_schema_order() {
        let vectors = vec![
            vector(&[(Feature::HasSsl, 1.0), (Feature::UrlLength, 20.0)]),
            vector(&[(Feature::HasForm, 1.0)]),
        ];
        let matrix = TrainingMatrix::assemble(&vectors, vec![false, true]);

        assert_eq!(
            matrix.columns,
            vec![Feature::UrlLength, Feature::HasForm, Feature::HasSsl]
        );
        assert_eq!(matrix.rows[1], vec![-1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_forest_learns_separable_data() {
        let params = ForestParams {
            n_trees: 15,
            ..ForestParams::default()
        };
        let model = ForestModel::fit(&separable_matrix(), &params).unwrap();

        assert!(model.is_ready());
        assert_eq!(model.n_trees(), 15);

        let phishing = model
            .predict(&vector(&[
                (Feature::UsesHttps, 0.0),
                (Feature::SuspiciousTld, 1.0),
                (Feature::DomainAgeDays, 3.0),
            ]))
            .unwrap();
        assert!(phishing.is_phishing);
        assert!(phishing.score > 0.5 && phishing.score <= 1.0);

        let legit = model
            .predict(&vector(&[
                (Feature::UsesHttps, 1.0),
                (Feature::SuspiciousTld, 0.0),
                (Feature::DomainAgeDays, 2000.0),
            ]))
            .unwrap();
        assert!(!legit.is_phishing);
    }

    #[test]
    fn test_forest_is_deterministic_for_a_seed() {
        let params = ForestParams {
            n_trees: 5,
            ..ForestParams::default()
        };
        let a = ForestModel::fit(&separable_matrix(), &params).unwrap();
        let b = ForestModel::fit(&separable_matrix(), &params).unwrap();

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_forest_rejects_single_class() {
        let vectors = vec![vector(&[(Feature::UrlLength, 1.0)]); 3];
        let matrix = TrainingMatrix::assemble(&vectors, vec![true, true, true]);

        assert!(matches!(
            ForestModel::fit(&matrix, &ForestParams::default()),
            Err(ClassifierError::SingleClass)
        ));
        assert!(matches!(
            ForestModel::fit(&TrainingMatrix::assemble(&[], vec![]), &ForestParams::default()),
            Err(ClassifierError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_forest_json_round_trip_and_schema_check() {
        let params = ForestParams {
            n_trees: 3,
            ..ForestParams::default()
        };
        let model = ForestModel::fit(&separable_matrix(), &params).unwrap();
        let json = model.to_json().unwrap();
        let restored = ForestModel::from_json(&json).unwrap();
        assert!(restored.is_ready());
        assert_eq!(restored.columns(), model.columns());

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        let stale = ForestModel::from_json(&value.to_string()).unwrap();
        assert!(!stale.is_ready());
        assert!(matches!(
            stale.predict(&FeatureVector::new()),
            Err(ClassifierError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_forest_rejects_non_finite_input() {
        let params = ForestParams {
            n_trees: 3,
            ..ForestParams::default()
        };
        let model = ForestModel::fit(&separable_matrix(), &params).unwrap();

        assert!(matches!(
            model.predict(&vector(&[(Feature::DomainAgeDays, f64::NAN)])),
            Err(ClassifierError::InvalidInput(_))
        ));
    }
}
