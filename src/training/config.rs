//! Training configuration

use super::random_forest::{MaxFeatures, RandomForestRegressor};
use serde::{Deserialize, Serialize};

/// Hyperparameters of the revenue forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 25,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: Some(42),
        }
    }
}

impl ForestConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// An unfitted forest with these settings
    pub fn build(&self) -> RandomForestRegressor {
        let forest = RandomForestRegressor::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_bootstrap(self.bootstrap);
        match self.random_state {
            Some(seed) => forest.with_random_state(seed),
            None => forest,
        }
    }
}

/// Configuration for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Target column
    pub label_column: String,
    /// Row identifier copied into the submission
    pub id_column: String,
    /// Keep the id column among the model inputs
    pub id_as_feature: bool,
    /// Cross-validation folds for `cross-validate`
    pub cv_folds: usize,
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            label_column: "revenue".to_string(),
            id_column: "id".to_string(),
            id_as_feature: true,
            cv_folds: 5,
            forest: ForestConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_id_as_feature(mut self, keep: bool) -> Self {
        self.id_as_feature = keep;
        self
    }
}
