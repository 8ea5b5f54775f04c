//! Search configuration

use serde::{Deserialize, Serialize};

/// Configuration for hyperparameter search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Cross-validation folds for evaluation
    pub cv_folds: usize,

    /// Candidates drawn by randomized search
    pub n_iter: usize,

    /// Random seed
    pub random_state: Option<u64>,

    /// Number of parallel workers; 1 evaluates candidates sequentially
    pub n_jobs: usize,

    /// Whether to log every candidate
    pub verbose: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            n_iter: 15,
            random_state: Some(42),
            n_jobs: 0,
            verbose: true,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = n;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
