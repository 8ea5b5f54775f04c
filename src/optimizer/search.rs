//! Exhaustive and randomized hyperparameter search

use super::config::SearchConfig;
use super::search_space::{format_params, int_linspace, ParamSpace, ParameterValue, TrialParams};
use crate::error::{BoxOfficeError, Result};
use crate::training::{cross_val_score, CVResults, CrossValidator, Estimator};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// One evaluated candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub params: TrialParams,
    pub cv: CVResults,
    pub duration_secs: f64,
}

/// Outcome of a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_params: TrialParams,
    /// Mean cross-validated score of the best candidate
    pub best_score: f64,
    /// Every candidate in evaluation order
    pub trials: Vec<Trial>,
}

/// The grid tuned for the box-office forest
pub fn default_grid_space() -> ParamSpace {
    ParamSpace::new()
        .choices("bootstrap", [true])
        .choices("max_depth", [80i64, 90, 100, 110])
        .choices("max_features", [2i64, 3])
        .choices("min_samples_leaf", [3i64, 4, 5])
        .choices("min_samples_split", [8i64, 10, 12])
        .choices("n_estimators", [100i64, 200, 300, 1000])
}

/// The distributions sampled by randomized search
pub fn default_random_space() -> ParamSpace {
    let mut max_depth: Vec<ParameterValue> = int_linspace(10, 110, 11)
        .into_iter()
        .map(ParameterValue::Int)
        .collect();
    max_depth.push(ParameterValue::None);

    ParamSpace::new()
        .choices("n_estimators", int_linspace(200, 2000, 10))
        .choices("max_features", ["auto", "sqrt"])
        .choices("max_depth", max_depth)
        .choices("min_samples_split", [2i64, 5, 10])
        .choices("min_samples_leaf", [1i64, 2, 4])
        .choices("bootstrap", [true, false])
}

fn evaluate_candidates<E>(
    estimator: &E,
    candidates: Vec<TrialParams>,
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &SearchConfig,
) -> Result<SearchResult>
where
    E: Estimator + Clone,
{
    let cv = CrossValidator::new(config.cv_folds);
    let total = candidates.len();
    info!(
        candidates = total,
        folds = config.cv_folds,
        fits = total * config.cv_folds,
        "starting search"
    );

    let evaluate = |params: &TrialParams| -> Result<Trial> {
        let start = Instant::now();
        let mut model = estimator.clone();
        model.configure(params)?;
        let results = cross_val_score(&model, x, y, &cv)?;
        let duration_secs = start.elapsed().as_secs_f64();
        if config.verbose {
            info!(
                params = %format_params(params),
                mean_score = results.mean_score,
                std_score = results.std_score,
                duration_secs,
                "evaluated candidate"
            );
        }
        Ok(Trial {
            params: params.clone(),
            cv: results,
            duration_secs,
        })
    };

    let trials: Vec<Trial> = if config.n_jobs == 1 {
        candidates.iter().map(evaluate).collect::<Result<_>>()?
    } else {
        candidates.par_iter().map(evaluate).collect::<Result<_>>()?
    };

    // first candidate wins ties; NaN never wins
    let best = trials
        .iter()
        .filter(|t| !t.cv.mean_score.is_nan())
        .fold(None, |best: Option<&Trial>, t| match best {
            Some(b) if b.cv.mean_score >= t.cv.mean_score => Some(b),
            _ => Some(t),
        })
        .map(|t| (t.params.clone(), t.cv.mean_score))
        .ok_or_else(|| BoxOfficeError::SearchError("no candidate produced a score".to_string()))?;

    let result = SearchResult {
        best_params: best.0,
        best_score: best.1,
        trials,
    };
    info!(
        best_params = %format_params(&result.best_params),
        best_score = result.best_score,
        "search finished"
    );
    Ok(result)
}

/// Evaluates every point of a parameter grid
#[derive(Debug, Clone)]
pub struct GridSearch {
    space: ParamSpace,
    config: SearchConfig,
}

impl GridSearch {
    pub fn new(space: ParamSpace) -> Self {
        Self {
            space,
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn space(&self) -> &ParamSpace {
        &self.space
    }

    pub fn fit<E: Estimator + Clone>(
        &self,
        estimator: &E,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<SearchResult> {
        let candidates = self.space.grid()?;
        evaluate_candidates(estimator, candidates, x, y, &self.config)
    }
}

/// Evaluates `n_iter` distinct points drawn from a parameter grid
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    space: ParamSpace,
    config: SearchConfig,
}

impl RandomizedSearch {
    pub fn new(space: ParamSpace) -> Self {
        Self {
            space,
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn space(&self) -> &ParamSpace {
        &self.space
    }

    /// The candidates this search would evaluate
    pub fn candidates(&self) -> Result<Vec<TrialParams>> {
        let mut rng = match self.config.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.space.sample(self.config.n_iter, &mut rng)
    }

    pub fn fit<E: Estimator + Clone>(
        &self,
        estimator: &E,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<SearchResult> {
        let candidates = self.candidates()?;
        evaluate_candidates(estimator, candidates, x, y, &self.config)
    }
}
