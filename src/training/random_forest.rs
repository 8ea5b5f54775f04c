//! Random forest regressor

use super::decision_tree::DecisionTreeRegressor;
use super::estimator::Estimator;
use crate::error::{BoxOfficeError, Result};
use crate::optimizer::{ParameterValue, TrialParams};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// All features
    All,
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// Fraction of n_features
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve against the number of columns, never below one
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::Fixed(k) => k.min(n_features),
            MaxFeatures::Fraction(f) => (n * f).floor() as usize,
        }
        .max(1)
    }

    fn from_parameter(value: &ParameterValue) -> Result<Self> {
        let invalid = |reason: &str| BoxOfficeError::InvalidParameter {
            name: "max_features".to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        match value {
            ParameterValue::None => Ok(MaxFeatures::All),
            ParameterValue::String(s) => match s.as_str() {
                // "auto" means every feature for regressors
                "auto" | "all" => Ok(MaxFeatures::All),
                "sqrt" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                _ => Err(invalid("expected auto, sqrt or log2")),
            },
            ParameterValue::Int(k) if *k >= 1 => Ok(MaxFeatures::Fixed(*k as usize)),
            ParameterValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
            _ => Err(invalid("expected a positive count or a fraction in (0, 1]")),
        }
    }
}

/// Bagged regression trees averaged at prediction time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(BoxOfficeError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.n_estimators == 0 {
            return Err(BoxOfficeError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if n_samples == 0 {
            return Err(BoxOfficeError::ValidationError(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }

        self.n_features = n_features;
        let max_features = self.max_features.resolve(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<DecisionTreeRegressor> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTreeRegressor> {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let mut tree = DecisionTreeRegressor::new()
                    .with_max_depth(self.max_depth)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(Some(max_features))
                    .with_random_state(rng.gen());

                if self.bootstrap {
                    let sample: Vec<usize> =
                        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let x_boot = x.select(Axis(0), &sample);
                    let y_boot = y.select(Axis(0), &sample);
                    tree.fit(&x_boot, &y_boot)?;
                } else {
                    tree.fit(x, y)?;
                }
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();
        debug!(
            n_trees = self.trees.len(),
            n_samples,
            n_features,
            max_features,
            "fitted random forest"
        );
        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, val) in total.iter_mut().zip(imp.iter()) {
                    *acc += val;
                }
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Mean prediction of every tree
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(BoxOfficeError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut mean = Array1::zeros(x.nrows());
        for predictions in &all_predictions {
            mean += predictions;
        }
        mean /= all_predictions.len() as f64;
        Ok(mean)
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

fn expect_usize(name: &str, value: &ParameterValue, min: usize) -> Result<usize> {
    value
        .as_usize()
        .filter(|v| *v >= min)
        .ok_or_else(|| BoxOfficeError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: format!("expected an integer >= {}", min),
        })
}

impl Estimator for RandomForestRegressor {
    fn configure(&mut self, params: &TrialParams) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.n_estimators = expect_usize(name, value, 1)?,
                "max_depth" => {
                    self.max_depth = if value.is_none() {
                        None
                    } else {
                        Some(expect_usize(name, value, 1)?)
                    }
                }
                "min_samples_split" => self.min_samples_split = expect_usize(name, value, 2)?,
                "min_samples_leaf" => self.min_samples_leaf = expect_usize(name, value, 1)?,
                "max_features" => self.max_features = MaxFeatures::from_parameter(value)?,
                "bootstrap" => {
                    self.bootstrap =
                        value.as_bool().ok_or_else(|| BoxOfficeError::InvalidParameter {
                            name: name.clone(),
                            value: value.to_string(),
                            reason: "expected a boolean".to_string(),
                        })?
                }
                "random_state" => {
                    self.random_state = if value.is_none() {
                        None
                    } else {
                        Some(expect_usize(name, value, 0)? as u64)
                    }
                }
                _ => {
                    return Err(BoxOfficeError::InvalidParameter {
                        name: name.clone(),
                        value: value.to_string(),
                        reason: "not a random forest parameter".to_string(),
                    })
                }
            }
        }
        // configuration changes invalidate the fitted trees
        self.trees.clear();
        self.feature_importances = None;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForestRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForestRegressor::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}
