//! K-fold cross-validation

use super::estimator::Estimator;
use crate::error::{BoxOfficeError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter; contiguous folds unless shuffling is enabled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidator {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl CrossValidator {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle sample order before folding, with a fixed seed
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(BoxOfficeError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(BoxOfficeError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
            indices.shuffle(&mut rng);
        }

        // the first n_samples % n_splits folds get one extra sample
        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: f64::NAN,
                std_score: f64::NAN,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance =
            scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}

/// Score a fresh copy of `estimator` on every fold.
///
/// The estimator passed in is left untouched; each fold fits its own clone.
pub fn cross_val_score<E>(
    estimator: &E,
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &CrossValidator,
) -> Result<CVResults>
where
    E: Estimator + Clone,
{
    if x.nrows() != y.len() {
        return Err(BoxOfficeError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    let mut scores = Vec::with_capacity(cv.n_splits());
    for split in cv.split(x.nrows())? {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut model = estimator.clone();
        model.fit(&x_train, &y_train)?;
        let score = model.score(&x_test, &y_test)?;
        debug!(fold = split.fold_idx, score, "scored fold");
        scores.push(score);
    }

    Ok(CVResults::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::RandomForestRegressor;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(5);
        let splits = cv.split(100).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }
        // unshuffled folds are contiguous
        assert_eq!(splits[0].test_indices, (0..20).collect::<Vec<_>>());

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_uneven_folds() {
        let splits = CrossValidator::new(3).split(10).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let a = CrossValidator::new(4).with_shuffle(42).split(40).unwrap();
        let b = CrossValidator::new(4).with_shuffle(42).split(40).unwrap();
        assert_eq!(a[0].test_indices, b[0].test_indices);
        assert_ne!(a[0].test_indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_splits() {
        assert!(CrossValidator::new(1).split(10).is_err());
        assert!(CrossValidator::new(5).split(3).is_err());
    }

    #[test]
    fn test_cv_results() {
        let results = CVResults::from_scores(vec![-1.0, -3.0]);
        assert_eq!(results.mean_score, -2.0);
        assert_eq!(results.std_score, 1.0);
        assert_eq!(results.n_folds, 2);
    }

    #[test]
    fn test_cross_val_score_on_forest() {
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(30, |i| 10.0 + i as f64);
        let forest = RandomForestRegressor::new(5).with_random_state(1);

        let results = cross_val_score(&forest, &x, &y, &CrossValidator::new(3)).unwrap();
        assert_eq!(results.n_folds, 3);
        assert!(results.scores.iter().all(|s| *s <= 0.0));
        assert!(!forest.is_fitted());
    }
}
