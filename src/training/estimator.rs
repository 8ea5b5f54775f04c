//! Common interface for models driven by cross-validation and search

use super::metrics::neg_mean_squared_log_error;
use crate::error::Result;
use crate::optimizer::TrialParams;
use ndarray::{Array1, Array2};

/// A regressor that can be reconfigured from named hyperparameters
pub trait Estimator: Send + Sync {
    /// Apply hyperparameters; unknown names or bad values are errors
    fn configure(&mut self, params: &TrialParams) -> Result<()>;

    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Negative mean squared log error; higher is better
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(x)?;
        neg_mean_squared_log_error(y, &predictions)
    }

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}
