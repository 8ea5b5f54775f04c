//! Regression metrics

use crate::error::{BoxOfficeError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for a set of regression predictions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R-squared
    pub r2: f64,
    /// Mean Squared Logarithmic Error
    pub msle: f64,
    /// Root Mean Squared Logarithmic Error, the competition metric
    pub rmsle: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        let msle = mean_squared_log_error(y_true, y_pred)?;

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            msle,
            rmsle: msle.sqrt(),
            n_samples: y_true.len(),
        })
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(BoxOfficeError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(BoxOfficeError::ValidationError(
            "cannot score an empty set of predictions".to_string(),
        ));
    }
    Ok(())
}

/// Mean of `(ln(1 + t) - ln(1 + p))^2`; negative values count as zero
pub fn mean_squared_log_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let total: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t.max(0.0).ln_1p() - p.max(0.0).ln_1p()).powi(2))
        .sum();
    Ok(total / y_true.len() as f64)
}

/// Score where higher is better, as used by model selection
pub fn neg_mean_squared_log_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(-mean_squared_log_error(y_true, y_pred)?)
}
