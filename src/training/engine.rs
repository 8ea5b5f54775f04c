//! Training engine: frames in, fitted forest and submission out

use super::config::TrainingConfig;
use super::cross_validation::{cross_val_score, CVResults, CrossValidator};
use super::random_forest::RandomForestRegressor;
use crate::error::{BoxOfficeError, Result};
use crate::optimizer::{GridSearch, RandomizedSearch, SearchResult};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
    feature_names: Vec<String>,
    model: Option<RandomForestRegressor>,
    /// Timing: seconds spent in last fit call
    training_time: Option<f64>,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            feature_names: Vec::new(),
            model: None,
            training_time: None,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Model inputs of a cleaned training frame, in frame order
    pub fn feature_columns(&self, df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| *name != self.config.label_column)
            .filter(|name| self.config.id_as_feature || *name != self.config.id_column)
            .collect()
    }

    /// Feature matrix and label vector of a cleaned training frame
    pub fn prepare_data(&self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>, Vec<String>)> {
        let feature_names = self.feature_columns(df);
        let x = columns_to_array2(df, &feature_names)?;
        let label = [self.config.label_column.clone()];
        let y = columns_to_array2(df, &label)?.column(0).to_owned();
        Ok((x, y, feature_names))
    }

    /// K-fold score of the configured forest
    pub fn cross_validate(&self, df: &DataFrame) -> Result<CVResults> {
        let (x, y, _) = self.prepare_data(df)?;
        let cv = CrossValidator::new(self.config.cv_folds);
        let results = cross_val_score(&self.config.forest.build(), &x, &y, &cv)?;
        info!(
            scores = ?results.scores,
            mean_score = results.mean_score,
            std_score = results.std_score,
            "cross-validation finished"
        );
        Ok(results)
    }

    pub fn grid_search(&self, df: &DataFrame, search: &GridSearch) -> Result<SearchResult> {
        let (x, y, _) = self.prepare_data(df)?;
        search.fit(&self.config.forest.build(), &x, &y)
    }

    pub fn random_search(&self, df: &DataFrame, search: &RandomizedSearch) -> Result<SearchResult> {
        let (x, y, _) = self.prepare_data(df)?;
        search.fit(&self.config.forest.build(), &x, &y)
    }

    /// Fit the forest on a cleaned training frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();
        let (x, y, feature_names) = self.prepare_data(df)?;

        let mut model = self.config.forest.build();
        model.fit(&x, &y)?;

        self.feature_names = feature_names;
        self.model = Some(model);
        let elapsed = start.elapsed().as_secs_f64();
        self.training_time = Some(elapsed);
        info!(
            samples = x.nrows(),
            features = x.ncols(),
            elapsed_secs = elapsed,
            "model trained"
        );
        Ok(self)
    }

    /// Predict a cleaned frame; it must hold every training feature
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or(BoxOfficeError::ModelNotFitted)?;
        let x = columns_to_array2(df, &self.feature_names)?;
        model.predict(&x)
    }

    /// Fit on `training`, predict `testing`, and pair predictions with ids
    pub fn produce_submission(
        &mut self,
        training: &DataFrame,
        testing: &DataFrame,
    ) -> Result<DataFrame> {
        self.fit(training)?;
        let predictions = self.predict(testing)?;

        let id_column = self.config.id_column.as_str();
        let ids = testing
            .column(id_column)
            .map_err(|_| BoxOfficeError::FeatureNotFound(id_column.to_string()))?
            .as_materialized_series()
            .cast(&DataType::Int64)?;
        let revenue = Series::new(
            self.config.label_column.as_str().into(),
            predictions.to_vec(),
        );
        Ok(DataFrame::new(vec![ids.into(), revenue.into()])?)
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn training_time(&self) -> Option<f64> {
        self.training_time
    }

    /// The `n` most important features, highest first
    pub fn top_features(&self, n: usize) -> Vec<(String, f64)> {
        let Some(importances) = self.model.as_ref().and_then(|m| m.feature_importances()) else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        ranked
    }
}

/// Stack named columns into a row-major matrix, nulls as zero
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| -> Result<Vec<f64>> {
            let series = df
                .column(col_name)
                .map_err(|_| BoxOfficeError::FeatureNotFound(col_name.clone()))?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let values: Vec<f64> = series
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}
