//! Training/testing cleaning pipeline

use super::config::PipelineConfig;
use super::date_features::DateFeatureExtractor;
use super::encoder::{CategoricalEncoder, EncodedFrame, Split, SplitSeries};
use crate::error::{BoxOfficeError, Result};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Encodes a training and a testing frame into numeric frames with the same
/// feature columns
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    config: PipelineConfig,
    /// Timing: seconds spent in last clean call
    clean_time: Option<f64>,
}

impl TransformPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            clean_time: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn clean_time(&self) -> Option<f64> {
        self.clean_time
    }

    fn split_source(
        training: &DataFrame,
        testing: &DataFrame,
        column: &str,
    ) -> Result<SplitSeries> {
        let take = |frame: &DataFrame| -> Result<Series> {
            Ok(frame
                .column(column)
                .map_err(|_| BoxOfficeError::FeatureNotFound(column.to_string()))?
                .as_materialized_series()
                .clone())
        };
        Ok(SplitSeries::new(take(training)?, take(testing)?))
    }

    /// Run every encoding step, then fill what is left with zeros.
    ///
    /// Vocabularies come from both frames together. Neither input is
    /// modified.
    pub fn clean(
        &mut self,
        training: &DataFrame,
        testing: &DataFrame,
    ) -> Result<(DataFrame, DataFrame)> {
        let start = Instant::now();
        self.config.validate()?;

        let mut training = training.clone();
        let mut testing = testing.clone();
        info!(
            training_rows = training.height(),
            testing_rows = testing.height(),
            "cleaning data"
        );

        for spec in &self.config.dict_columns {
            let source = Self::split_source(&training, &testing, &spec.column)?;
            let mut encoder =
                CategoricalEncoder::new(source, &spec.namespace).with_id_field(&spec.id_field);
            replace_column(&mut training, &mut testing, &spec.column, |split| {
                encoder.encode_as_dict(split)
            })?;
        }

        for spec in &self.config.popular_columns {
            let source = Self::split_source(&training, &testing, &spec.column)?;
            let mut encoder = CategoricalEncoder::new(source, &spec.namespace)
                .with_id_field(&spec.id_field)
                .with_popularity_threshold(spec.popularity_threshold)
                .with_noise_tokens(self.config.noise_tokens.clone());
            replace_column(&mut training, &mut testing, &spec.column, |split| {
                encoder.encode_with_most_popular(split, spec.simplify)
            })?;
        }

        for spec in &self.config.role_columns {
            let source = Self::split_source(&training, &testing, &spec.column)?;
            let mut encoder = CategoricalEncoder::new(source, &spec.column)
                .with_roles(spec.roles.clone(), spec.experience_threshold);
            replace_column(&mut training, &mut testing, &spec.column, |split| {
                encoder.encode_character_roles(split)
            })?;
        }

        for spec in &self.config.item_columns {
            let source = Self::split_source(&training, &testing, &spec.column)?;
            let mut encoder = CategoricalEncoder::new(source, &spec.namespace);
            replace_column(&mut training, &mut testing, &spec.column, |split| {
                encoder.encode_as_item(split, &spec.vocabulary)
            })?;
        }

        if let Some(date) = &self.config.date {
            let extractor = DateFeatureExtractor::new(date.clone());
            training = extractor.extract(&training, Split::Training)?;
            testing = extractor.extract(&testing, Split::Testing)?;
        }

        let training = fill_missing_with_zero(&training)?;
        let testing = fill_missing_with_zero(&testing)?;
        check_aligned(&training, &testing, &self.config.label_column)?;

        let elapsed = start.elapsed().as_secs_f64();
        self.clean_time = Some(elapsed);
        info!(
            columns = testing.width(),
            elapsed_secs = elapsed,
            "cleaning finished"
        );
        Ok((training, testing))
    }
}

/// Swap `column` for the encoder's output in both frames
fn replace_column<F>(
    training: &mut DataFrame,
    testing: &mut DataFrame,
    column: &str,
    mut encode: F,
) -> Result<()>
where
    F: FnMut(Split) -> Result<EncodedFrame>,
{
    let encoded_training = encode(Split::Training)?;
    let encoded_testing = encode(Split::Testing)?;

    *training = training.drop(column)?;
    *testing = testing.drop(column)?;
    encoded_training.append_to(training)?;
    encoded_testing.append_to(testing)?;

    debug!(column, added = encoded_training.n_columns(), "encoded column");
    Ok(())
}

/// Replace nulls and NaN with zero and cast every column to Float64.
///
/// Text columns that survived encoding cannot be converted and are
/// reported as a data error.
pub fn fill_missing_with_zero(frame: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(frame.width());
    for column in frame.get_columns() {
        let series = column.as_materialized_series();
        if matches!(series.dtype(), DataType::String) {
            return Err(BoxOfficeError::DataError(format!(
                "column '{}' is still text after encoding",
                series.name()
            )));
        }
        let values = series.cast(&DataType::Float64)?;
        let filled: Float64Chunked = values
            .f64()?
            .into_iter()
            .map(|v| Some(v.filter(|x| !x.is_nan()).unwrap_or(0.0)))
            .collect();
        columns.push(filled.with_name(series.name().clone()).into_series().into());
    }
    Ok(DataFrame::new(columns)?)
}

fn check_aligned(training: &DataFrame, testing: &DataFrame, label: &str) -> Result<()> {
    let training_names: Vec<&str> = training
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .filter(|n| *n != label)
        .collect();
    let testing_names: Vec<&str> = testing
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .filter(|n| *n != label)
        .collect();
    if training_names != testing_names {
        return Err(BoxOfficeError::EncodingError(format!(
            "training and testing features differ ({} vs {} columns)",
            training_names.len(),
            testing_names.len()
        )));
    }
    Ok(())
}
