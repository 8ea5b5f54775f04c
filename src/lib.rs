//! Box-office revenue regression over semi-structured movie metadata
//!
//! This crate turns the movie CSV files into numeric feature frames and
//! trains a random-forest regressor on them:
//! - Tolerant parsing of Python-literal record cells
//! - Dictionary, most-popular, role and flat-value one-hot encodings
//! - Release-date features
//! - Random forests, k-fold cross-validation and hyperparameter search
//!
//! # Modules
//!
//! - [`preprocessing`] - Cell parsing, categorical encoders, the cleaning pipeline
//! - [`training`] - Regression trees, forests, cross-validation, metrics
//! - [`optimizer`] - Grid and randomized hyperparameter search
//! - [`utils`] - CSV loading and saving
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod optimizer;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{BoxOfficeError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{BoxOfficeError, Result};

    // Preprocessing
    pub use crate::preprocessing::{
        CategoricalEncoder, DateFeatureExtractor, EncodedFrame, PipelineConfig, Split,
        SplitSeries, TransformPipeline,
    };

    // Training
    pub use crate::training::{
        CrossValidator, Estimator, ForestConfig, RandomForestRegressor, TrainEngine,
        TrainingConfig,
    };

    // Optimization
    pub use crate::optimizer::{
        GridSearch, ParamSpace, ParameterValue, RandomizedSearch, SearchConfig,
    };

    // Utilities
    pub use crate::utils::{DataLoader, DataSaver};
}
