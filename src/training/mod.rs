//! Model training module
//!
//! Provides the revenue regressor and the tooling around it:
//! - Regression trees and random forests
//! - K-fold cross-validation
//! - Regression metrics, including squared log error
//! - A training engine working on cleaned frames

mod config;
mod engine;
mod estimator;
pub mod cross_validation;
pub mod decision_tree;
pub mod metrics;
pub mod random_forest;

pub use config::{ForestConfig, TrainingConfig};
pub use engine::{columns_to_array2, TrainEngine};
pub use estimator::Estimator;
pub use cross_validation::{cross_val_score, CVResults, CVSplit, CrossValidator};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use metrics::{mean_squared_log_error, neg_mean_squared_log_error, RegressionMetrics};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
