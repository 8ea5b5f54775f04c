//! Hyperparameter search
//!
//! Discrete parameter spaces explored exhaustively (grid search) or by
//! sampling distinct grid points (randomized search), each candidate scored
//! by k-fold cross-validation.

mod config;
mod search_space;
mod search;

pub use config::SearchConfig;
pub use search_space::{format_params, int_linspace, ParamSpace, ParameterValue, TrialParams};
pub use search::{
    default_grid_space, default_random_space, GridSearch, RandomizedSearch, SearchResult, Trial,
};
