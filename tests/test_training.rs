//! Integration test: forest training, cross-validation and search

use boxoffice::optimizer::{
    default_grid_space, GridSearch, ParamSpace, ParameterValue, RandomizedSearch, SearchConfig,
};
use boxoffice::training::{
    cross_val_score, mean_squared_log_error, CrossValidator, Estimator, MaxFeatures,
    RandomForestRegressor, RegressionMetrics, TrainEngine, TrainingConfig,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;

fn regression_data(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
        0 => i as f64,
        1 => (i % 4) as f64,
        _ => ((i * 7) % 11) as f64,
    });
    let y = Array1::from_shape_fn(n, |i| 1000.0 + 250.0 * i as f64);
    (x, y)
}

fn regression_df() -> DataFrame {
    let n = 30;
    df!(
        "id" => (1..=n).map(|i| i as f64).collect::<Vec<_>>(),
        "budget" => (1..=n).map(|i| i as f64 * 1.0e6).collect::<Vec<_>>(),
        "genre_35" => (1..=n).map(|i| (i % 2) as f64).collect::<Vec<_>>(),
        "revenue" => (1..=n).map(|i| i as f64 * 4.0e6).collect::<Vec<_>>()
    )
    .unwrap()
}

#[test]
fn test_forest_fits_monotone_target() {
    let (x, y) = regression_data(60);
    let mut forest = RandomForestRegressor::new(20).with_random_state(3);
    forest.fit(&x, &y).unwrap();
    assert_eq!(forest.n_trees(), 20);

    let predictions = forest.predict(&x).unwrap();
    let metrics = RegressionMetrics::compute(&y, &predictions).unwrap();
    assert!(metrics.r2 > 0.9, "r2 = {}", metrics.r2);
    assert!(metrics.msle < 0.05);

    let importances = forest.feature_importances().unwrap();
    assert!((importances.sum() - 1.0).abs() < 1e-9);
    assert!(importances[0] > importances[1]);
}

#[test]
fn test_configure_from_search_parameters() {
    let mut forest = RandomForestRegressor::new(10);
    let params = [
        ("n_estimators".to_string(), ParameterValue::Int(4)),
        ("max_depth".to_string(), ParameterValue::None),
        ("max_features".to_string(), ParameterValue::from("sqrt")),
        ("bootstrap".to_string(), ParameterValue::Bool(false)),
    ]
    .into_iter()
    .collect();
    forest.configure(&params).unwrap();

    let (x, y) = regression_data(20);
    Estimator::fit(&mut forest, &x, &y).unwrap();
    assert_eq!(forest.n_trees(), 4);

    let unknown = [("learning_rate".to_string(), ParameterValue::Float(0.1))]
        .into_iter()
        .collect();
    assert!(forest.configure(&unknown).is_err());
}

#[test]
fn test_max_features_resolution() {
    assert_eq!(MaxFeatures::All.resolve(16), 16);
    assert_eq!(MaxFeatures::Sqrt.resolve(16), 4);
    assert_eq!(MaxFeatures::Log2.resolve(16), 4);
    assert_eq!(MaxFeatures::Fixed(3).resolve(2), 2);
}

#[test]
fn test_kfold_covers_every_sample_once() {
    for cv in [CrossValidator::new(4), CrossValidator::new(3).with_shuffle(11)] {
        let splits = cv.split(22).unwrap();
        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..22).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 22);
            assert!(split.test_indices.iter().all(|i| !split.train_indices.contains(i)));
        }
    }
}

#[test]
fn test_cross_val_score_is_negative_msle() {
    let (x, y) = regression_data(30);
    let forest = RandomForestRegressor::new(5).with_random_state(1);
    let results = cross_val_score(&forest, &x, &y, &CrossValidator::new(3)).unwrap();
    assert_eq!(results.scores.len(), 3);
    assert!(results.scores.iter().all(|s| *s <= 0.0));
    assert!(!forest.is_fitted());
}

#[test]
fn test_msle_clamps_negative_predictions() {
    let y_true = Array1::from(vec![0.0, 10.0]);
    let y_pred = Array1::from(vec![-5.0, 10.0]);
    assert_eq!(mean_squared_log_error(&y_true, &y_pred).unwrap(), 0.0);
}

#[test]
fn test_grid_search_evaluates_cartesian_product() {
    let (x, y) = regression_data(24);
    let space = ParamSpace::new()
        .choices("n_estimators", [3i64, 5])
        .choices("max_depth", [2i64, 4, 8])
        .choices("min_samples_leaf", [1i64]);
    let search = GridSearch::new(space).with_config(SearchConfig::default().with_n_jobs(1));

    let result = search
        .fit(&RandomForestRegressor::new(3).with_random_state(0), &x, &y)
        .unwrap();
    assert_eq!(result.trials.len(), 6);
    let best = result
        .trials
        .iter()
        .map(|t| t.cv.mean_score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(result.best_score, best);
    assert_eq!(result.best_params.len(), 3);
}

#[test]
fn test_randomized_search_is_seeded() {
    let space = default_grid_space();
    let config = SearchConfig::default().with_n_iter(6).with_random_state(42);
    let first = RandomizedSearch::new(space.clone()).with_config(config.clone());
    let second = RandomizedSearch::new(space).with_config(config);

    let a = first.candidates().unwrap();
    let b = second.candidates().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 6);
    for (i, params) in a.iter().enumerate() {
        assert!(a[i + 1..].iter().all(|other| other != params), "duplicate candidate");
    }
}

#[test]
fn test_engine_searches_frames() {
    let engine = TrainEngine::new(TrainingConfig::default());
    let df = regression_df();

    let space = ParamSpace::new()
        .choices("n_estimators", [4i64])
        .choices("max_depth", [ParameterValue::Int(3), ParameterValue::None]);
    let search = RandomizedSearch::new(space)
        .with_config(SearchConfig::default().with_n_iter(2).with_cv_folds(3));
    let result = engine.random_search(&df, &search).unwrap();
    assert_eq!(result.trials.len(), 2);
    assert!(result.best_score <= 0.0);
}
