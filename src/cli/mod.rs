//! Command-line interface
//!
//! One subcommand per run mode: cross-validation of the default forest,
//! grid and randomized hyperparameter search, submission export, and a
//! dry run that prints the encoded frames.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::optimizer::{
    default_grid_space, default_random_space, format_params, GridSearch, RandomizedSearch,
    SearchConfig, SearchResult,
};
use crate::preprocessing::{PipelineConfig, TransformPipeline};
use crate::training::{ForestConfig, TrainEngine, TrainingConfig};
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "boxoffice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Encode movie metadata and predict box-office revenue")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Input files shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Training CSV (must hold the label column)
    #[arg(long, env = "BOXOFFICE_TRAIN", default_value = "data/train.csv")]
    pub train: PathBuf,

    /// Testing CSV
    #[arg(long, env = "BOXOFFICE_TEST", default_value = "data/test.csv")]
    pub test: PathBuf,

    /// JSON file overriding the encoding configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// K-fold score of the default forest
    CrossValidate {
        #[command(flatten)]
        data: DataArgs,

        /// Number of folds
        #[arg(long, default_value = "5")]
        folds: usize,

        /// Trees in the forest
        #[arg(long, default_value = "25")]
        n_estimators: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Exhaustive search over the forest grid
    GridSearch {
        #[command(flatten)]
        data: DataArgs,

        /// Number of folds per candidate
        #[arg(long, default_value = "3")]
        folds: usize,
    },

    /// Randomized search over the forest distributions
    RandomSearch {
        #[command(flatten)]
        data: DataArgs,

        /// Number of folds per candidate
        #[arg(long, default_value = "3")]
        folds: usize,

        /// Candidates to sample
        #[arg(long, default_value = "15")]
        n_iter: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Fit on the training file and write predictions for the testing file
    Submit {
        #[command(flatten)]
        data: DataArgs,

        /// Output CSV
        #[arg(short, long, env = "BOXOFFICE_OUTPUT", default_value = "data/result.csv")]
        output: PathBuf,

        /// Trees in the forest
        #[arg(long, default_value = "25")]
        n_estimators: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Print the shape and columns of the encoded frames
    Inspect {
        #[command(flatten)]
        data: DataArgs,

        /// Column names to list
        #[arg(long, default_value = "30")]
        limit: usize,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

fn pipeline_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Load both files and run the encoding pipeline over them
pub fn load_and_clean(args: &DataArgs) -> anyhow::Result<(DataFrame, DataFrame, PipelineConfig)> {
    let config = pipeline_config(args.config.as_deref())?;
    let loader = DataLoader::new();

    step_run("Loading data");
    let start = Instant::now();
    let training = loader
        .load_columns(&args.train, &config.training_columns())
        .with_context(|| format!("failed to load {}", args.train.display()))?;
    let testing = loader
        .load_columns(&args.test, &config.feature_columns)
        .with_context(|| format!("failed to load {}", args.test.display()))?;
    step_done(&format!(
        "{} + {} rows in {:?}",
        training.height(),
        testing.height(),
        start.elapsed()
    ));

    step_run("Encoding");
    let mut pipeline = TransformPipeline::new(config.clone());
    let (training, testing) = pipeline
        .clean(&training, &testing)
        .context("failed to encode input files")?;
    step_done(&format!(
        "{} features in {:.2}s",
        testing.width(),
        pipeline.clean_time().unwrap_or_default()
    ));

    Ok((training, testing, config))
}

fn training_config(pipeline: &PipelineConfig, forest: ForestConfig) -> TrainingConfig {
    let mut config = TrainingConfig::default().with_forest(forest);
    config.label_column = pipeline.label_column.clone();
    config.id_column = pipeline.id_column.clone();
    config
}

fn print_search(result: &SearchResult) {
    println!();
    kv("Candidates", &result.trials.len().to_string());
    kv("Best score", &format!("{:.6}", result.best_score));
    kv("Best params", &format_params(&result.best_params));
    println!();
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_cross_validate(
    data: &DataArgs,
    folds: usize,
    n_estimators: usize,
    seed: u64,
) -> anyhow::Result<()> {
    section("Cross-validate");
    let (training, _, pipeline) = load_and_clean(data)?;

    let forest = ForestConfig::default()
        .with_n_estimators(n_estimators)
        .with_random_state(Some(seed));
    let engine = TrainEngine::new(training_config(&pipeline, forest).with_cv_folds(folds));

    step_run(&format!("Scoring {} folds", folds));
    let start = Instant::now();
    let results = engine.cross_validate(&training)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    let scores: Vec<String> = results.scores.iter().map(|s| format!("{:.4}", s)).collect();
    kv("Scores", &scores.join(", "));
    kv("Mean", &format!("{:.6}", results.mean_score));
    kv("Std", &format!("{:.6}", results.std_score));
    println!();
    Ok(())
}

pub fn cmd_grid_search(data: &DataArgs, folds: usize) -> anyhow::Result<()> {
    section("Grid search");
    let (training, _, pipeline) = load_and_clean(data)?;
    let engine = TrainEngine::new(training_config(&pipeline, ForestConfig::default()));

    let search = GridSearch::new(default_grid_space())
        .with_config(SearchConfig::default().with_cv_folds(folds));
    step_run(&format!("Searching {} candidates", search.space().grid_size()));
    let start = Instant::now();
    let result = engine.grid_search(&training, &search)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_search(&result);
    Ok(())
}

pub fn cmd_random_search(
    data: &DataArgs,
    folds: usize,
    n_iter: usize,
    seed: u64,
) -> anyhow::Result<()> {
    section("Randomized search");
    let (training, _, pipeline) = load_and_clean(data)?;
    let engine = TrainEngine::new(training_config(&pipeline, ForestConfig::default()));

    let config = SearchConfig::default()
        .with_cv_folds(folds)
        .with_n_iter(n_iter)
        .with_random_state(seed);
    let search = RandomizedSearch::new(default_random_space()).with_config(config);
    step_run(&format!("Searching {} candidates", n_iter));
    let start = Instant::now();
    let result = engine.random_search(&training, &search)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_search(&result);
    Ok(())
}

pub fn cmd_submit(
    data: &DataArgs,
    output: &Path,
    n_estimators: usize,
    seed: u64,
) -> anyhow::Result<()> {
    section("Submit");
    let (training, testing, pipeline) = load_and_clean(data)?;

    let forest = ForestConfig::default()
        .with_n_estimators(n_estimators)
        .with_random_state(Some(seed));
    let mut engine = TrainEngine::new(training_config(&pipeline, forest));

    step_run(&format!("Training {} trees", n_estimators));
    let mut submission = engine.produce_submission(&training, &testing)?;
    step_done(&format!("{:.2}s", engine.training_time().unwrap_or_default()));

    step_run(&format!("Saving → {}", output.display()));
    DataSaver::save_csv(&mut submission, output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    step_done(&format!("{} rows", submission.height()));

    println!();
    for (name, importance) in engine.top_features(5) {
        kv(&name, &format!("{:.4}", importance));
    }
    println!();
    Ok(())
}

pub fn cmd_inspect(data: &DataArgs, limit: usize) -> anyhow::Result<()> {
    section("Inspect");
    let (training, testing, _) = load_and_clean(data)?;

    println!();
    kv("Training", &format!("{} rows × {} cols", training.height(), training.width()));
    kv("Testing", &format!("{} rows × {} cols", testing.height(), testing.width()));

    let names = training.get_column_names();
    println!();
    for name in names.iter().take(limit) {
        println!("  {} {}", dim("·"), name);
    }
    if names.len() > limit {
        println!("  {}", muted(&format!("… {} more", names.len() - limit)));
    }
    println!();
    Ok(())
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::CrossValidate { data, folds, n_estimators, seed } => {
            cmd_cross_validate(&data, folds, n_estimators, seed)
        }
        Commands::GridSearch { data, folds } => cmd_grid_search(&data, folds),
        Commands::RandomSearch { data, folds, n_iter, seed } => {
            cmd_random_search(&data, folds, n_iter, seed)
        }
        Commands::Submit { data, output, n_estimators, seed } => {
            cmd_submit(&data, &output, n_estimators, seed)
        }
        Commands::Inspect { data, limit } => cmd_inspect(&data, limit),
    }
}
