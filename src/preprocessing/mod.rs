//! Feature encoding for semi-structured movie metadata
//!
//! Turns columns holding serialized record lists (genres, companies, crew,
//! ...) and scalar categoricals into fixed-width numeric columns:
//! - Tolerant record-list parsing
//! - Name simplification and popularity counting
//! - Four categorical encoding strategies sharing one vocabulary per column
//! - Release-date decomposition
//! - A pipeline that encodes training and testing frames to identical schemas

mod config;
pub mod record_parser;
pub mod name_simplifier;
pub mod frequency;
mod encoder;
pub mod date_features;
mod pipeline;

pub use config::{
    DateFeatureConfig, DictColumn, ItemColumn, PipelineConfig, PopularColumn, RoleColumn,
    RoleTarget,
};
pub use record_parser::{parse, parse_cell, LiteralValue, ParsedCell, RecordKey, TaggedRecord};
pub use name_simplifier::{simplify, simplify_name, DEFAULT_NOISE_TOKENS};
pub use frequency::{aggregate, aggregate_role_candidates, name_frequencies};
pub use encoder::{CategoricalEncoder, EncodedFrame, Split, SplitSeries};
pub use date_features::DateFeatureExtractor;
pub use pipeline::{fill_missing_with_zero, TransformPipeline};

use crate::error::Result;
use polars::prelude::*;

/// View any series as nullable text cells.
///
/// Record-list columns are already strings; numeric or all-null columns are
/// cast so callers can treat every column the same way.
pub(crate) fn text_cells(series: &Series) -> Result<StringChunked> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted.str()?.clone())
}
