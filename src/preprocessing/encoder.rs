//! Categorical encoding of record-list and scalar columns

use super::config::RoleTarget;
use super::frequency::{
    aggregate, aggregate_role_candidates, name_frequencies, PERSON_ID_FIELD, ROLE_FIELD,
};
use super::name_simplifier::{simplify, DEFAULT_NOISE_TOKENS};
use super::record_parser::{parse, LiteralValue, RecordKey};
use super::text_cells;
use crate::error::{BoxOfficeError, Result};
use indexmap::{IndexMap, IndexSet};
use polars::prelude::*;
use std::fmt;
use tracing::debug;

/// Which half of the data an encode call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Training,
    Testing,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Testing => "testing",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The same column taken from the training and testing frames
#[derive(Debug, Clone, Default)]
pub struct SplitSeries {
    pub training: Option<Series>,
    pub testing: Option<Series>,
}

impl SplitSeries {
    pub fn new(training: Series, testing: Series) -> Self {
        Self {
            training: Some(training),
            testing: Some(testing),
        }
    }

    /// Only one split is available
    pub fn only(split: Split, series: Series) -> Self {
        match split {
            Split::Training => Self {
                training: Some(series),
                testing: None,
            },
            Split::Testing => Self {
                training: None,
                testing: Some(series),
            },
        }
    }

    pub fn get(&self, split: Split) -> Result<&Series> {
        let series = match split {
            Split::Training => self.training.as_ref(),
            Split::Testing => self.testing.as_ref(),
        };
        series.ok_or_else(|| BoxOfficeError::MissingSplit(split.to_string()))
    }

    /// Available series, training first
    pub fn present(&self) -> Vec<&Series> {
        self.training.iter().chain(self.testing.iter()).collect()
    }
}

/// Integer columns produced by one encode call, one entry per input row
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    n_rows: usize,
    columns: IndexMap<String, Vec<i32>>,
}

impl EncodedFrame {
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: IndexMap::new(),
        }
    }

    /// Add a zero-filled column; adding an existing column is a no-op
    pub fn add_column(&mut self, name: &str) {
        if !self.columns.contains_key(name) {
            self.columns.insert(name.to_string(), vec![0; self.n_rows]);
        }
    }

    pub fn set(&mut self, name: &str, row: usize, value: i32) -> Result<()> {
        *self.cell_mut(name, row)? = value;
        Ok(())
    }

    pub fn increment(&mut self, name: &str, row: usize) -> Result<()> {
        *self.cell_mut(name, row)? += 1;
        Ok(())
    }

    fn cell_mut(&mut self, name: &str, row: usize) -> Result<&mut i32> {
        let n_rows = self.n_rows;
        let values = self
            .columns
            .get_mut(name)
            .ok_or_else(|| BoxOfficeError::FeatureNotFound(name.to_string()))?;
        values.get_mut(row).ok_or_else(|| {
            BoxOfficeError::InvalidInput(format!("row {} out of range for {} rows", row, n_rows))
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&[i32]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Sum of one row across every column
    pub fn row_sum(&self, row: usize) -> i32 {
        self.columns
            .values()
            .filter_map(|values| values.get(row))
            .sum()
    }

    fn series(&self) -> impl Iterator<Item = Series> + '_ {
        self.columns
            .iter()
            .map(|(name, values)| Series::new(name.as_str().into(), values.as_slice()))
    }

    /// Append every encoded column to `frame`
    pub fn append_to(&self, frame: &mut DataFrame) -> Result<()> {
        if frame.height() != self.n_rows && frame.width() > 0 {
            return Err(BoxOfficeError::ShapeError {
                expected: format!("{} rows", frame.height()),
                actual: format!("{} rows", self.n_rows),
            });
        }
        for series in self.series() {
            frame.with_column(series)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PopularNames {
    simplified: bool,
    translation: Option<IndexMap<String, String>>,
    names: IndexSet<String>,
}

/// Encodes one column of the training and testing data.
///
/// Vocabularies are computed from every available split on first use and
/// reused afterwards, so both splits always get the same columns in the
/// same order.
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    source: SplitSeries,
    id_field: String,
    namespace: String,
    popularity_threshold: u64,
    noise_tokens: Vec<String>,
    roles: Vec<RoleTarget>,
    experience_threshold: u64,
    vocabulary: Option<IndexMap<RecordKey, String>>,
    item_vocabulary: Option<IndexSet<String>>,
    popular: Option<PopularNames>,
    role_candidates: Option<IndexMap<String, IndexSet<RecordKey>>>,
}

impl CategoricalEncoder {
    pub fn new(source: SplitSeries, namespace: &str) -> Self {
        Self {
            source,
            id_field: "id".to_string(),
            namespace: namespace.to_string(),
            popularity_threshold: 15,
            noise_tokens: DEFAULT_NOISE_TOKENS.iter().map(|t| t.to_string()).collect(),
            roles: vec![
                RoleTarget::new("Director", "director"),
                RoleTarget::new("Producer", "producer"),
            ],
            experience_threshold: 5,
            vocabulary: None,
            item_vocabulary: None,
            popular: None,
            role_candidates: None,
        }
    }

    pub fn with_id_field(mut self, id_field: &str) -> Self {
        self.id_field = id_field.to_string();
        self
    }

    pub fn with_popularity_threshold(mut self, threshold: u64) -> Self {
        self.popularity_threshold = threshold;
        self
    }

    pub fn with_noise_tokens(mut self, tokens: Vec<String>) -> Self {
        self.noise_tokens = tokens;
        self.popular = None;
        self
    }

    pub fn with_roles(mut self, roles: Vec<RoleTarget>, experience_threshold: u64) -> Self {
        self.roles = roles;
        self.experience_threshold = experience_threshold;
        self.role_candidates = None;
        self
    }

    /// Id to name pairs, once built by [`Self::encode_as_dict`]
    pub fn vocabulary(&self) -> Option<&IndexMap<RecordKey, String>> {
        self.vocabulary.as_ref()
    }

    fn column_name(&self, suffix: impl fmt::Display) -> String {
        format!("{}_{}", self.namespace, suffix)
    }

    fn missing_field(&self, field: &str) -> BoxOfficeError {
        BoxOfficeError::MissingField {
            column: self.column_label(),
            field: field.to_string(),
        }
    }

    fn column_label(&self) -> String {
        self.source
            .present()
            .first()
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| self.namespace.clone())
    }

    fn not_built(what: &str) -> BoxOfficeError {
        BoxOfficeError::EncodingError(format!("{} vocabulary was not built", what))
    }

    fn ensure_vocabulary(&mut self) -> Result<()> {
        if self.vocabulary.is_some() {
            return Ok(());
        }
        let mut vocabulary = IndexMap::new();
        for series in self.source.present() {
            for cell in text_cells(series)?.into_iter() {
                for record in parse(cell) {
                    let id = record
                        .key(&self.id_field)
                        .ok_or_else(|| self.missing_field(&self.id_field))?;
                    let name = record
                        .name_label()
                        .ok_or_else(|| self.missing_field("name"))?;
                    vocabulary.entry(id).or_insert_with(|| name.into_owned());
                }
            }
        }
        debug!(column = %self.column_label(), size = vocabulary.len(), "built id vocabulary");
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    /// One indicator column per record id seen in either split
    pub fn encode_as_dict(&mut self, split: Split) -> Result<EncodedFrame> {
        self.ensure_vocabulary()?;
        let vocabulary = self
            .vocabulary
            .as_ref()
            .ok_or_else(|| Self::not_built("id"))?;
        let series = self.source.get(split)?;

        let mut frame = EncodedFrame::new(series.len());
        let names: IndexMap<&RecordKey, String> = vocabulary
            .keys()
            .map(|id| (id, self.column_name(id)))
            .collect();
        for name in names.values() {
            frame.add_column(name);
        }

        for (row, cell) in text_cells(series)?.into_iter().enumerate() {
            for record in parse(cell) {
                let id = record
                    .key(&self.id_field)
                    .ok_or_else(|| self.missing_field(&self.id_field))?;
                let name = names
                    .get(&id)
                    .ok_or_else(|| BoxOfficeError::EncodingError(format!("unknown id {}", id)))?;
                frame.set(name, row, 1)?;
            }
        }
        Ok(frame)
    }

    fn ensure_popular(&mut self, simplify_names: bool) -> Result<()> {
        if matches!(&self.popular, Some(p) if p.simplified == simplify_names) {
            return Ok(());
        }
        let series = self.source.present();
        let translation = if simplify_names {
            let all_names = name_frequencies(&series, None)?;
            Some(simplify(all_names.keys(), &self.noise_tokens))
        } else {
            None
        };
        let names = aggregate(&series, translation.as_ref(), self.popularity_threshold)?;
        debug!(
            column = %self.column_label(),
            popular = names.len(),
            threshold = self.popularity_threshold,
            "built popular names"
        );
        self.popular = Some(PopularNames {
            simplified: simplify_names,
            translation,
            names,
        });
        Ok(())
    }

    /// Count records per popular name, everything else in `<ns>_other`
    pub fn encode_with_most_popular(
        &mut self,
        split: Split,
        simplify_names: bool,
    ) -> Result<EncodedFrame> {
        self.ensure_popular(simplify_names)?;
        let popular = self
            .popular
            .as_ref()
            .ok_or_else(|| Self::not_built("popular name"))?;
        let series = self.source.get(split)?;

        let mut frame = EncodedFrame::new(series.len());
        let other = self.column_name("other");
        frame.add_column(&other);
        let names: IndexMap<&str, String> = popular
            .names
            .iter()
            .map(|name| (name.as_str(), self.column_name(name)))
            .collect();
        for name in names.values() {
            frame.add_column(name);
        }

        for (row, cell) in text_cells(series)?.into_iter().enumerate() {
            for record in parse(cell) {
                let name = record
                    .name_label()
                    .ok_or_else(|| self.missing_field("name"))?;
                let name = popular
                    .translation
                    .as_ref()
                    .and_then(|table| table.get(&*name))
                    .map(String::as_str)
                    .unwrap_or(&name);
                let target = names.get(name).unwrap_or(&other);
                frame.increment(target, row)?;
            }
        }
        Ok(frame)
    }

    fn ensure_role_candidates(&mut self) -> Result<()> {
        if self.role_candidates.is_some() {
            return Ok(());
        }
        let roles: Vec<&str> = self.roles.iter().map(|r| r.role.as_str()).collect();
        let candidates = aggregate_role_candidates(
            &self.source.present(),
            &roles,
            self.experience_threshold,
        )?;
        for (role, ids) in &candidates {
            debug!(role = %role, candidates = ids.len(), "built role candidates");
        }
        self.role_candidates = Some(candidates);
        Ok(())
    }

    /// Flag experienced people per crew role; the rest go to `<alias>_other`
    pub fn encode_character_roles(&mut self, split: Split) -> Result<EncodedFrame> {
        self.ensure_role_candidates()?;
        let candidates = self
            .role_candidates
            .as_ref()
            .ok_or_else(|| Self::not_built("role"))?;
        let series = self.source.get(split)?;

        let mut frame = EncodedFrame::new(series.len());
        for target in &self.roles {
            frame.add_column(&format!("{}_other", target.alias));
        }
        for target in &self.roles {
            if let Some(ids) = candidates.get(&target.role) {
                for id in ids {
                    frame.add_column(&format!("{}_{}", target.alias, id));
                }
            }
        }

        for (row, cell) in text_cells(series)?.into_iter().enumerate() {
            for record in parse(cell) {
                let job = match record.get(ROLE_FIELD) {
                    Some(LiteralValue::Str(job)) => job,
                    Some(_) => continue,
                    None => return Err(self.missing_field(ROLE_FIELD)),
                };
                let Some(target) = self.roles.iter().find(|t| t.role == *job) else {
                    continue;
                };
                let id = record
                    .key(PERSON_ID_FIELD)
                    .ok_or_else(|| self.missing_field(PERSON_ID_FIELD))?;
                let experienced = candidates
                    .get(&target.role)
                    .is_some_and(|ids| ids.contains(&id));
                let column = if experienced {
                    format!("{}_{}", target.alias, id)
                } else {
                    format!("{}_other", target.alias)
                };
                frame.set(&column, row, 1)?;
            }
        }
        Ok(frame)
    }

    fn ensure_item_vocabulary<S: AsRef<str>>(&mut self, explicit: &[S]) -> Result<()> {
        if !explicit.is_empty() {
            self.item_vocabulary = Some(explicit.iter().map(|v| v.as_ref().to_string()).collect());
            return Ok(());
        }
        if self.item_vocabulary.is_some() {
            return Ok(());
        }
        let mut values = IndexSet::new();
        for series in self.source.present() {
            for value in text_cells(series)?.into_iter().flatten() {
                if !values.contains(value) {
                    values.insert(value.to_string());
                }
            }
        }
        debug!(column = %self.column_label(), size = values.len(), "built item vocabulary");
        self.item_vocabulary = Some(values);
        Ok(())
    }

    /// One-hot encode a scalar column.
    ///
    /// A non-empty `explicit_vocabulary` replaces any cached one. Values
    /// outside the vocabulary leave the whole row at zero.
    pub fn encode_as_item<S: AsRef<str>>(
        &mut self,
        split: Split,
        explicit_vocabulary: &[S],
    ) -> Result<EncodedFrame> {
        self.ensure_item_vocabulary(explicit_vocabulary)?;
        let vocabulary = self
            .item_vocabulary
            .as_ref()
            .ok_or_else(|| Self::not_built("item"))?;
        let series = self.source.get(split)?;

        let mut frame = EncodedFrame::new(series.len());
        let names: IndexMap<&str, String> = vocabulary
            .iter()
            .map(|value| (value.as_str(), self.column_name(value)))
            .collect();
        for name in names.values() {
            frame.add_column(name);
        }

        for (row, value) in text_cells(series)?.into_iter().enumerate() {
            if let Some(name) = value.and_then(|v| names.get(v)) {
                frame.set(name, row, 1)?;
            }
        }
        Ok(frame)
    }
}
