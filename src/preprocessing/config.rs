//! Pipeline configuration

use super::name_simplifier::DEFAULT_NOISE_TOKENS;
use crate::error::{BoxOfficeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A record-list column encoded with one indicator per record id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictColumn {
    pub column: String,
    pub id_field: String,
    pub namespace: String,
}

impl DictColumn {
    pub fn new(column: &str, id_field: &str, namespace: &str) -> Self {
        Self {
            column: column.to_string(),
            id_field: id_field.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

/// A record-list column encoded by counts over its most frequent names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularColumn {
    pub column: String,
    pub id_field: String,
    pub namespace: String,
    /// Strip boilerplate tokens from names before counting
    pub simplify: bool,
    /// Names must occur strictly more often than this
    pub popularity_threshold: u64,
}

impl PopularColumn {
    pub fn new(column: &str, namespace: &str, simplify: bool, popularity_threshold: u64) -> Self {
        Self {
            column: column.to_string(),
            id_field: "id".to_string(),
            namespace: namespace.to_string(),
            simplify,
            popularity_threshold,
        }
    }
}

/// A crew job to encode and the column prefix used for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTarget {
    pub role: String,
    pub alias: String,
}

impl RoleTarget {
    pub fn new(role: &str, alias: &str) -> Self {
        Self {
            role: role.to_string(),
            alias: alias.to_string(),
        }
    }
}

/// A crew column encoded by experienced people per role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleColumn {
    pub column: String,
    pub roles: Vec<RoleTarget>,
    pub experience_threshold: u64,
}

impl Default for RoleColumn {
    fn default() -> Self {
        Self {
            column: "crew".to_string(),
            roles: vec![
                RoleTarget::new("Director", "director"),
                RoleTarget::new("Producer", "producer"),
            ],
            experience_threshold: 5,
        }
    }
}

/// A scalar categorical column one-hot encoded by value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemColumn {
    pub column: String,
    pub namespace: String,
    /// Fixed vocabulary; empty means "every value seen in either split"
    #[serde(default)]
    pub vocabulary: Vec<String>,
}

impl ItemColumn {
    pub fn new(column: &str, namespace: &str) -> Self {
        Self {
            column: column.to_string(),
            namespace: namespace.to_string(),
            vocabulary: Vec::new(),
        }
    }
}

/// Release-date decomposition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFeatureConfig {
    pub column: String,
    pub year_column: String,
    pub month_prefix: String,
    pub weekday_prefix: String,
    /// Also emit an indicator for Monday (day 0)
    pub full_week: bool,
}

impl Default for DateFeatureConfig {
    fn default() -> Self {
        Self {
            column: "release_date".to_string(),
            year_column: "year".to_string(),
            month_prefix: "month".to_string(),
            weekday_prefix: "dayofweek".to_string(),
            full_week: false,
        }
    }
}

impl DateFeatureConfig {
    pub fn with_full_week(mut self, full_week: bool) -> Self {
        self.full_week = full_week;
        self
    }

    /// Month vocabulary, "1" through "12"
    pub fn month_vocabulary(&self) -> Vec<String> {
        (1..=12).map(|m| m.to_string()).collect()
    }

    /// Day-of-week vocabulary, Monday being "0"
    pub fn weekday_vocabulary(&self) -> Vec<String> {
        let first = if self.full_week { 0 } else { 1 };
        (first..=6).map(|d| d.to_string()).collect()
    }
}

/// Configuration for the whole cleaning pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dict_columns: Vec<DictColumn>,
    pub popular_columns: Vec<PopularColumn>,
    pub role_columns: Vec<RoleColumn>,
    pub item_columns: Vec<ItemColumn>,
    pub date: Option<DateFeatureConfig>,
    pub noise_tokens: Vec<String>,
    pub id_column: String,
    pub label_column: String,
    /// Columns read from the input files, label excluded
    pub feature_columns: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dict_columns: vec![
                DictColumn::new("belongs_to_collection", "id", "collection"),
                DictColumn::new("genres", "id", "genre"),
                DictColumn::new("production_countries", "iso_3166_1", "prod_count"),
                DictColumn::new("spoken_languages", "iso_639_1", "spoken_lang"),
            ],
            popular_columns: vec![
                PopularColumn::new("production_companies", "prod_comp", true, 15),
                PopularColumn::new("Keywords", "k", false, 25),
            ],
            role_columns: vec![RoleColumn::default()],
            item_columns: vec![ItemColumn::new("original_language", "")],
            date: Some(DateFeatureConfig::default()),
            noise_tokens: DEFAULT_NOISE_TOKENS.iter().map(|t| t.to_string()).collect(),
            id_column: "id".to_string(),
            label_column: "revenue".to_string(),
            feature_columns: [
                "id",
                "belongs_to_collection",
                "budget",
                "genres",
                "original_language",
                "popularity",
                "production_companies",
                "production_countries",
                "release_date",
                "runtime",
                "spoken_languages",
                "Keywords",
                "crew",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON; absent keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to replace the noise tokens
    pub fn with_noise_tokens(mut self, tokens: Vec<String>) -> Self {
        self.noise_tokens = tokens;
        self
    }

    /// Builder method to set or disable date extraction
    pub fn with_date(mut self, date: Option<DateFeatureConfig>) -> Self {
        self.date = date;
        self
    }

    /// Columns needed from the training file
    pub fn training_columns(&self) -> Vec<String> {
        let mut columns = self.feature_columns.clone();
        if !columns.contains(&self.label_column) {
            columns.push(self.label_column.clone());
        }
        columns
    }

    /// Every column consumed by an encoding step, in pipeline order
    pub fn encoded_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        columns.extend(self.dict_columns.iter().map(|c| c.column.as_str()));
        columns.extend(self.popular_columns.iter().map(|c| c.column.as_str()));
        columns.extend(self.role_columns.iter().map(|c| c.column.as_str()));
        columns.extend(self.item_columns.iter().map(|c| c.column.as_str()));
        if let Some(date) = &self.date {
            columns.push(date.column.as_str());
        }
        columns
    }

    /// Reject configurations that would encode one column twice
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in self.encoded_columns() {
            if !seen.insert(column) {
                return Err(BoxOfficeError::ConfigError(format!(
                    "column '{}' is encoded by more than one step",
                    column
                )));
            }
        }
        if self.encoded_columns().contains(&self.id_column.as_str()) {
            return Err(BoxOfficeError::ConfigError(format!(
                "id column '{}' cannot be encoded",
                self.id_column
            )));
        }
        for role_column in &self.role_columns {
            if role_column.roles.is_empty() {
                return Err(BoxOfficeError::ConfigError(format!(
                    "role column '{}' has no roles",
                    role_column.column
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.dict_columns.len(), 4);
        assert_eq!(config.popular_columns[0].popularity_threshold, 15);
        assert!(config.popular_columns[0].simplify);
        assert!(!config.popular_columns[1].simplify);
        assert_eq!(config.role_columns[0].experience_threshold, 5);
        assert_eq!(config.item_columns[0].namespace, "");
        assert_eq!(config.feature_columns.len(), 13);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_training_columns_add_label() {
        let config = PipelineConfig::default();
        let columns = config.training_columns();
        assert_eq!(columns.last().map(String::as_str), Some("revenue"));
        assert_eq!(columns.len(), 14);
    }

    #[test]
    fn test_weekday_vocabulary_skips_monday_by_default() {
        let date = DateFeatureConfig::default();
        assert_eq!(date.weekday_vocabulary().first().map(String::as_str), Some("1"));
        assert_eq!(date.weekday_vocabulary().len(), 6);
        let full = date.with_full_week(true);
        assert_eq!(full.weekday_vocabulary().len(), 7);
        assert_eq!(full.month_vocabulary().len(), 12);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut config = PipelineConfig::default();
        config.item_columns.push(ItemColumn::new("genres", "g"));
        assert!(matches!(config.validate(), Err(BoxOfficeError::ConfigError(_))));
    }

    #[test]
    fn test_json_overrides_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"label_column": "gross", "date": null}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.label_column, "gross");
        assert!(config.date.is_none());
        assert_eq!(config.dict_columns.len(), 4);
    }
}
