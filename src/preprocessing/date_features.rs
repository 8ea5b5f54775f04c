//! Release-date decomposition into year, month and weekday features

use super::config::DateFeatureConfig;
use super::encoder::{CategoricalEncoder, Split, SplitSeries};
use super::text_cells;
use crate::error::{BoxOfficeError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::debug;

/// Parse a release date.
///
/// Accepts ISO dates and US month/day/year dates. Two-digit years use
/// chrono's pivot: 70-99 map to the 1900s, 00-69 to the 2000s.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    // %Y would happily read "15" as the year 15
    let format = if parts[2].len() <= 2 {
        "%m/%d/%y"
    } else {
        "%m/%d/%Y"
    };
    NaiveDate::parse_from_str(raw, format).ok()
}

/// Replaces the date column with `year` plus month and weekday indicators
#[derive(Debug, Clone, Default)]
pub struct DateFeatureExtractor {
    config: DateFeatureConfig,
}

impl DateFeatureExtractor {
    pub fn new(config: DateFeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DateFeatureConfig {
        &self.config
    }

    /// Decompose the date column of one split.
    ///
    /// Null or blank dates give a null year and no indicator set. Any other
    /// value that does not parse is rejected.
    pub fn extract(&self, frame: &DataFrame, split: Split) -> Result<DataFrame> {
        let column = self.config.column.as_str();
        let series = frame
            .column(column)
            .map_err(|_| BoxOfficeError::FeatureNotFound(column.to_string()))?
            .as_materialized_series();

        let n_rows = series.len();
        let mut years: Vec<Option<i32>> = Vec::with_capacity(n_rows);
        let mut months: Vec<Option<i32>> = Vec::with_capacity(n_rows);
        let mut weekdays: Vec<Option<i32>> = Vec::with_capacity(n_rows);

        for cell in text_cells(series)?.into_iter() {
            match cell.map(str::trim).filter(|c| !c.is_empty()) {
                None => {
                    years.push(None);
                    months.push(None);
                    weekdays.push(None);
                }
                Some(text) => {
                    let date = parse_date(text).ok_or_else(|| {
                        BoxOfficeError::InvalidInput(format!(
                            "unrecognised date '{}' in column '{}'",
                            text, column
                        ))
                    })?;
                    years.push(Some(date.year()));
                    months.push(Some(date.month() as i32));
                    weekdays.push(Some(date.weekday().num_days_from_monday() as i32));
                }
            }
        }

        let mut out = frame.drop(column)?;
        out.with_column(Series::new(self.config.year_column.as_str().into(), years))?;

        let month = Series::new(self.config.month_prefix.as_str().into(), months);
        CategoricalEncoder::new(SplitSeries::only(split, month), &self.config.month_prefix)
            .encode_as_item(split, &self.config.month_vocabulary())?
            .append_to(&mut out)?;

        let weekday = Series::new(self.config.weekday_prefix.as_str().into(), weekdays);
        CategoricalEncoder::new(SplitSeries::only(split, weekday), &self.config.weekday_prefix)
            .encode_as_item(split, &self.config.weekday_vocabulary())?
            .append_to(&mut out)?;

        debug!(split = %split, rows = n_rows, "extracted date features");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_at(df: &DataFrame, column: &str, row: usize) -> Option<i32> {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .get(row)
    }

    #[test]
    fn test_parse_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 3, 10);
        assert_eq!(parse_date("2015-03-10"), expected);
        assert_eq!(parse_date("3/10/2015"), expected);
        assert_eq!(parse_date("3/10/15"), expected);
        assert_eq!(parse_date("2/20/95"), NaiveDate::from_ymd_opt(1995, 2, 20));
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("13/40/2015"), None);
    }

    #[test]
    fn test_extract_tuesday_in_march() {
        let df = df!(
            "id" => &[1i64, 2],
            "release_date" => &[Some("2015-03-10"), None]
        )
        .unwrap();
        let out = DateFeatureExtractor::default().extract(&df, Split::Training).unwrap();

        assert!(out.column("release_date").is_err());
        assert_eq!(int_at(&out, "year", 0), Some(2015));
        assert_eq!(int_at(&out, "year", 1), None);
        assert_eq!(int_at(&out, "month_3", 0), Some(1));
        assert_eq!(int_at(&out, "dayofweek_1", 0), Some(1));
        for m in (1..=12).filter(|m| *m != 3) {
            assert_eq!(int_at(&out, &format!("month_{}", m), 0), Some(0));
        }
        for m in 1..=12 {
            assert_eq!(int_at(&out, &format!("month_{}", m), 1), Some(0));
        }
        // id + year + 12 months + 6 weekdays
        assert_eq!(out.width(), 20);
    }

    #[test]
    fn test_monday_has_no_indicator() {
        let df = df!("release_date" => &["2015-03-09"]).unwrap();
        let out = DateFeatureExtractor::default().extract(&df, Split::Testing).unwrap();
        assert!(out.column("dayofweek_0").is_err());
        for d in 1..=6 {
            assert_eq!(int_at(&out, &format!("dayofweek_{}", d), 0), Some(0));
        }

        let full = DateFeatureExtractor::new(DateFeatureConfig::default().with_full_week(true));
        let out = full.extract(&df, Split::Testing).unwrap();
        assert_eq!(int_at(&out, "dayofweek_0", 0), Some(1));
    }

    #[test]
    fn test_unparseable_date_is_error() {
        let df = df!("release_date" => &["someday"]).unwrap();
        let err = DateFeatureExtractor::default().extract(&df, Split::Training).unwrap_err();
        assert!(matches!(err, BoxOfficeError::InvalidInput(_)));
    }

    #[test]
    fn test_missing_date_column() {
        let df = df!("id" => &[1i64]).unwrap();
        let err = DateFeatureExtractor::default().extract(&df, Split::Training).unwrap_err();
        assert!(matches!(err, BoxOfficeError::FeatureNotFound(_)));
    }
}
