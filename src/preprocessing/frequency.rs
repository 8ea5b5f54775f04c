//! Popularity counting across record-list columns

use super::record_parser::{parse, LiteralValue, RecordKey};
use super::text_cells;
use crate::error::{BoxOfficeError, Result};
use indexmap::{IndexMap, IndexSet};
use polars::prelude::*;

/// Field holding a crew member's job
pub const ROLE_FIELD: &str = "job";

/// Field holding a person's id
pub const PERSON_ID_FIELD: &str = "id";

/// Cumulative name frequencies over several series.
///
/// Counting is cell level: identical raw cells are counted once per series
/// with their multiplicity, and that multiplicity is attributed to every
/// record name inside the cell. Names go through `name_translation` when it
/// is given; a name absent from the table is counted under itself.
pub fn name_frequencies(
    series_list: &[&Series],
    name_translation: Option<&IndexMap<String, String>>,
) -> Result<IndexMap<String, u64>> {
    let mut frequencies: IndexMap<String, u64> = IndexMap::new();

    for series in series_list {
        let cells = text_cells(series)?;

        let mut cell_counts: IndexMap<&str, u64> = IndexMap::new();
        for cell in cells.into_iter().flatten() {
            *cell_counts.entry(cell).or_insert(0) += 1;
        }

        for (cell, count) in cell_counts {
            for record in parse(Some(cell)) {
                let name = record.name_label().ok_or_else(|| BoxOfficeError::MissingField {
                    column: series.name().to_string(),
                    field: "name".to_string(),
                })?;
                let name = name_translation
                    .and_then(|table| table.get(&*name))
                    .map(String::as_str)
                    .unwrap_or(&name);
                *frequencies.entry(name.to_string()).or_insert(0) += count;
            }
        }
    }

    Ok(frequencies)
}

/// Names whose cumulative frequency is strictly above `popularity_threshold`
pub fn aggregate(
    series_list: &[&Series],
    name_translation: Option<&IndexMap<String, String>>,
    popularity_threshold: u64,
) -> Result<IndexSet<String>> {
    let frequencies = name_frequencies(series_list, name_translation)?;
    Ok(frequencies
        .into_iter()
        .filter(|(_, frequency)| *frequency > popularity_threshold)
        .map(|(name, _)| name)
        .collect())
}

/// Per-role ids that occur more than `experience_threshold` times.
///
/// Every record whose job equals one of `target_roles` adds one to its
/// (role, id) counter, so a person listed twice for the same job in one cell
/// counts twice. Malformed cells contribute nothing. Every target role is
/// present in the result, possibly with an empty set.
pub fn aggregate_role_candidates<R: AsRef<str>>(
    series_list: &[&Series],
    target_roles: &[R],
    experience_threshold: u64,
) -> Result<IndexMap<String, IndexSet<RecordKey>>> {
    let mut counters: IndexMap<String, IndexMap<RecordKey, u64>> = target_roles
        .iter()
        .map(|role| (role.as_ref().to_string(), IndexMap::new()))
        .collect();

    for series in series_list {
        let column = series.name().to_string();
        let cells = text_cells(series)?;

        for cell in cells.into_iter() {
            for record in parse(cell) {
                let job = match record.get(ROLE_FIELD) {
                    Some(LiteralValue::Str(job)) => job,
                    Some(_) => continue,
                    None => {
                        return Err(BoxOfficeError::MissingField {
                            column: column.clone(),
                            field: ROLE_FIELD.to_string(),
                        })
                    }
                };
                let Some(counter) = counters.get_mut(job) else {
                    continue;
                };
                let id = record.key(PERSON_ID_FIELD).ok_or_else(|| BoxOfficeError::MissingField {
                    column: column.clone(),
                    field: PERSON_ID_FIELD.to_string(),
                })?;
                *counter.entry(id).or_insert(0) += 1;
            }
        }
    }

    Ok(counters
        .into_iter()
        .map(|(role, counter)| {
            let qualifying = counter
                .into_iter()
                .filter(|(_, count)| *count > experience_threshold)
                .map(|(id, _)| id)
                .collect();
            (role, qualifying)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn companies(name: &str, cells: &[Option<&str>]) -> Series {
        Series::new(name.into(), cells)
    }

    #[test]
    fn test_cell_level_frequency() {
        let a = "[{'id': 1, 'name': 'Universal Pictures'}]";
        let b = "[{'id': 1, 'name': 'Universal Pictures'}, {'id': 2, 'name': 'Pixar'}]";
        let training = companies("production_companies", &[Some(a), Some(a), Some(b), None]);
        let testing = companies("production_companies", &[Some(b)]);

        let freq = name_frequencies(&[&training, &testing], None).unwrap();
        assert_eq!(freq["Universal Pictures"], 4);
        assert_eq!(freq["Pixar"], 2);
    }

    #[test]
    fn test_threshold_is_strict() {
        let a = "[{'id': 1, 'name': 'Universal'}]";
        let b = "[{'id': 2, 'name': 'Pixar'}]";
        let s = companies("c", &[Some(a), Some(a), Some(a), Some(b), Some(b)]);

        let popular = aggregate(&[&s], None, 2).unwrap();
        assert!(popular.contains("Universal"));
        assert!(!popular.contains("Pixar"));

        let everything = aggregate(&[&s], None, 0).unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn test_translation_merges_spellings() {
        let a = "[{'id': 1, 'name': 'Universal Pictures'}]";
        let b = "[{'id': 3, 'name': 'Universal'}]";
        let s = companies("c", &[Some(a), Some(b)]);
        let mut table = IndexMap::new();
        table.insert("Universal Pictures".to_string(), "Universal".to_string());
        table.insert("Universal".to_string(), "Universal".to_string());

        let popular = aggregate(&[&s], Some(&table), 1).unwrap();
        assert_eq!(popular.into_iter().collect::<Vec<_>>(), vec!["Universal".to_string()]);
    }

    #[test]
    fn test_malformed_cells_are_ignored() {
        let s = companies("c", &[Some("not a list"), Some("[{'id': 1, 'name': 'A'}]")]);
        let freq = name_frequencies(&[&s], None).unwrap();
        assert_eq!(freq.len(), 1);
    }

    #[test]
    fn test_missing_name_is_structural_error() {
        let s = companies("Keywords", &[Some("[{'id': 1}]")]);
        let err = aggregate(&[&s], None, 0).unwrap_err();
        assert!(matches!(err, BoxOfficeError::MissingField { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_null_name_is_counted_as_none() {
        let cell = "[{'id': 7, 'name': None}, {'id': 8, 'name': 'Pixar'}]";
        let s = companies("production_companies", &[Some(cell), Some(cell)]);
        let freq = name_frequencies(&[&s], None).unwrap();
        assert_eq!(freq["None"], 2);
        assert_eq!(freq["Pixar"], 2);
    }

    #[test]
    fn test_role_candidates_count_every_occurrence() {
        let director_twice = "[{'id': 7, 'name': 'X', 'job': 'Director'}, \
                              {'id': 7, 'name': 'X', 'job': 'Director'}, \
                              {'id': 9, 'name': 'Y', 'job': 'Editor'}]";
        let cells: Vec<Option<&str>> = vec![Some(director_twice); 3];
        let s = companies("crew", &cells);

        let candidates = aggregate_role_candidates(&[&s], &["Director", "Producer"], 5).unwrap();
        assert!(candidates["Director"].contains(&RecordKey::Int(7)));
        assert!(candidates["Producer"].is_empty());
    }

    #[test]
    fn test_role_candidates_threshold_is_strict() {
        let cell = "[{'id': 7, 'name': 'X', 'job': 'Producer'}]";
        let cells: Vec<Option<&str>> = vec![Some(cell); 5];
        let s = companies("crew", &cells);

        let candidates = aggregate_role_candidates(&[&s], &["Producer"], 5).unwrap();
        assert!(candidates["Producer"].is_empty());
    }

    #[test]
    fn test_role_candidates_skip_malformed_cells() {
        let s = companies("crew", &[Some("[{'id': 7, 'job': "), None]);
        let candidates = aggregate_role_candidates(&[&s], &["Director"], 0).unwrap();
        assert!(candidates["Director"].is_empty());
    }

    #[test]
    fn test_role_record_without_job_is_error() {
        let s = companies("crew", &[Some("[{'id': 7, 'name': 'X'}]")]);
        assert!(aggregate_role_candidates(&[&s], &["Director"], 0).is_err());
    }

    #[test]
    fn test_role_record_with_null_job_is_skipped() {
        let cell = "[{'id': 7, 'name': 'X', 'job': None}, \
                    {'id': 8, 'name': 'Y', 'job': 'Director'}]";
        let s = companies("crew", &[Some(cell), Some(cell)]);
        let candidates = aggregate_role_candidates(&[&s], &["Director"], 1).unwrap();
        let directors: Vec<&RecordKey> = candidates["Director"].iter().collect();
        assert_eq!(directors, vec![&RecordKey::Int(8)]);
    }

    proptest! {
        #[test]
        fn prop_threshold_partitions_names(
            picks in proptest::collection::vec(0usize..6, 0..40),
            threshold in 0u64..8,
        ) {
            let names = ["A", "B", "C", "D", "E", "F"];
            let cells: Vec<String> = picks
                .iter()
                .map(|&i| format!("[{{'id': {}, 'name': '{}'}}]", i, names[i]))
                .collect();
            let refs: Vec<Option<&str>> = cells.iter().map(|c| Some(c.as_str())).collect();
            let s = companies("c", &refs);

            let freq = name_frequencies(&[&s], None).unwrap();
            let popular = aggregate(&[&s], None, threshold).unwrap();
            for (name, count) in &freq {
                prop_assert_eq!(popular.contains(name), *count > threshold);
            }
        }
    }
}
