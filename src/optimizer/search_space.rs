//! Discrete hyperparameter spaces

use crate::error::{BoxOfficeError, Result};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Explicitly unset, e.g. unlimited depth
    None,
}

impl ParameterValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integer view
    pub fn as_usize(&self) -> Option<usize> {
        self.as_int().and_then(|v| usize::try_from(v).ok())
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParameterValue::None)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "'{}'", v),
            ParameterValue::None => f.write_str("None"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ParameterValue::None)
    }
}

/// One candidate configuration, keyed by parameter name
pub type TrialParams = IndexMap<String, ParameterValue>;

/// Render parameters as `name=value` pairs
pub fn format_params(params: &TrialParams) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Named lists of candidate values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpace {
    parameters: IndexMap<String, Vec<ParameterValue>>,
}

impl ParamSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter with its candidate values
    pub fn choices<V, I>(mut self, name: &str, values: I) -> Self
    where
        V: Into<ParameterValue>,
        I: IntoIterator<Item = V>,
    {
        self.parameters
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn values(&self, name: &str) -> Option<&[ParameterValue]> {
        self.parameters.get(name).map(Vec::as_slice)
    }

    pub fn n_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// Number of points in the full grid
    pub fn grid_size(&self) -> usize {
        if self.parameters.is_empty() {
            return 0;
        }
        self.parameters.values().map(Vec::len).product()
    }

    fn check(&self) -> Result<()> {
        if self.parameters.is_empty() {
            return Err(BoxOfficeError::SearchError("parameter space is empty".to_string()));
        }
        if let Some((name, _)) = self.parameters.iter().find(|(_, values)| values.is_empty()) {
            return Err(BoxOfficeError::SearchError(format!(
                "parameter '{}' has no candidate values",
                name
            )));
        }
        Ok(())
    }

    /// The point at position `index` of the grid; the last parameter varies
    /// fastest
    fn point(&self, mut index: usize) -> TrialParams {
        let mut picks = vec![0usize; self.parameters.len()];
        for (slot, values) in picks.iter_mut().zip(self.parameters.values()).rev() {
            *slot = index % values.len();
            index /= values.len();
        }
        self.parameters
            .iter()
            .zip(picks)
            .map(|((name, values), pick)| (name.clone(), values[pick].clone()))
            .collect()
    }

    /// Every combination of candidate values
    pub fn grid(&self) -> Result<Vec<TrialParams>> {
        self.check()?;
        Ok((0..self.grid_size()).map(|i| self.point(i)).collect())
    }

    /// `n` distinct grid points drawn without replacement; the whole grid
    /// (shuffled) when `n` exceeds it
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<TrialParams>> {
        self.check()?;
        let size = self.grid_size();
        let amount = n.min(size);
        Ok(rand::seq::index::sample(rng, size, amount)
            .into_iter()
            .map(|i| self.point(i))
            .collect())
    }
}

/// Evenly spaced integers from `start` to `stop` inclusive, truncated
pub fn int_linspace(start: i64, stop: i64, num: usize) -> Vec<i64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) as f64 / (num - 1) as f64;
            (0..num)
                .map(|i| (start as f64 + step * i as f64) as i64)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn space() -> ParamSpace {
        ParamSpace::new()
            .choices("bootstrap", [true, false])
            .choices("max_depth", [Some(10i64), None])
            .choices("max_features", ["auto", "sqrt", "log2"])
    }

    #[test]
    fn test_grid_is_cartesian_product() {
        let grid = space().grid().unwrap();
        assert_eq!(grid.len(), 12);
        let distinct: HashSet<String> = grid.iter().map(format_params).collect();
        assert_eq!(distinct.len(), 12);
        assert_eq!(grid[0]["max_features"], ParameterValue::from("auto"));
        assert_eq!(grid[1]["max_features"], ParameterValue::from("sqrt"));
        assert_eq!(grid[11]["bootstrap"], ParameterValue::Bool(false));
        assert!(grid[11]["max_depth"].is_none());
    }

    #[test]
    fn test_sample_without_replacement() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let picks = space().sample(8, &mut rng).unwrap();
        let distinct: HashSet<String> = picks.iter().map(format_params).collect();
        assert_eq!(distinct.len(), 8);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let again = space().sample(8, &mut rng).unwrap();
        assert_eq!(picks, again);

        let all = space().sample(100, &mut rng).unwrap();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn test_empty_parameter_rejected() {
        let empty = ParamSpace::new().choices::<bool, _>("bootstrap", []);
        assert!(empty.grid().is_err());
        assert!(ParamSpace::new().grid().is_err());
    }

    #[test]
    fn test_int_linspace() {
        assert_eq!(
            int_linspace(200, 2000, 10),
            vec![200, 400, 600, 800, 1000, 1200, 1400, 1600, 1800, 2000]
        );
        assert_eq!(
            int_linspace(10, 110, 11),
            vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110]
        );
    }

    #[test]
    fn test_display() {
        let mut params = TrialParams::new();
        params.insert("n_estimators".to_string(), 100i64.into());
        params.insert("max_features".to_string(), "sqrt".into());
        assert_eq!(format_params(&params), "n_estimators=100, max_features='sqrt'");
    }
}
