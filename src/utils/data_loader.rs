//! CSV loading and saving

use crate::error::{BoxOfficeError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Data loader for the movie CSV files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned for schema inference; all rows when unset
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Load a CSV file
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            BoxOfficeError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()?;
        debug!(path = %path.display(), rows = df.height(), columns = df.width(), "loaded csv");
        Ok(df)
    }

    /// Load a CSV file keeping only `columns`, in that order
    pub fn load_columns<P: AsRef<Path>, S: AsRef<str>>(
        &self,
        path: P,
        columns: &[S],
    ) -> Result<DataFrame> {
        let df = self.load_csv(path)?;
        select_columns(&df, columns)
    }
}

/// Project a frame onto `columns`; a missing column is an error
pub fn select_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
    let names: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    if let Some(missing) = names.iter().find(|name| df.column(name).is_err()) {
        return Err(BoxOfficeError::FeatureNotFound(missing.to_string()));
    }
    Ok(df.select(names)?)
}

/// Data saver
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, creating parent directories as needed
    pub fn save_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).finish(df)?;
        debug!(path = %path.display(), rows = df.height(), "saved csv");
        Ok(())
    }
}
