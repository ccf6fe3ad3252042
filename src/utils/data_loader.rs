//! Data loading utilities

use crate::error::{CollisionError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// CSV loader for collision exports
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned when inferring column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 10_000,
        }
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path).map_err(|e| {
            CollisionError::Data(format!("cannot open {}: {}", path.display(), e))
        })?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file)
            .finish()?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded csv"
        );
        Ok(df)
    }
}

/// Load a CSV file with default options
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    DataLoader::new().load_csv(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DISTRICT,TIME").unwrap();
        writeln!(file, "York,236").unwrap();
        writeln!(file, "Etobicoke York,1430").unwrap();

        let df = load_csv(file.path()).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn test_missing_file() {
        let err = load_csv("/nonexistent/collisions.csv").unwrap_err();
        assert!(matches!(err, CollisionError::Data(_)));
    }
}
