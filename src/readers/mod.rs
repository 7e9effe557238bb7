pub mod csv_reader;
pub mod parquet_reader;

pub use csv_reader::CsvTableReader;
pub use parquet_reader::ParquetTableReader;

use crate::error::{CompareError, Result};
use crate::models::{ItemInfo, TimeSeriesTable};
use crate::utils::constants::{CSV_EXTENSIONS, PARQUET_EXTENSION};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Time-series file formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if CSV_EXTENSIONS.contains(&extension.as_str()) {
            Ok(FileFormat::Csv)
        } else if extension == PARQUET_EXTENSION {
            Ok(FileFormat::Parquet)
        } else {
            Err(CompareError::UnsupportedFormat { extension })
        }
    }
}

/// Read a CSV or Parquet time-series file into a table
pub fn read_table(path: &Path) -> Result<TimeSeriesTable> {
    let table = match FileFormat::from_path(path)? {
        FileFormat::Csv => CsvTableReader::for_file(path)?.read_table(path)?,
        FileFormat::Parquet => ParquetTableReader::new().read_table(path)?,
    };

    tracing::debug!(
        "Read {} rows and {} item(s) from {}",
        table.n_rows(),
        table.n_items(),
        path.display()
    );

    Ok(table)
}

#[derive(Debug, Clone)]
pub struct TableInfo {
    pub file: PathBuf,
    pub n_rows: usize,
    pub items: Vec<ItemInfo>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TableInfo {
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("File: {}", self.file.display())];
        for (j, item) in self.items.iter().enumerate() {
            lines.push(format!("- Item: {}: {}", j, item));
        }
        lines.push(format!("Rows: {}", self.n_rows));
        match (self.start, self.end) {
            (Some(start), Some(end)) => lines.push(format!("Period: {} - {}", start, end)),
            _ => lines.push("Period: (empty)".to_string()),
        }
        lines.join("\n")
    }
}

/// Load a file and report its items and period
pub fn describe(path: &Path) -> Result<TableInfo> {
    let table = read_table(path)?;
    Ok(TableInfo {
        file: path.to_path_buf(),
        n_rows: table.n_rows(),
        items: table.items().to_vec(),
        start: table.start(),
        end: table.end(),
    })
}
