pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::CsvTableWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetTableWriter};

use crate::error::Result;
use crate::models::TimeSeriesTable;
use crate::readers::FileFormat;
use std::path::Path;

/// Write a table as CSV or Parquet depending on the file extension
pub fn write_table(table: &TimeSeriesTable, path: &Path) -> Result<()> {
    match FileFormat::from_path(path)? {
        FileFormat::Csv => CsvTableWriter::new().write_table(table, path),
        FileFormat::Parquet => ParquetTableWriter::new().write_table(table, path),
    }
}
