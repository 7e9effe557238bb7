use crate::error::{CompareError, Result};
use crate::models::TimeSeriesTable;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE, UNIT_METADATA_KEY,
};
use arrow::array::{ArrayRef, Float64Array, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub struct ParquetTableWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetTableWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(CompareError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write a table with a `time` column followed by one column per item
    pub fn write_table(&self, table: &TimeSeriesTable, path: &Path) -> Result<()> {
        self.write_table_batched(table, path, self.row_group_size)
    }

    /// Write a table in batches of `batch_size` rows
    pub fn write_table_batched(
        &self,
        table: &TimeSeriesTable,
        path: &Path,
        batch_size: usize,
    ) -> Result<()> {
        let schema = self.create_schema(table);
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let batch_size = batch_size.max(1);
        let mut offset = 0;
        while offset < table.n_rows() {
            let len = batch_size.min(table.n_rows() - offset);
            let batch = self.table_to_batch(table, offset, len, schema.clone())?;
            writer.write(&batch)?;
            offset += len;
        }

        writer.close()?;
        Ok(())
    }

    fn create_schema(&self, table: &TimeSeriesTable) -> Arc<Schema> {
        let mut fields = vec![Field::new(
            "time",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        )];

        for item in table.items() {
            let mut field = Field::new(&item.name, DataType::Float64, true);
            if let Some(unit) = &item.unit {
                field = field.with_metadata(HashMap::from([(
                    UNIT_METADATA_KEY.to_string(),
                    unit.clone(),
                )]));
            }
            fields.push(field);
        }

        Arc::new(Schema::new(fields))
    }

    fn table_to_batch(
        &self,
        table: &TimeSeriesTable,
        offset: usize,
        len: usize,
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        // Nanosecond timestamps cover 1677 to 2262
        let nanos = table.time()[offset..offset + len]
            .iter()
            .map(|t| {
                t.and_utc().timestamp_nanos_opt().ok_or_else(|| {
                    CompareError::InvalidFormat(format!(
                        "Timestamp {} cannot be stored in Parquet",
                        t
                    ))
                })
            })
            .collect::<Result<Vec<i64>>>()?;

        let mut columns: Vec<ArrayRef> = vec![Arc::new(TimestampNanosecondArray::from(nanos))];

        for index in 0..table.n_items() {
            let column = table.column(index).unwrap_or_default();
            // NaN is stored as null
            let values: Vec<Option<f64>> = column[offset..offset + len]
                .iter()
                .map(|v| if v.is_nan() { None } else { Some(*v) })
                .collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetTableWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemInfo;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn table(n: usize) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2017, 10, 27)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let time = (0..n)
            .map(|i| start + chrono::Duration::minutes(30 * i as i64))
            .collect();
        let values = (0..n).map(|i| i as f64 * 0.1).collect();
        TimeSeriesTable::from_series(time, ItemInfo::new("WL").with_unit("m"), values).unwrap()
    }

    #[test]
    fn test_write_empty_table() {
        let writer = ParquetTableWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        let result = writer.write_table(&table(0), temp_file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_batched_write_row_count() -> Result<()> {
        let writer = ParquetTableWriter::new().with_row_group_size(10);
        let temp_file = NamedTempFile::new()?;

        writer.write_table_batched(&table(25), temp_file.path(), 7)?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 25);
        assert!(info.row_groups >= 3);
        assert!(info.summary().contains("Total rows: 25"));
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetTableWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new().unwrap();

            let result = writer.write_table(&table(3), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetTableWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
