use crate::error::{CompareError, Result};
use crate::models::{ItemInfo, TimeSeriesTable};
use crate::utils::constants::{TIME_COLUMN_NAMES, UNIT_METADATA_KEY};
use crate::utils::time::parse_timestamp;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Schema, TimeUnit, TimestampNanosecondType};
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Reads Parquet files holding a temporal column plus numeric item columns
pub struct ParquetTableReader {
    batch_size: usize,
}

impl ParquetTableReader {
    pub fn new() -> Self {
        Self { batch_size: 8192 }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn read_table(&self, path: &Path) -> Result<TimeSeriesTable> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();

        let time_index = find_time_column(&schema)?;
        let item_columns: Vec<(usize, ItemInfo)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != time_index)
            .filter_map(|(i, field)| {
                if field.data_type().is_numeric() {
                    Some((i, item_from_field(field)))
                } else {
                    tracing::debug!(
                        "Skipping non-numeric column '{}' ({})",
                        field.name(),
                        field.data_type()
                    );
                    None
                }
            })
            .collect();

        let reader = builder.with_batch_size(self.batch_size).build()?;

        let mut time = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); item_columns.len()];

        for batch_result in reader {
            let batch = batch_result?;

            time.extend(timestamps_from_array(batch.column(time_index))?);

            for (slot, (column, _)) in item_columns.iter().enumerate() {
                let array = cast(batch.column(*column), &DataType::Float64)?;
                let array = array.as_primitive::<Float64Type>();
                values[slot].extend((0..array.len()).map(|i| {
                    if array.is_null(i) {
                        f64::NAN
                    } else {
                        array.value(i)
                    }
                }));
            }
        }

        let items = item_columns.into_iter().map(|(_, item)| item).collect();
        TimeSeriesTable::new(time, items, values)
    }
}

impl Default for ParquetTableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// First temporal column, else a column with a conventional time name
fn find_time_column(schema: &Schema) -> Result<usize> {
    let temporal = schema.fields().iter().position(|f| {
        matches!(
            f.data_type(),
            DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64
        )
    });

    temporal
        .or_else(|| {
            schema
                .fields()
                .iter()
                .position(|f| TIME_COLUMN_NAMES.contains(&f.name().to_lowercase().as_str()))
        })
        .ok_or_else(|| {
            CompareError::InvalidFormat("No time column found in Parquet file".to_string())
        })
}

fn item_from_field(field: &Field) -> ItemInfo {
    let item = ItemInfo::new(field.name().as_str());
    match field.metadata().get(UNIT_METADATA_KEY) {
        Some(unit) if !unit.is_empty() => item.with_unit(unit.as_str()),
        _ => item,
    }
}

fn timestamps_from_array(array: &ArrayRef) -> Result<Vec<NaiveDateTime>> {
    if let DataType::Utf8 = array.data_type() {
        let strings = array.as_string::<i32>();
        return (0..strings.len())
            .map(|i| {
                if strings.is_null(i) {
                    Err(CompareError::InvalidFormat(format!(
                        "Missing timestamp in row {}",
                        i
                    )))
                } else {
                    parse_timestamp(strings.value(i))
                }
            })
            .collect();
    }

    let nanos = cast(array, &DataType::Timestamp(TimeUnit::Nanosecond, None))?;
    let nanos = nanos.as_primitive::<TimestampNanosecondType>();

    (0..nanos.len())
        .map(|i| {
            if nanos.is_null(i) {
                return Err(CompareError::InvalidFormat(format!(
                    "Missing timestamp in row {}",
                    i
                )));
            }
            let value = nanos.value(i);
            let secs = value.div_euclid(1_000_000_000);
            let subsec = value.rem_euclid(1_000_000_000) as u32;
            DateTime::from_timestamp(secs, subsec)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| {
                    CompareError::InvalidFormat(format!(
                        "Timestamp out of range in row {}",
                        i
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::ParquetTableWriter;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn sample_table() -> TimeSeriesTable {
        let time: Vec<NaiveDateTime> = (0..5)
            .map(|h| {
                NaiveDate::from_ymd_opt(2017, 10, 27)
                    .unwrap()
                    .and_hms_opt(h, 0, 0)
                    .unwrap()
            })
            .collect();
        TimeSeriesTable::new(
            time,
            vec![ItemInfo::new("Hm0").with_unit("m"), ItemInfo::new("Tp")],
            vec![
                vec![1.0, 1.1, f64::NAN, 1.3, 1.4],
                vec![7.0, 7.1, 7.2, 7.3, 7.4],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_read_written_table() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let table = sample_table();
        ParquetTableWriter::new().write_table(&table, temp_file.path())?;

        let read_back = ParquetTableReader::new()
            .with_batch_size(2)
            .read_table(temp_file.path())?;

        assert_eq!(read_back.time(), table.time());
        assert_eq!(read_back.item_names(), vec!["Hm0", "Tp"]);
        assert_eq!(read_back.items()[0].unit.as_deref(), Some("m"));
        assert!(read_back.column(0).unwrap()[2].is_nan());
        assert_eq!(read_back.column(1).unwrap(), table.column(1).unwrap());
        Ok(())
    }

    #[test]
    fn test_sub_millisecond_timestamps() -> Result<()> {
        let t0 = NaiveDate::from_ymd_opt(2017, 10, 27)
            .unwrap()
            .and_hms_nano_opt(0, 0, 0, 250)
            .unwrap();
        let table = TimeSeriesTable::from_series(
            vec![t0, t0 + chrono::Duration::microseconds(10)],
            ItemInfo::new("WL"),
            vec![0.5, 0.6],
        )?;

        let temp_file = NamedTempFile::new()?;
        ParquetTableWriter::new().write_table(&table, temp_file.path())?;
        let read_back = ParquetTableReader::new().read_table(temp_file.path())?;

        assert_eq!(read_back.n_rows(), 2);
        assert_eq!(read_back.time(), table.time());
        Ok(())
    }

    #[test]
    fn test_find_time_column_by_name() {
        let schema = Schema::new(vec![
            Field::new("Hm0", DataType::Float64, true),
            Field::new("Time", DataType::Utf8, false),
        ]);
        assert_eq!(find_time_column(&schema).unwrap(), 1);

        let schema = Schema::new(vec![Field::new("Hm0", DataType::Float64, true)]);
        assert!(find_time_column(&schema).is_err());
    }
}
