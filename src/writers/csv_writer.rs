use crate::error::Result;
use crate::models::TimeSeriesTable;
use std::io::Write;
use std::path::Path;

// Fractional seconds are only written when present
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Writes tables in the layout `CsvTableReader` reads back
pub struct CsvTableWriter {
    delimiter: u8,
}

impl CsvTableWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn write_table(&self, table: &TimeSeriesTable, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(table, file)
    }

    pub fn write_to<W: Write>(&self, table: &TimeSeriesTable, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        let mut header = vec!["time".to_string()];
        header.extend(table.items().iter().map(|i| i.header()));
        csv_writer.write_record(&header)?;

        let columns: Vec<&[f64]> = (0..table.n_items())
            .filter_map(|j| table.column(j))
            .collect();

        for (row, time) in table.time().iter().enumerate() {
            let mut record = Vec::with_capacity(columns.len() + 1);
            record.push(time.format(DATETIME_FORMAT).to_string());
            for column in &columns {
                let value = column[row];
                record.push(if value.is_nan() {
                    String::new()
                } else {
                    value.to_string()
                });
            }
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for CsvTableWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemInfo;
    use crate::readers::CsvTableReader;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_written_csv_layout() -> Result<()> {
        let t0 = NaiveDate::from_ymd_opt(2017, 10, 27)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let table = TimeSeriesTable::new(
            vec![t0, t0 + chrono::Duration::hours(1)],
            vec![ItemInfo::new("Hm0").with_unit("m"), ItemInfo::new("Tp")],
            vec![vec![1.5, f64::NAN], vec![7.0, 7.25]],
        )?;

        let mut buffer = Vec::new();
        CsvTableWriter::new().write_to(&table, &mut buffer)?;
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "time,Hm0 [m],Tp\n2017-10-27 00:00:00,1.5,7\n2017-10-27 01:00:00,,7.25\n"
        );

        let read_back = CsvTableReader::new().read_from(text.as_bytes())?;
        assert_eq!(read_back.time(), table.time());
        assert_eq!(read_back.items(), table.items());
        Ok(())
    }

    #[test]
    fn test_fractional_seconds_are_kept() -> Result<()> {
        let t0 = NaiveDate::from_ymd_opt(2017, 10, 27)
            .unwrap()
            .and_hms_milli_opt(0, 0, 0, 500)
            .unwrap();
        let table = TimeSeriesTable::from_series(vec![t0], ItemInfo::new("WL"), vec![0.5])?;

        let mut buffer = Vec::new();
        CsvTableWriter::new().write_to(&table, &mut buffer)?;
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("2017-10-27 00:00:00.500"), "{}", text);

        let read_back = CsvTableReader::new().read_from(text.as_bytes())?;
        assert_eq!(read_back.time(), table.time());
        Ok(())
    }
}
