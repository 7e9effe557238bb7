use crate::error::{CompareError, Result};
use crate::models::{ItemInfo, TimeSeriesTable};
use crate::utils::constants::{
    CSV_DELIMITERS, DEFAULT_BUFFER_SIZE, MISSING_VALUE_TOKENS, MMAP_THRESHOLD_BYTES,
};
use crate::utils::time::parse_timestamp;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Reads delimited text files with a time column followed by item columns.
///
/// ```text
/// time,Hm0 [m],Tp [s]
/// 2017-10-27 00:00:00,1.52,7.1
/// ```
pub struct CsvTableReader {
    delimiter: u8,
    use_mmap: bool,
}

impl CsvTableReader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            use_mmap: false,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Reader set up for a given file: the delimiter is taken from the header
    /// line and large files are memory mapped
    pub fn for_file(path: &Path) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();

        let mut header = None;
        for line in BufReader::new(File::open(path)?).lines() {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                header = Some(line);
                break;
            }
        }

        let delimiter = header.as_deref().map(sniff_delimiter).unwrap_or(b',');
        tracing::trace!(
            "Reading {} with delimiter {:?} ({} bytes)",
            path.display(),
            delimiter as char,
            size
        );

        Ok(Self::new()
            .with_delimiter(delimiter)
            .with_mmap(size >= MMAP_THRESHOLD_BYTES))
    }

    /// Read a whole file into a table
    pub fn read_table(&self, path: &Path) -> Result<TimeSeriesTable> {
        let file = File::open(path)?;
        if self.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_from(&mmap[..])
        } else {
            self.read_from(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file))
        }
    }

    /// Read a table from any reader (first row holds the headers)
    pub fn read_from<R: Read>(&self, reader: R) -> Result<TimeSeriesTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(CompareError::InvalidFormat(format!(
                "Expected a time column and at least one item, found {} column(s)",
                headers.len()
            )));
        }

        let items: Vec<ItemInfo> = headers.iter().skip(1).map(ItemInfo::from_header).collect();
        let mut time = Vec::new();
        let mut values = vec![Vec::new(); items.len()];

        for record_result in csv_reader.records() {
            let record = record_result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let stamp = record.get(0).unwrap_or("");
            if stamp.is_empty() {
                continue;
            }

            let timestamp = parse_timestamp(stamp).map_err(|_| {
                CompareError::InvalidFormat(format!(
                    "Invalid timestamp '{}' on line {}",
                    stamp, line
                ))
            })?;
            time.push(timestamp);

            for (j, column) in values.iter_mut().enumerate() {
                let cell = record.get(j + 1).unwrap_or("");
                column.push(parse_value(cell, line)?);
            }
        }

        TimeSeriesTable::new(time, items, values)
    }
}

impl Default for CsvTableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// The candidate delimiter occurring most often in a header line
fn sniff_delimiter(header: &str) -> u8 {
    let mut best = (b',', 0);
    for delimiter in CSV_DELIMITERS {
        let count = header.bytes().filter(|b| *b == delimiter).count();
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    best.0
}

fn parse_value(cell: &str, line: u64) -> Result<f64> {
    if MISSING_VALUE_TOKENS.contains(&cell) {
        return Ok(f64::NAN);
    }

    cell.parse::<f64>().map_err(|_| {
        CompareError::InvalidFormat(format!("Invalid value '{}' on line {}", cell, line))
    })
}
