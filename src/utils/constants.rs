/// Supported file extensions
pub const CSV_EXTENSIONS: [&str; 2] = ["csv", "txt"];
pub const PARQUET_EXTENSION: &str = "parquet";

/// Column names recognised as the time index
pub const TIME_COLUMN_NAMES: [&str; 4] = ["time", "datetime", "timestamp", "date"];

/// Cell values read as missing
pub const MISSING_VALUE_TOKENS: [&str; 4] = ["", "nan", "NaN", "NA"];

/// Field metadata key holding an item's unit in Parquet files
pub const UNIT_METADATA_KEY: &str = "unit";

/// Metrics reported when none are requested
pub const DEFAULT_METRICS: [&str; 7] = ["bias", "rmse", "urmse", "mae", "cc", "si", "r2"];

/// Acceptable deviation used by the hit ratio metric
pub const DEFAULT_HIT_RATIO_THRESHOLD: f64 = 0.1;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const MMAP_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024;

/// Delimiters recognised in the header line of text files
pub const CSV_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

/// Prefix for environment variables overriding run configuration
pub const ENV_PREFIX: &str = "MODEL_SKILL";
