use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompareError>;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Filename extension '{extension}' not supported (csv, txt, parquet)")]
    UnsupportedFormat { extension: String },

    #[error("Multiple items in {source_name} ({}); select one explicitly", .items.join(", "))]
    AmbiguousItem {
        source_name: String,
        items: Vec<String>,
    },

    #[error("Item selector '{requested}' conflicts with the already selected item '{selected}'")]
    ItemConflict { requested: String, selected: String },

    #[error("Item {index} out of range (0, {})", .n_items.saturating_sub(1))]
    ItemOutOfRange { index: i64, n_items: usize },

    #[error("Item '{name}' not found, must be one of [{}]", .available.join(", "))]
    ItemNotFound { name: String, available: Vec<String> },

    #[error("Unknown metric: '{0}'")]
    UnknownMetric(String),

    #[error("Model '{0}' not found")]
    UnknownModel(String),

    #[error("Observation '{0}' not found")]
    UnknownObservation(String),

    #[error("{kind} index {index} out of range (0, {})", .len.saturating_sub(1))]
    SelectionOutOfRange {
        kind: &'static str,
        index: i64,
        len: usize,
    },

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}

impl CompareError {
    /// True for the item-selection errors raised while resolving a source
    pub fn is_item_selection(&self) -> bool {
        matches!(
            self,
            CompareError::AmbiguousItem { .. }
                | CompareError::ItemConflict { .. }
                | CompareError::ItemOutOfRange { .. }
                | CompareError::ItemNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_item_display() {
        let err = CompareError::AmbiguousItem {
            source_name: "ts_storm_4.csv".to_string(),
            items: vec!["Hm0".to_string(), "Tp".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("ts_storm_4.csv"));
        assert!(msg.contains("Hm0, Tp"));
        assert!(err.is_item_selection());
    }

    #[test]
    fn test_out_of_range_display() {
        let err = CompareError::ItemOutOfRange {
            index: 1,
            n_items: 1,
        };
        assert_eq!(err.to_string(), "Item 1 out of range (0, 0)");
    }

    #[test]
    fn test_non_selection_error() {
        let err = CompareError::UnknownMetric("mean_se".to_string());
        assert!(!err.is_item_selection());
        assert!(err.to_string().contains("mean_se"));
    }
}
