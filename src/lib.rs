//! Compare model results with observed time series and compute skill.

pub mod cli;
pub mod comparison;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod readers;
pub mod utils;
pub mod writers;

pub use comparison::{
    compare, compare_models, CompareOptions, Comparer, ComparerCollection, ComparisonResult,
    SkillOptions, SkillTable,
};
pub use error::{CompareError, Result};
pub use metrics::Metric;
pub use models::{ItemSelector, ModelResult, Observation, TimeSeriesTable};
