pub mod constants;
pub mod progress;
pub mod time;

pub use constants::*;
pub use progress::ProgressReporter;
pub use time::{parse_period_bound, parse_period_end, parse_timestamp};
