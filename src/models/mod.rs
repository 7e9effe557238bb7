pub mod item;
pub mod observation;
pub mod table;

pub use item::{normalize_index, resolve_item, ItemInfo, ItemSelector};
pub use observation::{ModelResult, Observation};
pub use table::{TimeSeries, TimeSeriesTable};
