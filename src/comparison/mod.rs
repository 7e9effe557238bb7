pub mod align;
pub mod comparer;
pub mod skill;
pub mod source;

pub use align::{intersect_times, match_series, MatchedData};
pub use comparer::{compare, compare_models, CompareOptions, Comparer, ComparerInfo};
pub use skill::{ComparerCollection, Selection, SkillOptions, SkillRow, SkillTable, Weights};
pub use source::{ModelSource, ObservationSource};

/// The result of `compare`
pub type ComparisonResult = Comparer;
