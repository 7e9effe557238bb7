use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{ItemSelector, ModelResult, Observation, TimeSeriesTable};

/// Anything `compare` accepts as the observation side
#[derive(Debug, Clone)]
pub enum ObservationSource {
    Path(PathBuf),
    Table(TimeSeriesTable),
    Observation(Observation),
}

/// Anything `compare` accepts as the model side
#[derive(Debug, Clone)]
pub enum ModelSource {
    Path(PathBuf),
    Table(TimeSeriesTable),
    ModelResult(ModelResult),
}

impl ObservationSource {
    /// Resolve the source into an observation.
    ///
    /// A selector given for an already constructed observation must agree
    /// with the item it holds.
    pub fn into_observation(
        self,
        item: Option<&ItemSelector>,
        name: Option<&str>,
    ) -> Result<Observation> {
        let name = name.map(str::to_string);
        match self {
            ObservationSource::Path(path) => Observation::from_path(path, item.cloned(), name),
            ObservationSource::Table(table) => Observation::from_table(&table, item.cloned(), name),
            ObservationSource::Observation(observation) => {
                if let Some(selector) = item {
                    observation.check_selector(selector)?;
                }
                Ok(match name {
                    Some(name) => observation.with_name(name),
                    None => observation,
                })
            }
        }
    }
}

impl ModelSource {
    pub fn into_model_result(
        self,
        item: Option<&ItemSelector>,
        name: Option<&str>,
    ) -> Result<ModelResult> {
        let name = name.map(str::to_string);
        match self {
            ModelSource::Path(path) => ModelResult::from_path(path, item.cloned(), name),
            ModelSource::Table(table) => ModelResult::from_table(&table, item.cloned(), name),
            ModelSource::ModelResult(model) => {
                if let Some(selector) = item {
                    model.check_selector(selector)?;
                }
                Ok(match name {
                    Some(name) => model.with_name(name),
                    None => model,
                })
            }
        }
    }
}

macro_rules! impl_path_sources {
    ($($source:ident),*) => {
        $(
            impl From<&str> for $source {
                fn from(path: &str) -> Self {
                    $source::Path(PathBuf::from(path))
                }
            }

            impl From<String> for $source {
                fn from(path: String) -> Self {
                    $source::Path(PathBuf::from(path))
                }
            }

            impl From<&Path> for $source {
                fn from(path: &Path) -> Self {
                    $source::Path(path.to_path_buf())
                }
            }

            impl From<PathBuf> for $source {
                fn from(path: PathBuf) -> Self {
                    $source::Path(path)
                }
            }

            impl From<&PathBuf> for $source {
                fn from(path: &PathBuf) -> Self {
                    $source::Path(path.clone())
                }
            }

            impl From<TimeSeriesTable> for $source {
                fn from(table: TimeSeriesTable) -> Self {
                    $source::Table(table)
                }
            }
        )*
    };
}

impl_path_sources!(ObservationSource, ModelSource);

impl From<Observation> for ObservationSource {
    fn from(observation: Observation) -> Self {
        ObservationSource::Observation(observation)
    }
}

impl From<ModelResult> for ModelSource {
    fn from(model: ModelResult) -> Self {
        ModelSource::ModelResult(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompareError;
    use crate::models::ItemInfo;
    use chrono::NaiveDate;

    fn table() -> TimeSeriesTable {
        let t0 = NaiveDate::from_ymd_opt(2017, 10, 27)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeriesTable::new(
            vec![t0, t0 + chrono::Duration::hours(1)],
            vec![ItemInfo::new("Hm0"), ItemInfo::new("Tp")],
            vec![vec![1.0, 1.1], vec![7.0, 7.1]],
        )
        .unwrap()
    }

    #[test]
    fn test_path_conversions() {
        assert!(matches!(
            ObservationSource::from("obs.csv"),
            ObservationSource::Path(_)
        ));
        assert!(matches!(
            ModelSource::from(PathBuf::from("model.parquet")),
            ModelSource::Path(_)
        ));
    }

    #[test]
    fn test_constructed_observation_keeps_item() {
        let observation = Observation::from_table(&table(), Some(1.into()), None).unwrap();
        let source = ObservationSource::from(observation);

        let renamed = source
            .clone()
            .into_observation(Some(&ItemSelector::from("Tp")), Some("Buoy"))
            .unwrap();
        assert_eq!(renamed.name(), "Buoy");
        assert_eq!(renamed.item().name, "Tp");

        let err = source
            .into_observation(Some(&ItemSelector::Index(0)), None)
            .unwrap_err();
        assert!(matches!(err, CompareError::ItemConflict { .. }));
    }

    #[test]
    fn test_table_model_source() {
        let model = ModelSource::from(table())
            .into_model_result(Some(&ItemSelector::Index(-1)), None)
            .unwrap();
        assert_eq!(model.name(), "Tp");
    }
}
