//! Run configuration for comparing several observations against a set of
//! model results.
//!
//! ```toml
//! [[observations]]
//! path = "obs/HKNA_Hm0.csv"
//! name = "HKNA"
//!
//! [[models]]
//! path = "models/SW_1.parquet"
//! item = "Hm0"
//!
//! [skill]
//! metrics = ["bias", "rmse"]
//! end = "2017-10"
//! weights = [{ name = "HKNA", weight = 2.0 }]
//! ```
//!
//! Weights are `"equal"`, `"points"`, a list of numbers in observation
//! order, or a list of `{ name, weight }` entries. Entries are used instead
//! of a TOML table because table keys are lowercased on load.
//!
//! Relative paths are resolved against the directory of the config file.
//! Environment variables prefixed with `MODEL_SKILL_` override file values,
//! using `__` to reach nested keys (`MODEL_SKILL_SKILL__WEIGHTS=equal`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::comparison::{compare_models, Comparer, ComparerCollection, SkillOptions, Weights};
use crate::error::{CompareError, Result};
use crate::metrics::Metric;
use crate::models::{ItemSelector, ModelResult, Observation};
use crate::utils::constants::ENV_PREFIX;
use crate::utils::time::{parse_period_bound, parse_period_end};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RunConfig {
    #[validate(length(min = 1, message = "at least one observation is required"), nested)]
    pub observations: Vec<SourceConfig>,

    #[validate(length(min = 1, message = "at least one model is required"), nested)]
    pub models: Vec<SourceConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub skill: SkillConfig,
}

/// A file source with optional item selection and display name
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[validate(length(min = 1))]
    pub path: String,

    pub item: Option<ItemSelector>,

    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SkillConfig {
    #[serde(default)]
    #[validate(custom(function = "validate_metric_names"))]
    pub metrics: Vec<String>,

    pub start: Option<String>,

    pub end: Option<String>,

    pub weights: Option<WeightsConfig>,
}

/// `"equal"`, `"points"`, a list in observation order, or named entries
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WeightsConfig {
    Named(String),
    List(Vec<f64>),
    Entries(Vec<ObservationWeight>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservationWeight {
    pub name: String,
    pub weight: f64,
}

fn validate_metric_names(metrics: &[String]) -> std::result::Result<(), ValidationError> {
    for name in metrics {
        if name.parse::<Metric>().is_err() {
            let mut err = ValidationError::new("unknown_metric");
            err.message = Some(format!("unknown metric '{}'", name).into());
            return Err(err);
        }
    }
    Ok(())
}

impl RunConfig {
    /// Load a TOML config file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut run_config: RunConfig = settings.try_deserialize()?;
        run_config.validate()?;

        if let Some(base_dir) = path.parent() {
            run_config.resolve_paths(base_dir);
        }

        tracing::debug!(
            "Loaded config {} with {} observation(s) and {} model(s)",
            path.display(),
            run_config.observations.len(),
            run_config.models.len()
        );

        Ok(run_config)
    }

    /// Parse a TOML document without environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        let run_config: RunConfig = settings.try_deserialize()?;
        run_config.validate()?;
        Ok(run_config)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        for source in self.observations.iter_mut().chain(self.models.iter_mut()) {
            let path = PathBuf::from(&source.path);
            if path.is_relative() {
                source.path = base_dir.join(path).display().to_string();
            }
        }
    }

    pub fn load_models(&self) -> Result<Vec<ModelResult>> {
        self.models
            .iter()
            .map(|m| ModelResult::from_path(&m.path, m.item.clone(), m.name.clone()))
            .collect()
    }

    pub fn load_observation(&self, index: usize) -> Result<Observation> {
        let source = self.observations.get(index).ok_or_else(|| {
            CompareError::Config(format!("No observation with index {}", index))
        })?;
        Observation::from_path(&source.path, source.item.clone(), source.name.clone())
    }

    /// Compare one configured observation against all models
    pub fn compare_observation(&self, index: usize, models: &[ModelResult]) -> Result<Comparer> {
        let observation = self.load_observation(index)?;
        compare_models(observation, models, &Default::default())
    }

    pub fn skill_options(&self) -> Result<SkillOptions> {
        self.skill.options()
    }

    pub fn weights(&self) -> Result<Weights> {
        self.skill.weights()
    }
}

impl SkillConfig {
    pub fn options(&self) -> Result<SkillOptions> {
        let mut options = SkillOptions::new().with_metrics(Metric::parse_list(&self.metrics)?);
        if let Some(start) = &self.start {
            options = options.with_start(parse_period_bound(start)?);
        }
        if let Some(end) = &self.end {
            options = options.with_end(parse_period_end(end)?);
        }
        Ok(options)
    }

    pub fn weights(&self) -> Result<Weights> {
        match &self.weights {
            None => Ok(Weights::Equal),
            Some(WeightsConfig::Named(name)) => name.parse(),
            Some(WeightsConfig::List(list)) => Ok(Weights::List(list.clone())),
            Some(WeightsConfig::Entries(entries)) => {
                let mut map = BTreeMap::new();
                for entry in entries {
                    if map.insert(entry.name.clone(), entry.weight).is_some() {
                        return Err(CompareError::InvalidWeights(format!(
                            "Observation '{}' is weighted twice",
                            entry.name
                        )));
                    }
                }
                Ok(Weights::Map(map))
            }
        }
    }
}

/// Compare every configured observation against all configured models
pub fn run_config(run_config: &RunConfig) -> Result<(ComparerCollection, SkillOptions)> {
    let models = run_config.load_models()?;
    let mut collection = ComparerCollection::new();

    for index in 0..run_config.observations.len() {
        collection.add(run_config.compare_observation(index, &models)?);
    }

    Ok((collection, run_config.skill_options()?))
}
