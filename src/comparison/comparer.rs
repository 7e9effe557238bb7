use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;

use crate::comparison::align::{match_series, MatchedData};
use crate::comparison::skill::{SkillOptions, SkillRow, SkillTable};
use crate::comparison::source::{ModelSource, ObservationSource};
use crate::error::{CompareError, Result};
use crate::metrics::Metric;
use crate::models::{ItemInfo, ItemSelector, ModelResult, Observation, TimeSeries, TimeSeriesTable};

/// Item selection and naming for `compare`.
///
/// Every field is optional. Item selectors are required only when a
/// source holds more than one item.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub obs_item: Option<ItemSelector>,
    pub mod_item: Option<ItemSelector>,
    pub obs_name: Option<String>,
    pub mod_name: Option<String>,
}

impl CompareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_obs_item(mut self, item: impl Into<ItemSelector>) -> Self {
        self.obs_item = Some(item.into());
        self
    }

    pub fn with_mod_item(mut self, item: impl Into<ItemSelector>) -> Self {
        self.mod_item = Some(item.into());
        self
    }

    pub fn with_obs_name(mut self, name: impl Into<String>) -> Self {
        self.obs_name = Some(name.into());
        self
    }

    pub fn with_mod_name(mut self, name: impl Into<String>) -> Self {
        self.mod_name = Some(name.into());
        self
    }
}

/// Compare one observation with one model result.
///
/// Both sides may be file paths, in-memory tables or already constructed
/// `Observation`/`ModelResult` values.
pub fn compare(
    obs: impl Into<ObservationSource>,
    model: impl Into<ModelSource>,
    options: &CompareOptions,
) -> Result<Comparer> {
    let model = model
        .into()
        .into_model_result(options.mod_item.as_ref(), options.mod_name.as_deref())?;
    compare_models(obs, std::slice::from_ref(&model), options)
}

/// Compare one observation with several model results.
///
/// Only the observation fields of `options` are used; models are taken as
/// given. All series are matched on the timestamps they have in common.
pub fn compare_models(
    obs: impl Into<ObservationSource>,
    models: &[ModelResult],
    options: &CompareOptions,
) -> Result<Comparer> {
    let observation = obs
        .into()
        .into_observation(options.obs_item.as_ref(), options.obs_name.as_deref())?;
    Comparer::new(&observation, models)
}

/// Observation and model values matched in time.
///
/// Holds the names and items of both sides and the matched data only; the
/// full source series are not retained.
#[derive(Debug, Clone)]
pub struct Comparer {
    name: String,
    obs_item: ItemInfo,
    mod_names: Vec<String>,
    mod_items: Vec<ItemInfo>,
    data: MatchedData,
}

impl Comparer {
    pub fn new(observation: &Observation, models: &[ModelResult]) -> Result<Self> {
        if models.is_empty() {
            return Err(CompareError::Config(
                "At least one model result is required".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(models.len());
        for model in models {
            if !seen.insert(model.name()) {
                return Err(CompareError::Config(format!(
                    "Duplicate model name '{}'",
                    model.name()
                )));
            }
            warn_unit_mismatch(observation, model);
        }

        let series: Vec<&TimeSeries> = models.iter().map(|m| m.series()).collect();
        let data = match_series(observation.series(), &series);

        if data.is_empty() {
            tracing::warn!(
                "No overlapping timestamps between observation '{}' and model(s) {}",
                observation.name(),
                models
                    .iter()
                    .map(|m| format!("'{}'", m.name()))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        } else {
            tracing::debug!(
                "Matched {} points for '{}' ({} - {})",
                data.len(),
                observation.name(),
                data.time[0],
                data.time[data.len() - 1]
            );
        }

        Ok(Self {
            name: observation.name().to_string(),
            obs_item: observation.item().clone(),
            mod_names: models.iter().map(|m| m.name().to_string()).collect(),
            mod_items: models.iter().map(|m| m.item().clone()).collect(),
            data,
        })
    }

    /// Name of the observation
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn obs_name(&self) -> &str {
        &self.name
    }

    pub fn obs_item(&self) -> &ItemInfo {
        &self.obs_item
    }

    pub fn mod_names(&self) -> &[String] {
        &self.mod_names
    }

    pub fn mod_items(&self) -> &[ItemInfo] {
        &self.mod_items
    }

    /// Number of matched timestamps
    pub fn n_points(&self) -> usize {
        self.data.len()
    }

    /// First matched timestamp, `None` without overlap
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.data.time.first().copied()
    }

    /// Last matched timestamp, `None` without overlap
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.data.time.last().copied()
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.data.time
    }

    pub fn obs(&self) -> &[f64] {
        &self.data.obs
    }

    pub fn model(&self, index: usize) -> Option<&[f64]> {
        self.data.models.get(index).map(|m| m.as_slice())
    }

    pub fn model_by_name(&self, name: &str) -> Option<&[f64]> {
        let index = self.mod_names.iter().position(|n| n == name)?;
        self.model(index)
    }

    /// `model - obs` at every matched timestamp
    pub fn residual(&self, index: usize) -> Option<Vec<f64>> {
        let model = self.model(index)?;
        Some(model.iter().zip(&self.data.obs).map(|(m, o)| m - o).collect())
    }

    /// Copy restricted to `start <= time <= end`
    pub fn sel(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self {
            data: self.data.sel(start, end),
            ..self.clone()
        }
    }

    pub(crate) fn skill_row(&self, index: usize, metrics: &[Metric]) -> SkillRow {
        let model = &self.data.models[index];
        SkillRow {
            model: self.mod_names[index].clone(),
            observation: Some(self.name.clone()),
            n: self.data.len(),
            values: metrics
                .iter()
                .map(|m| m.compute(&self.data.obs, model))
                .collect(),
        }
    }

    /// One row per selected model
    pub fn skill(&self, options: &SkillOptions) -> Result<SkillTable> {
        options.observation_indices(std::slice::from_ref(&self.name))?;
        let indices = options.model_indices(&self.mod_names)?;

        let metrics = options.metrics();
        let selected = self.sel(options.start, options.end);
        let mut table = SkillTable::new(metrics.clone());
        for index in indices {
            table.push(selected.skill_row(index, &metrics));
        }
        Ok(table)
    }

    /// Matched data as a table: the observation first, then one column per model.
    ///
    /// A model named like the observation gets a `_mod` suffix and the
    /// observation column a `_obs` suffix.
    pub fn to_table(&self) -> Result<TimeSeriesTable> {
        let clash = self.mod_names.iter().any(|m| *m == self.name);
        let obs_column = if clash {
            format!("{}_obs", self.name)
        } else {
            self.name.clone()
        };

        let mut items = vec![rename(&self.obs_item, &obs_column)];
        items.extend(self.mod_items.iter().zip(&self.mod_names).map(|(item, name)| {
            if *name == self.name {
                rename(item, &format!("{}_mod", name))
            } else {
                rename(item, name)
            }
        }));

        let mut values = vec![self.data.obs.clone()];
        values.extend(self.data.models.iter().cloned());

        TimeSeriesTable::new(self.data.time.clone(), items, values)
    }

    pub fn info(&self) -> ComparerInfo {
        ComparerInfo {
            name: self.name.clone(),
            obs_item: self.obs_item.clone(),
            mod_names: self.mod_names.clone(),
            n_points: self.n_points(),
            start: self.start(),
            end: self.end(),
        }
    }

    pub fn summary(&self) -> String {
        let models: Vec<String> = self
            .mod_names
            .iter()
            .zip(&self.mod_items)
            .map(|(name, item)| format!("{} ({})", name, item))
            .collect();

        let period = match (self.start(), self.end()) {
            (Some(start), Some(end)) => format!("{} - {}", start, end),
            _ => "(no overlap)".to_string(),
        };

        format!(
            "Comparer: {}\n\
            - Observation item: {}\n\
            - Models: {}\n\
            - Matched points: {}\n\
            - Period: {}",
            self.name,
            self.obs_item,
            models.join(", "),
            self.n_points(),
            period,
        )
    }
}

/// Serializable overview of a comparer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparerInfo {
    pub name: String,
    pub obs_item: ItemInfo,
    pub mod_names: Vec<String>,
    pub n_points: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

fn rename(item: &ItemInfo, name: &str) -> ItemInfo {
    ItemInfo {
        name: name.to_string(),
        unit: item.unit.clone(),
    }
}

fn warn_unit_mismatch(observation: &Observation, model: &ModelResult) {
    if let (Some(obs_unit), Some(mod_unit)) = (&observation.item().unit, &model.item().unit) {
        if obs_unit != mod_unit {
            tracing::warn!(
                "Unit mismatch: observation '{}' is in [{}] but model '{}' is in [{}]",
                observation.name(),
                obs_unit,
                model.name(),
                mod_unit
            );
        }
    }
}
