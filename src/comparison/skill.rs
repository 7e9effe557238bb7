use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::comparison::comparer::Comparer;
use crate::error::{CompareError, Result};
use crate::metrics::Metric;
use crate::models::normalize_index;

/// Picks a model or an observation by name or by (possibly negative) index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Index(i64),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionKind {
    Model,
    Observation,
}

impl Selection {
    fn resolve(&self, names: &[String], kind: SelectionKind) -> Result<usize> {
        match self {
            Selection::Index(index) => {
                normalize_index(*index, names.len()).map_err(|_| {
                    CompareError::SelectionOutOfRange {
                        kind: match kind {
                            SelectionKind::Model => "Model",
                            SelectionKind::Observation => "Observation",
                        },
                        index: *index,
                        len: names.len(),
                    }
                })
            }
            Selection::Name(name) => {
                names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| match kind {
                        SelectionKind::Model => CompareError::UnknownModel(name.clone()),
                        SelectionKind::Observation => {
                            CompareError::UnknownObservation(name.clone())
                        }
                    })
            }
        }
    }
}

impl From<i64> for Selection {
    fn from(index: i64) -> Self {
        Selection::Index(index)
    }
}

impl From<i32> for Selection {
    fn from(index: i32) -> Self {
        Selection::Index(index as i64)
    }
}

impl From<&str> for Selection {
    fn from(name: &str) -> Self {
        Selection::Name(name.to_string())
    }
}

impl From<String> for Selection {
    fn from(name: String) -> Self {
        Selection::Name(name)
    }
}

/// What to compute and on which subset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillOptions {
    /// Empty means the default metric set
    #[serde(default)]
    pub metrics: Vec<Metric>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub model: Option<Selection>,
    pub observation: Option<Vec<Selection>>,
}

impl SkillOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_model(mut self, model: impl Into<Selection>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_observations(mut self, observations: Vec<Selection>) -> Self {
        self.observation = Some(observations);
        self
    }

    /// The requested metrics, or the defaults when none are set
    pub fn metrics(&self) -> Vec<Metric> {
        if self.metrics.is_empty() {
            Metric::defaults()
        } else {
            self.metrics.clone()
        }
    }

    pub(crate) fn model_indices(&self, mod_names: &[String]) -> Result<Vec<usize>> {
        match &self.model {
            Some(selection) => Ok(vec![selection.resolve(mod_names, SelectionKind::Model)?]),
            None => Ok((0..mod_names.len()).collect()),
        }
    }

    pub(crate) fn observation_indices(&self, obs_names: &[String]) -> Result<Vec<usize>> {
        match &self.observation {
            Some(selections) => selections
                .iter()
                .map(|s| s.resolve(obs_names, SelectionKind::Observation))
                .collect(),
            None => Ok((0..obs_names.len()).collect()),
        }
    }
}

/// Skill of one model, against one observation or aggregated over several
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRow {
    pub model: String,
    /// `None` for rows aggregated over observations
    pub observation: Option<String>,
    pub n: usize,
    pub values: Vec<f64>,
}

/// Rows of metric values, columns in the order the metrics were requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTable {
    metrics: Vec<Metric>,
    rows: Vec<SkillRow>,
}

impl SkillTable {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self {
            metrics,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: SkillRow) {
        self.rows.push(row);
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn rows(&self) -> &[SkillRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, model: &str, observation: Option<&str>) -> Option<&SkillRow> {
        self.rows
            .iter()
            .find(|r| r.model == model && r.observation.as_deref() == observation)
    }

    /// A single metric value of a row
    pub fn value(&self, model: &str, observation: Option<&str>, metric: Metric) -> Option<f64> {
        let column = self.metrics.iter().position(|m| *m == metric)?;
        self.get(model, observation).map(|row| row.values[column])
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for SkillTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model_width = self
            .rows
            .iter()
            .map(|r| r.model.len())
            .chain(std::iter::once("model".len()))
            .max()
            .unwrap_or(5);
        let obs_width = self
            .rows
            .iter()
            .map(|r| r.observation.as_deref().unwrap_or("-").len())
            .chain(std::iter::once("observation".len()))
            .max()
            .unwrap_or(11);

        write!(
            f,
            "{:<mw$}  {:<ow$}  {:>6}",
            "model",
            "observation",
            "n",
            mw = model_width,
            ow = obs_width
        )?;
        for metric in &self.metrics {
            write!(f, "  {:>9}", metric.name())?;
        }
        writeln!(f)?;

        for row in &self.rows {
            write!(
                f,
                "{:<mw$}  {:<ow$}  {:>6}",
                row.model,
                row.observation.as_deref().unwrap_or("-"),
                row.n,
                mw = model_width,
                ow = obs_width
            )?;
            for value in &row.values {
                write!(f, "  {:>9.4}", value)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// How observations are weighted in `mean_skill`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Weights {
    #[default]
    Equal,
    /// Proportional to the number of matched points
    Points,
    /// One weight per selected observation, in selection order
    List(Vec<f64>),
    /// Weights by observation name; missing names weigh 1.0
    Map(BTreeMap<String, f64>),
}

impl std::str::FromStr for Weights {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(Weights::Equal),
            "points" => Ok(Weights::Points),
            other => Err(CompareError::InvalidWeights(format!(
                "'{}' is not one of equal, points",
                other
            ))),
        }
    }
}

/// Comparers of several observations, keyed by observation name
#[derive(Debug, Clone, Default)]
pub struct ComparerCollection {
    comparers: Vec<Comparer>,
}

impl ComparerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a comparer, replacing any comparer with the same observation name
    pub fn add(&mut self, comparer: Comparer) {
        match self.comparers.iter().position(|c| c.name() == comparer.name()) {
            Some(index) => {
                tracing::warn!("Replacing comparer for observation '{}'", comparer.name());
                self.comparers[index] = comparer;
            }
            None => self.comparers.push(comparer),
        }
    }

    pub fn len(&self) -> usize {
        self.comparers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comparer> {
        self.comparers.iter()
    }

    pub fn obs_names(&self) -> Vec<String> {
        self.comparers.iter().map(|c| c.name().to_string()).collect()
    }

    /// Model names across all comparers, in first-seen order
    pub fn mod_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for comparer in &self.comparers {
            for name in comparer.mod_names() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    pub fn n_points(&self) -> usize {
        self.comparers.iter().map(|c| c.n_points()).sum()
    }

    pub fn get(&self, selection: impl Into<Selection>) -> Result<&Comparer> {
        let index = selection
            .into()
            .resolve(&self.obs_names(), SelectionKind::Observation)?;
        Ok(&self.comparers[index])
    }

    /// Selected comparers restricted to the requested period
    fn selected(&self, options: &SkillOptions) -> Result<Vec<Comparer>> {
        let indices = options.observation_indices(&self.obs_names())?;
        Ok(indices
            .into_iter()
            .map(|i| self.comparers[i].sel(options.start, options.end))
            .collect())
    }

    fn selected_models(&self, options: &SkillOptions) -> Result<Vec<String>> {
        let mod_names = self.mod_names();
        let indices = options.model_indices(&mod_names)?;
        Ok(indices.into_iter().map(|i| mod_names[i].clone()).collect())
    }

    /// One row per (model, observation) with matched points in the period
    pub fn skill(&self, options: &SkillOptions) -> Result<SkillTable> {
        let metrics = options.metrics();
        let comparers = self.selected(options)?;
        let mut table = SkillTable::new(metrics.clone());

        for model in self.selected_models(options)? {
            for comparer in &comparers {
                let Some(index) = comparer.mod_names().iter().position(|m| *m == model) else {
                    continue;
                };
                if comparer.n_points() == 0 {
                    tracing::debug!(
                        "No matched points for '{}' in the selected period, skipping",
                        comparer.name()
                    );
                    continue;
                }
                table.push(comparer.skill_row(index, &metrics));
            }
        }

        Ok(table)
    }

    /// Weighted mean of each metric across observations, one row per model
    pub fn mean_skill(&self, options: &SkillOptions, weights: &Weights) -> Result<SkillTable> {
        let selected_names: Vec<String> = options
            .observation_indices(&self.obs_names())?
            .into_iter()
            .map(|i| self.comparers[i].name().to_string())
            .collect();

        if let Weights::List(list) = weights {
            if list.len() != selected_names.len() {
                return Err(CompareError::InvalidWeights(format!(
                    "{} weights given for {} observations",
                    list.len(),
                    selected_names.len()
                )));
            }
        }

        let skill = self.skill(options)?;
        let metrics = skill.metrics().to_vec();
        let mut table = SkillTable::new(metrics.clone());

        for model in self.selected_models(options)? {
            let rows: Vec<&SkillRow> = skill.rows().iter().filter(|r| r.model == model).collect();
            if rows.is_empty() {
                continue;
            }

            let row_weights: Vec<f64> = rows
                .iter()
                .map(|row| {
                    let observation = row.observation.as_deref().unwrap_or_default();
                    match weights {
                        Weights::Equal => 1.0,
                        Weights::Points => row.n as f64,
                        Weights::List(list) => selected_names
                            .iter()
                            .position(|n| n == observation)
                            .map(|i| list[i])
                            .unwrap_or(1.0),
                        Weights::Map(map) => map.get(observation).copied().unwrap_or(1.0),
                    }
                })
                .collect();
            let total_weight: f64 = row_weights.iter().sum();

            let values = (0..metrics.len())
                .map(|column| {
                    rows.iter()
                        .zip(&row_weights)
                        .map(|(row, w)| row.values[column] * w)
                        .sum::<f64>()
                        / total_weight
                })
                .collect();

            table.push(SkillRow {
                model,
                observation: None,
                n: rows.iter().map(|r| r.n).sum(),
                values,
            });
        }

        Ok(table)
    }

    /// Metrics on all matched points pooled across observations, one row per model
    pub fn mean_skill_points(&self, options: &SkillOptions) -> Result<SkillTable> {
        let metrics = options.metrics();
        let comparers = self.selected(options)?;
        let mut table = SkillTable::new(metrics.clone());

        for model in self.selected_models(options)? {
            let mut obs = Vec::new();
            let mut values = Vec::new();

            for comparer in &comparers {
                if let Some(index) = comparer.mod_names().iter().position(|m| *m == model) {
                    obs.extend_from_slice(comparer.obs());
                    values.extend_from_slice(comparer.model(index).unwrap_or_default());
                }
            }

            if obs.is_empty() {
                continue;
            }

            table.push(SkillRow {
                model,
                observation: None,
                n: obs.len(),
                values: metrics.iter().map(|m| m.compute(&obs, &values)).collect(),
            });
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{compare, compare_models, CompareOptions};
    use crate::models::{ItemInfo, ModelResult, TimeSeriesTable};
    use chrono::NaiveDate;

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 10, 27)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::hours(h)
    }

    fn table(name: &str, hours: std::ops::Range<i64>, offset: f64) -> TimeSeriesTable {
        let time = hours.clone().map(hour).collect();
        let values = hours.map(|h| 1.0 + 0.1 * h as f64 + offset).collect();
        TimeSeriesTable::from_series(time, ItemInfo::new(name).with_unit("m"), values).unwrap()
    }

    fn collection() -> ComparerCollection {
        let model_a = ModelResult::from_table(&table("Hm0", 0..48, 0.1), None, Some("A".into()))
            .unwrap();
        let model_b = ModelResult::from_table(&table("Hm0", 0..48, -0.2), None, Some("B".into()))
            .unwrap();

        let mut collection = ComparerCollection::new();
        collection.add(
            compare_models(
                table("Hm0", 0..10, 0.0),
                &[model_a.clone(), model_b.clone()],
                &CompareOptions::new().with_obs_name("EPL"),
            )
            .unwrap(),
        );
        collection.add(
            compare_models(
                table("Hm0", 10..40, 0.05),
                &[model_a, model_b],
                &CompareOptions::new().with_obs_name("HKNA"),
            )
            .unwrap(),
        );
        collection
    }

    #[test]
    fn test_selection_resolution() {
        let names = vec!["EPL".to_string(), "HKNA".to_string()];
        assert_eq!(
            Selection::from(-1)
                .resolve(&names, SelectionKind::Observation)
                .unwrap(),
            1
        );
        assert!(matches!(
            Selection::from(2).resolve(&names, SelectionKind::Observation),
            Err(CompareError::SelectionOutOfRange { .. })
        ));
        assert!(matches!(
            Selection::from("c2").resolve(&names, SelectionKind::Model),
            Err(CompareError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_collection_skill_rows() {
        let collection = collection();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.mod_names(), vec!["A", "B"]);
        assert_eq!(collection.n_points(), 40);

        let options = SkillOptions::new().with_metrics(vec![Metric::Bias, Metric::Rmse]);
        let skill = collection.skill(&options).unwrap();

        assert_eq!(skill.len(), 4);
        assert_eq!(skill.get("A", Some("HKNA")).unwrap().n, 30);
        let bias = skill.value("B", Some("EPL"), Metric::Bias).unwrap();
        assert!((bias + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_skill_selection_errors() {
        let collection = collection();

        let options = SkillOptions::new().with_model("C");
        assert!(matches!(
            collection.skill(&options),
            Err(CompareError::UnknownModel(_))
        ));

        let options = SkillOptions::new().with_observations(vec!["Buoy".into()]);
        assert!(matches!(
            collection.skill(&options),
            Err(CompareError::UnknownObservation(_))
        ));

        let options = SkillOptions::new().with_model(5);
        assert!(matches!(
            collection.skill(&options),
            Err(CompareError::SelectionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_period_selection() {
        let collection = collection();
        let options = SkillOptions::new()
            .with_model("A")
            .with_start(hour(5))
            .with_end(hour(14));
        let skill = collection.skill(&options).unwrap();

        assert_eq!(skill.get("A", Some("EPL")).unwrap().n, 5);
        assert_eq!(skill.get("A", Some("HKNA")).unwrap().n, 5);
        assert!(skill.get("B", Some("EPL")).is_none());
    }

    #[test]
    fn test_mean_skill_weights() {
        // bias of A is 0.1 at EPL (10 points) and 0.05 at HKNA (30 points)
        let collection = collection();
        let options = SkillOptions::new().with_metrics(vec![Metric::Bias]);
        let bias = |table: &SkillTable, model: &str| table.value(model, None, Metric::Bias).unwrap();

        let equal = collection.mean_skill(&options, &Weights::Equal).unwrap();
        assert_eq!(equal.get("A", None).unwrap().n, 40);
        assert!((bias(&equal, "A") - 0.075).abs() < 1e-9);

        let points = collection.mean_skill(&options, &Weights::Points).unwrap();
        assert!((bias(&points, "B") + 0.2375).abs() < 1e-9);

        let list = collection
            .mean_skill(&options, &Weights::List(vec![1.0, 3.0]))
            .unwrap();
        assert!((bias(&list, "A") - 0.0625).abs() < 1e-9);

        let err = collection
            .mean_skill(&options, &Weights::List(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, CompareError::InvalidWeights(_)));

        let map = BTreeMap::from([("EPL".to_string(), 0.0)]);
        let hkna_only = collection.mean_skill(&options, &Weights::Map(map)).unwrap();
        assert_eq!(hkna_only.len(), 2);
        assert!((bias(&hkna_only, "A") - 0.05).abs() < 1e-9);
        assert!((bias(&hkna_only, "B") + 0.25).abs() < 1e-9);

        // EPL is missing from the map and falls back to 1.0
        let map = BTreeMap::from([("HKNA".to_string(), 3.0)]);
        let defaulted = collection.mean_skill(&options, &Weights::Map(map)).unwrap();
        assert!((bias(&defaulted, "A") - 0.0625).abs() < 1e-9);
    }

    #[test]
    fn test_mean_skill_points_pools_data() {
        let collection = collection();
        let options = SkillOptions::new().with_metrics(vec![Metric::Rmse]);
        let pooled = collection.mean_skill_points(&options).unwrap();

        let row = pooled.get("A", None).unwrap();
        assert_eq!(row.n, 40);
        let expected = ((10.0 * 0.1f64.powi(2) + 30.0 * 0.05f64.powi(2)) / 40.0).sqrt();
        assert!((row.values[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_add_replaces_same_observation() {
        let mut collection = collection();
        let comparer = compare(
            table("Hm0", 0..5, 0.0),
            table("Hm0", 0..5, 0.5),
            &CompareOptions::new().with_obs_name("EPL").with_mod_name("A"),
        )
        .unwrap();
        collection.add(comparer);

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get("EPL").unwrap().n_points(), 5);
    }

    #[test]
    fn test_skill_table_rendering() {
        let collection = collection();
        let skill = collection.skill(&SkillOptions::new()).unwrap();

        let text = skill.to_string();
        assert!(text.lines().next().unwrap().contains("urmse"));
        assert_eq!(text.lines().count(), 5);

        let json = skill.to_json().unwrap();
        assert!(json.contains("\"HKNA\""));
    }

    #[test]
    fn test_weights_from_str() {
        assert_eq!("Points".parse::<Weights>().unwrap(), Weights::Points);
        assert!("median".parse::<Weights>().is_err());
    }
}
