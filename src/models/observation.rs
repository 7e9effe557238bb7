use chrono::NaiveDateTime;
use std::path::Path;

use crate::error::{CompareError, Result};
use crate::models::item::{resolve_item, ItemInfo, ItemSelector};
use crate::models::table::{TimeSeries, TimeSeriesTable};
use crate::readers::read_table;

/// One item picked out of a source table, fixed once resolved
#[derive(Debug, Clone)]
struct ResolvedItem {
    source: String,
    item_names: Vec<String>,
    index: usize,
    info: ItemInfo,
    series: TimeSeries,
}

impl ResolvedItem {
    fn from_table(
        table: &TimeSeriesTable,
        selector: Option<&ItemSelector>,
        source: String,
    ) -> Result<Self> {
        let index = resolve_item(table.items(), selector, &source)?;
        let series = table.series(index).ok_or_else(|| {
            CompareError::InvalidFormat(format!("{} has no column {}", source, index))
        })?;

        Ok(Self {
            source,
            item_names: table.item_names(),
            index,
            info: table.items()[index].clone(),
            series,
        })
    }

    /// A later selector is accepted only if it picks the same item
    fn check_selector(&self, selector: &ItemSelector) -> Result<()> {
        let items: Vec<ItemInfo> = self.item_names.iter().map(ItemInfo::new).collect();
        let requested = resolve_item(&items, Some(selector), &self.source)?;

        if requested != self.index {
            return Err(CompareError::ItemConflict {
                requested: format!("{} ({})", selector, self.item_names[requested]),
                selected: format!("{} ({})", self.index, self.info.name),
            });
        }

        Ok(())
    }
}

/// Default display name for a file source: the file name up to the first '.'
fn name_from_path(path: &Path) -> String {
    path.file_name()
        .and_then(|f| f.to_str())
        .and_then(|f| f.split('.').next())
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Measured time series used as the reference of a comparison
#[derive(Debug, Clone)]
pub struct Observation {
    name: String,
    resolved: ResolvedItem,
}

impl Observation {
    /// Load an observation from a CSV or Parquet file.
    ///
    /// `name` defaults to the file name without extension.
    pub fn from_path(
        path: impl AsRef<Path>,
        item: Option<ItemSelector>,
        name: Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let table = read_table(path)?;
        let resolved = ResolvedItem::from_table(&table, item.as_ref(), path.display().to_string())?;
        let name = name.unwrap_or_else(|| name_from_path(path));

        tracing::debug!(
            "Observation '{}' uses item {} '{}' from {} ({} values)",
            name,
            resolved.index,
            resolved.info.name,
            resolved.source,
            resolved.series.len()
        );

        Ok(Self { name, resolved })
    }

    /// Wrap an in-memory table. `name` defaults to the selected item's name.
    pub fn from_table(
        table: &TimeSeriesTable,
        item: Option<ItemSelector>,
        name: Option<String>,
    ) -> Result<Self> {
        let resolved = ResolvedItem::from_table(table, item.as_ref(), "observation table".into())?;
        let name = name.unwrap_or_else(|| resolved.info.name.clone());
        Ok(Self { name, resolved })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.resolved.source
    }

    pub fn item(&self) -> &ItemInfo {
        &self.resolved.info
    }

    pub fn item_index(&self) -> usize {
        self.resolved.index
    }

    pub fn series(&self) -> &TimeSeries {
        &self.resolved.series
    }

    pub fn n_points(&self) -> usize {
        self.resolved.series.len()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.resolved.series.start()
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.resolved.series.end()
    }

    /// Fail if `selector` picks a different item than the one already resolved
    pub fn check_selector(&self, selector: &ItemSelector) -> Result<()> {
        self.resolved.check_selector(selector)
    }
}

/// Simulated time series evaluated against observations
#[derive(Debug, Clone)]
pub struct ModelResult {
    name: String,
    resolved: ResolvedItem,
}

impl ModelResult {
    /// Load a model result from a CSV or Parquet file.
    ///
    /// `name` defaults to the name of the selected item.
    pub fn from_path(
        path: impl AsRef<Path>,
        item: Option<ItemSelector>,
        name: Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let table = read_table(path)?;
        let resolved = ResolvedItem::from_table(&table, item.as_ref(), path.display().to_string())?;
        let name = name.unwrap_or_else(|| resolved.info.name.clone());

        tracing::debug!(
            "Model result '{}' uses item {} '{}' from {} ({} values)",
            name,
            resolved.index,
            resolved.info.name,
            resolved.source,
            resolved.series.len()
        );

        Ok(Self { name, resolved })
    }

    pub fn from_table(
        table: &TimeSeriesTable,
        item: Option<ItemSelector>,
        name: Option<String>,
    ) -> Result<Self> {
        let resolved = ResolvedItem::from_table(table, item.as_ref(), "model table".into())?;
        let name = name.unwrap_or_else(|| resolved.info.name.clone());
        Ok(Self { name, resolved })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.resolved.source
    }

    pub fn item(&self) -> &ItemInfo {
        &self.resolved.info
    }

    pub fn item_index(&self) -> usize {
        self.resolved.index
    }

    pub fn series(&self) -> &TimeSeries {
        &self.resolved.series
    }

    pub fn check_selector(&self, selector: &ItemSelector) -> Result<()> {
        self.resolved.check_selector(selector)
    }
}
