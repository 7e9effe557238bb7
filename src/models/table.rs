use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CompareError, Result};
use crate::models::item::{resolve_item, ItemInfo, ItemSelector};

/// A timestamp index with one or more numeric columns (items).
///
/// Missing values are stored as `NaN`. Rows are kept sorted by time and
/// timestamps are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableColumns")]
pub struct TimeSeriesTable {
    time: Vec<NaiveDateTime>,
    items: Vec<ItemInfo>,
    values: Vec<Vec<f64>>,
}

/// Unchecked serialized form, validated through `TimeSeriesTable::new`
#[derive(Deserialize)]
struct TableColumns {
    time: Vec<NaiveDateTime>,
    items: Vec<ItemInfo>,
    values: Vec<Vec<f64>>,
}

impl TryFrom<TableColumns> for TimeSeriesTable {
    type Error = CompareError;

    fn try_from(columns: TableColumns) -> Result<Self> {
        Self::new(columns.time, columns.items, columns.values)
    }
}

impl TimeSeriesTable {
    pub fn new(
        time: Vec<NaiveDateTime>,
        items: Vec<ItemInfo>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if items.len() != values.len() {
            return Err(CompareError::InvalidFormat(format!(
                "{} items but {} value columns",
                items.len(),
                values.len()
            )));
        }

        for (item, column) in items.iter().zip(&values) {
            if column.len() != time.len() {
                return Err(CompareError::InvalidFormat(format!(
                    "Item '{}' has {} values but the time index has {}",
                    item.name,
                    column.len(),
                    time.len()
                )));
            }
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.name.as_str()) {
                return Err(CompareError::InvalidFormat(format!(
                    "Duplicate item name '{}'",
                    item.name
                )));
            }
        }

        let mut table = Self {
            time,
            items,
            values,
        };
        table.sort_by_time()?;
        Ok(table)
    }

    /// Build a single-item table from a time index and values
    pub fn from_series(
        time: Vec<NaiveDateTime>,
        item: ItemInfo,
        values: Vec<f64>,
    ) -> Result<Self> {
        Self::new(time, vec![item], vec![values])
    }

    fn sort_by_time(&mut self) -> Result<()> {
        let sorted = self.time.windows(2).all(|w| w[0] < w[1]);
        if !sorted {
            let mut order: Vec<usize> = (0..self.time.len()).collect();
            order.sort_by_key(|&i| self.time[i]);

            self.time = order.iter().map(|&i| self.time[i]).collect();
            for column in &mut self.values {
                *column = order.iter().map(|&i| column[i]).collect();
            }
        }

        if let Some(w) = self.time.windows(2).find(|w| w[0] == w[1]) {
            return Err(CompareError::InvalidFormat(format!(
                "Duplicate timestamp {}",
                w[0]
            )));
        }

        Ok(())
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    pub fn items(&self) -> &[ItemInfo] {
        &self.items
    }

    pub fn item_names(&self) -> Vec<String> {
        self.items.iter().map(|i| i.name.clone()).collect()
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.values.get(index).map(|c| c.as_slice())
    }

    pub fn n_rows(&self) -> usize {
        self.time.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.time.first().copied()
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.time.last().copied()
    }

    /// Restrict the table to the selected items, in selector order
    pub fn select_items(&self, selectors: &[ItemSelector]) -> Result<Self> {
        let mut items = Vec::with_capacity(selectors.len());
        let mut values = Vec::with_capacity(selectors.len());

        for selector in selectors {
            let index = resolve_item(&self.items, Some(selector), "table")?;
            items.push(self.items[index].clone());
            values.push(self.values[index].clone());
        }

        Self::new(self.time.clone(), items, values)
    }

    /// Extract one column as a series, dropping missing values
    pub fn series(&self, index: usize) -> Option<TimeSeries> {
        let column = self.values.get(index)?;
        let (time, values) = self
            .time
            .iter()
            .zip(column)
            .filter(|(_, v)| !v.is_nan())
            .map(|(t, v)| (*t, *v))
            .unzip();

        Some(TimeSeries { time, values })
    }
}

/// A single resolved column, sorted by time, without missing values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    pub time: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.time.first().copied()
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.time.last().copied()
    }
}
