use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CompareError, Result};

/// A named data column of a time-series table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub name: String,
    pub unit: Option<String>,
}

impl ItemInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Parse a column header such as `Hm0 [m]` into name and unit
    pub fn from_header(header: &str) -> Self {
        let header = header.trim();
        if let Some(open) = header.rfind('[') {
            if let Some(inner) = header[open + 1..].strip_suffix(']') {
                let name = header[..open].trim();
                let unit = inner.trim();
                if !name.is_empty() && !unit.is_empty() {
                    return Self::new(name).with_unit(unit);
                }
            }
        }
        Self::new(header)
    }

    /// Header form used when writing tables back out
    pub fn header(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} [{}]", self.name, unit),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ItemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// Selects an item either by position or by name.
///
/// Negative indices count from the end, so `Index(-1)` is the last item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemSelector {
    Index(i64),
    Name(String),
}

impl ItemSelector {
    /// Parse a command-line value: integers select by position, anything else by name
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<i64>() {
            Ok(index) => ItemSelector::Index(index),
            Err(_) => ItemSelector::Name(value.trim().to_string()),
        }
    }
}

impl fmt::Display for ItemSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemSelector::Index(index) => write!(f, "{}", index),
            ItemSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for ItemSelector {
    fn from(index: i64) -> Self {
        ItemSelector::Index(index)
    }
}

impl From<i32> for ItemSelector {
    fn from(index: i32) -> Self {
        ItemSelector::Index(index as i64)
    }
}

impl From<usize> for ItemSelector {
    fn from(index: usize) -> Self {
        ItemSelector::Index(index as i64)
    }
}

impl From<&str> for ItemSelector {
    fn from(name: &str) -> Self {
        ItemSelector::Name(name.to_string())
    }
}

impl From<String> for ItemSelector {
    fn from(name: String) -> Self {
        ItemSelector::Name(name)
    }
}

/// Resolve a selector to a column index of `items`.
///
/// Without a selector a single-item source resolves to that item; a
/// multi-item source is ambiguous and must be selected explicitly.
pub fn resolve_item(
    items: &[ItemInfo],
    selector: Option<&ItemSelector>,
    source_name: &str,
) -> Result<usize> {
    let n_items = items.len();
    if n_items == 0 {
        return Err(CompareError::InvalidFormat(format!(
            "{} contains no items",
            source_name
        )));
    }

    match selector {
        None if n_items == 1 => Ok(0),
        None => Err(CompareError::AmbiguousItem {
            source_name: source_name.to_string(),
            items: items.iter().map(|i| i.name.clone()).collect(),
        }),
        Some(ItemSelector::Index(index)) => normalize_index(*index, n_items),
        Some(ItemSelector::Name(name)) => items
            .iter()
            .position(|i| &i.name == name)
            .ok_or_else(|| CompareError::ItemNotFound {
                name: name.clone(),
                available: items.iter().map(|i| i.name.clone()).collect(),
            }),
    }
}

/// Map a possibly negative index onto `[0, n_items)`
pub fn normalize_index(index: i64, n_items: usize) -> Result<usize> {
    let resolved = if index < 0 {
        n_items as i64 + index
    } else {
        index
    };

    if resolved < 0 || resolved >= n_items as i64 {
        return Err(CompareError::ItemOutOfRange { index, n_items });
    }

    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<ItemInfo> {
        names.iter().map(|n| ItemInfo::new(*n)).collect()
    }

    #[test]
    fn test_header_parsing() {
        let item = ItemInfo::from_header("Hm0 [m]");
        assert_eq!(item.name, "Hm0");
        assert_eq!(item.unit.as_deref(), Some("m"));
        assert_eq!(item.header(), "Hm0 [m]");

        let item = ItemInfo::from_header("  Quality ");
        assert_eq!(item.name, "Quality");
        assert_eq!(item.unit, None);

        // Brackets without a name are kept verbatim
        let item = ItemInfo::from_header("[m]");
        assert_eq!(item.name, "[m]");
    }

    #[test]
    fn test_single_item_needs_no_selector() {
        let items = items(&["Hm0"]);
        assert_eq!(resolve_item(&items, None, "obs").unwrap(), 0);
        assert_eq!(
            resolve_item(&items, Some(&ItemSelector::Index(0)), "obs").unwrap(),
            0
        );
    }

    #[test]
    fn test_single_item_rejects_wrong_index() {
        let items = items(&["Hm0"]);
        let err = resolve_item(&items, Some(&ItemSelector::Index(1)), "obs").unwrap_err();
        assert!(matches!(
            err,
            CompareError::ItemOutOfRange {
                index: 1,
                n_items: 1
            }
        ));
    }

    #[test]
    fn test_multiple_items_are_ambiguous() {
        let items = items(&["Hm0", "Tp", "Mwd"]);
        let err = resolve_item(&items, None, "model").unwrap_err();
        assert!(matches!(err, CompareError::AmbiguousItem { .. }));
    }

    #[test]
    fn test_negative_and_named_selectors() {
        let items = items(&["Hm0", "Tp", "Mwd"]);
        assert_eq!(
            resolve_item(&items, Some(&ItemSelector::Index(-1)), "m").unwrap(),
            2
        );
        assert_eq!(resolve_item(&items, Some(&ItemSelector::from("Tp")), "m").unwrap(), 1);
        assert!(matches!(
            resolve_item(&items, Some(&ItemSelector::Index(-4)), "m"),
            Err(CompareError::ItemOutOfRange { .. })
        ));
        assert!(matches!(
            resolve_item(&items, Some(&ItemSelector::from("Hs")), "m"),
            Err(CompareError::ItemNotFound { .. })
        ));
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!(ItemSelector::parse("0"), ItemSelector::Index(0));
        assert_eq!(ItemSelector::parse("-2"), ItemSelector::Index(-2));
        assert_eq!(ItemSelector::parse("Hm0"), ItemSelector::Name("Hm0".into()));
    }

    #[test]
    fn test_empty_items() {
        assert!(matches!(
            resolve_item(&[], None, "empty.csv"),
            Err(CompareError::InvalidFormat(_))
        ));
    }
}
