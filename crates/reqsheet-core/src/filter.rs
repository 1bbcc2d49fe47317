//! Per-column allow-list filters
//!
//! Each column is either unfiltered or has an allow-list of values (the
//! empty string stands for blank cells). Columns combine with AND, values
//! within one allow-list with OR. An allow-list that holds every known
//! value of its column is normalized back to "no filter".

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::column::ColumnId;
use crate::grid::GridModel;

/// Filter state for a grid, keyed by column identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilters {
    allow: AHashMap<ColumnId, BTreeSet<String>>,
}

impl ColumnFilters {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow-list for `column` (`None` = unfiltered)
    pub fn allow_list(&self, column: ColumnId) -> Option<&BTreeSet<String>> {
        self.allow.get(&column)
    }

    /// Check if `column` has a filter
    pub fn is_filtered(&self, column: ColumnId) -> bool {
        self.allow.contains_key(&column)
    }

    /// Check if any column has a filter
    pub fn is_active(&self) -> bool {
        !self.allow.is_empty()
    }

    /// Check if `value` passes the filter on `column`
    pub fn is_selected(&self, column: ColumnId, value: &str) -> bool {
        self.allow
            .get(&column)
            .map_or(true, |values| values.contains(value))
    }

    /// Check a row, read through `value_of`, against every filter
    fn passes<'a>(&self, mut value_of: impl FnMut(ColumnId) -> Option<&'a str>) -> bool {
        self.allow.iter().all(|(column, values)| match value_of(*column) {
            Some(v) => values.contains(v),
            // Filters on columns that no longer exist are ignored
            None => true,
        })
    }

    /// Replace the allow-list for `column`, normalizing against `all_known`
    pub fn set_allow_list(
        &mut self,
        column: ColumnId,
        values: BTreeSet<String>,
        all_known: &BTreeSet<String>,
    ) {
        if values == *all_known {
            self.allow.remove(&column);
        } else {
            self.allow.insert(column, values);
        }
    }

    /// Flip the membership of `value` in the allow-list of `column`
    ///
    /// An unfiltered column counts as "everything selected", so the first
    /// toggle deselects `value`.
    pub fn toggle_value(&mut self, column: ColumnId, value: &str, all_known: &BTreeSet<String>) {
        let mut values = self
            .allow
            .get(&column)
            .cloned()
            .unwrap_or_else(|| all_known.clone());

        if !values.remove(value) {
            values.insert(value.to_string());
        }
        self.set_allow_list(column, values, all_known);
    }

    /// Select or deselect every value currently displayed in the filter menu
    ///
    /// `displayed` is the search-narrowed subset of `all_known`. Selecting
    /// adds the displayed values to the allow-list and deselecting removes
    /// them; values outside `displayed` keep their current state.
    pub fn set_all_visible<S: AsRef<str>>(
        &mut self,
        column: ColumnId,
        displayed: &[S],
        all_known: &BTreeSet<String>,
        selected: bool,
    ) {
        let mut values = self
            .allow
            .get(&column)
            .cloned()
            .unwrap_or_else(|| all_known.clone());

        for value in displayed {
            if selected {
                values.insert(value.as_ref().to_string());
            } else {
                values.remove(value.as_ref());
            }
        }
        self.set_allow_list(column, values, all_known);
    }

    /// Check if every displayed value is selected (the "select all" box state)
    ///
    /// An empty display list is never "all selected".
    pub fn all_visible_selected<S: AsRef<str>>(&self, column: ColumnId, displayed: &[S]) -> bool {
        !displayed.is_empty() && displayed.iter().all(|v| self.is_selected(column, v.as_ref()))
    }

    /// Remove the filter on `column`
    pub fn clear(&mut self, column: ColumnId) {
        self.allow.remove(&column);
    }

    /// Remove every filter
    pub fn clear_all(&mut self) {
        self.allow.clear();
    }
}

/// Indices of the rows of `grid` that pass `filters`, in display order
pub fn visible_rows(grid: &GridModel, filters: &ColumnFilters) -> Vec<usize> {
    if !filters.is_active() {
        return (0..grid.row_count()).collect();
    }

    grid.rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            filters.passes(|column| grid.has_column_id(column).then(|| row.get(column)))
        })
        .map(|(index, _)| index)
        .collect()
}

/// Values of `all_known` containing `query`, ignoring case
///
/// An empty or whitespace-only query matches everything.
pub fn search_values<'a>(all_known: &'a BTreeSet<String>, query: &str) -> Vec<&'a str> {
    let needle = query.trim().to_lowercase();
    all_known
        .iter()
        .filter(|value| needle.is_empty() || value.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}
