//! The editable grid
//!
//! [`GridModel`] owns the ordered column list, the ordered row list and the
//! formatting records of one grid. Cells are addressed positionally by
//! `(row index, column name)`; internally every row and column carries a
//! stable id, so formatting follows its logical row through inserts,
//! deletes and sorts.
//!
//! Every mutation is all-or-nothing: an operation that returns an error
//! leaves the grid exactly as it was.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use regex::{NoExpand, RegexBuilder};

use crate::column::{Column, ColumnId};
use crate::error::{Error, Result};
use crate::filter::{self, ColumnFilters};
use crate::format::{number_to_cell_string, numeric_value, CellFormat, CellFormatStore, CellKey};
use crate::paste::{self, DEFAULT_COLUMN_PREFIX};
use crate::row::{Provenance, Row, RowId};

/// Options for a grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridOptions {
    /// Editable grids never become empty: deleting the last rows leaves one
    /// blank row behind
    pub editable: bool,
    /// Prefix for columns created by a paste ("Column 3")
    pub column_prefix: String,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            editable: true,
            column_prefix: DEFAULT_COLUMN_PREFIX.to_string(),
        }
    }
}

impl GridOptions {
    /// Create default options (editable, "Column" prefix)
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a read-only grid
    pub fn read_only() -> Self {
        Self {
            editable: false,
            ..Self::default()
        }
    }

    /// Set the prefix for synthesized column names
    pub fn with_column_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.column_prefix = prefix.into();
        self
    }
}

/// Sort orders for [`GridModel::sort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortOrder {
    /// A to Z, case-insensitive
    LexicalAscending,
    /// Z to A, case-insensitive
    LexicalDescending,
    /// Smallest first; non-numbers count as 0
    NumericAscending,
    /// Largest first; non-numbers count as 0
    NumericDescending,
}

/// What a paste did to the grid
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasteOutcome {
    /// Rows appended to fit the pasted block
    pub rows_added: usize,
    /// Columns appended to fit the pasted block
    pub columns_added: Vec<String>,
    /// Cells written
    pub cells_written: usize,
    /// The text was a single value written as a plain assignment
    pub single_cell: bool,
}

/// Rows, columns and formatting of one editable grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridModel {
    options: GridOptions,
    columns: Vec<Column>,
    rows: Vec<Row>,
    formats: CellFormatStore,
    next_row_id: u64,
    next_column_id: u64,
}

impl Default for GridModel {
    fn default() -> Self {
        Self::new(GridOptions::default())
    }
}

impl GridModel {
    /// Create an empty grid
    pub fn new(options: GridOptions) -> Self {
        Self {
            options,
            columns: Vec::new(),
            rows: Vec::new(),
            formats: CellFormatStore::new(),
            next_row_id: 0,
            next_column_id: 0,
        }
    }

    /// Create an editable grid with the given columns and no rows
    pub fn with_columns<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grid = Self::default();
        for name in names {
            grid.add_column(name)?;
        }
        Ok(grid)
    }

    /// Grid options
    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    /// Check if the grid is editable
    pub fn is_editable(&self) -> bool {
        self.options.editable
    }

    // === Columns ===

    /// Columns in display order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in display order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if a column with this name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    /// Check if a column with this id exists
    pub fn has_column_id(&self, id: ColumnId) -> bool {
        self.columns.iter().any(|c| c.id() == id)
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Identity of a column
    pub fn column_id(&self, name: &str) -> Result<ColumnId> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .map(Column::id)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Column with the given identity
    pub fn column_by_id(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id() == id)
    }

    /// Append a column, back-filling every row with ""
    pub fn add_column(&mut self, name: impl Into<String>) -> Result<ColumnId> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(Error::DuplicateColumn(name));
        }
        Ok(self.append_column(name))
    }

    fn append_column(&mut self, name: String) -> ColumnId {
        let id = ColumnId(self.next_column_id);
        self.next_column_id += 1;

        for row in &mut self.rows {
            row.set(id, "");
        }
        self.columns.push(Column::new(id, name));
        id
    }

    /// Rename a column, keeping its data, formatting and filters
    pub fn rename_column(&mut self, old: &str, new: impl Into<String>) -> Result<()> {
        let new = new.into();
        let index = self
            .column_index(old)
            .ok_or_else(|| Error::UnknownColumn(old.to_string()))?;
        if old == new {
            return Ok(());
        }
        if self.has_column(&new) {
            return Err(Error::DuplicateColumn(new));
        }
        self.columns[index].set_name(new);
        Ok(())
    }

    /// Remove a column, its values in every row and its formatting
    pub fn delete_column(&mut self, name: &str) -> Result<()> {
        let index = self
            .column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
        let column = self.columns.remove(index);

        for row in &mut self.rows {
            row.remove(column.id());
        }
        let dropped = self.formats.remove_column(column.id());
        log::debug!(
            "deleted column '{}' ({} format records dropped)",
            column.name(),
            dropped
        );
        Ok(())
    }

    // === Rows ===

    /// Rows in display order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the grid has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `index`
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Identity of the row at `index`
    pub fn row_id(&self, index: usize) -> Result<RowId> {
        self.check_row(index)?;
        Ok(self.rows[index].id())
    }

    /// Current position of a row
    pub fn row_index(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id() == id)
    }

    /// Values of the row at `index` as `(column name, value)` pairs in column order
    pub fn record_at(&self, index: usize) -> Option<Vec<(&str, &str)>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .map(|c| (c.name(), row.get(c.id())))
                .collect(),
        )
    }

    /// Append a row from `(column name, value)` pairs
    ///
    /// Columns not mentioned are blank. An unknown column name fails the
    /// whole call.
    pub fn push_record<I, K, V>(&mut self, values: I, provenance: Option<Provenance>) -> Result<RowId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let resolved = values
            .into_iter()
            .map(|(name, value)| Ok((self.column_id(name.as_ref())?, value.into())))
            .collect::<Result<Vec<(ColumnId, String)>>>()?;

        let mut row = self.blank_row();
        for (column, value) in resolved {
            row.set(column, value);
        }
        row.set_provenance(provenance);
        let id = row.id();
        self.rows.push(row);
        Ok(id)
    }

    /// Insert a blank row at `at` (default: end)
    ///
    /// Formatting of existing rows stays with those rows.
    pub fn add_row(&mut self, at: Option<usize>) -> Result<RowId> {
        let index = at.unwrap_or(self.rows.len());
        if index > self.rows.len() {
            return Err(Error::invalid_row(index, self.rows.len()));
        }
        let row = self.blank_row();
        let id = row.id();
        self.rows.insert(index, row);
        Ok(id)
    }

    /// Delete the rows at `indices`, returning how many were removed
    ///
    /// Any index out of range fails the whole call. An editable grid left
    /// without rows gets one blank row.
    pub fn delete_rows(&mut self, indices: &[usize]) -> Result<usize> {
        let doomed: BTreeSet<usize> = indices.iter().copied().collect();
        if let Some(&bad) = doomed.iter().find(|&&i| i >= self.rows.len()) {
            return Err(Error::invalid_row(bad, self.rows.len()));
        }
        if doomed.is_empty() {
            return Ok(0);
        }

        let mut position = 0;
        let mut removed = Vec::with_capacity(doomed.len());
        self.rows.retain(|row| {
            let keep = !doomed.contains(&position);
            if !keep {
                removed.push(row.id());
            }
            position += 1;
            keep
        });
        for id in &removed {
            self.formats.remove_row(*id);
        }

        if self.rows.is_empty() && self.options.editable {
            let row = self.blank_row();
            self.rows.push(row);
        }
        Ok(removed.len())
    }

    fn blank_row(&mut self) -> Row {
        let mut row = Row::new(RowId(self.next_row_id));
        self.next_row_id += 1;
        for column in &self.columns {
            row.set(column.id(), "");
        }
        row
    }

    // === Cells ===

    /// Value at (`row`, `column`)
    pub fn get(&self, row: usize, column: &str) -> Result<&str> {
        let key = self.key(row, column)?;
        Ok(self.rows[row].get(key.column))
    }

    /// Value at (`row`, `column`) as shown under its effective number format
    pub fn display_value(&self, row: usize, column: &str) -> Result<String> {
        let key = self.key(row, column)?;
        Ok(self.formats.effective(key).display(self.rows[row].get(key.column)))
    }

    /// Replace the value at (`row`, `column`)
    pub fn set_cell(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<()> {
        let key = self.key(row, column)?;
        self.rows[row].set(key.column, value);
        Ok(())
    }

    /// Blank the cell and delete its formatting record
    pub fn clear_contents(&mut self, row: usize, column: &str) -> Result<()> {
        let key = self.key(row, column)?;
        self.rows[row].set(key.column, "");
        self.formats.clear(key);
        Ok(())
    }

    /// Stable key of the cell at (`row`, `column`)
    pub fn key(&self, row: usize, column: &str) -> Result<CellKey> {
        let column = self.column_id(column)?;
        let row = self.row_id(row)?;
        Ok(CellKey::new(row, column))
    }

    /// Current (row index, column name) of a stable key
    pub fn position_of(&self, key: CellKey) -> Option<(usize, &str)> {
        let row = self.row_index(key.row)?;
        let column = self.column_by_id(key.column)?;
        Some((row, column.name()))
    }

    fn check_row(&self, index: usize) -> Result<()> {
        if index < self.rows.len() {
            Ok(())
        } else {
            Err(Error::invalid_row(index, self.rows.len()))
        }
    }

    // === Bulk operations ===

    /// Reorder rows by the values of `column`
    ///
    /// Stable: rows with equal keys keep their relative order.
    pub fn sort(&mut self, column: &str, order: SortOrder) -> Result<()> {
        let col = self.column_id(column)?;

        match order {
            SortOrder::LexicalAscending => {
                self.rows.sort_by(|a, b| compare_text(a.get(col), b.get(col)))
            }
            SortOrder::LexicalDescending => {
                self.rows.sort_by(|a, b| compare_text(b.get(col), a.get(col)))
            }
            SortOrder::NumericAscending => {
                self.rows.sort_by(|a, b| compare_numeric(a.get(col), b.get(col)))
            }
            SortOrder::NumericDescending => {
                self.rows.sort_by(|a, b| compare_numeric(b.get(col), a.get(col)))
            }
        }
        log::debug!("sorted {} rows by '{}' ({:?})", self.rows.len(), column, order);
        Ok(())
    }

    /// Replace every occurrence of `find` in every cell
    ///
    /// Returns the number of cells changed. With `match_case` false the
    /// match ignores case. An empty `find` changes nothing.
    pub fn find_replace(&mut self, find: &str, replace: &str, match_case: bool) -> usize {
        if find.is_empty() {
            return 0;
        }

        let matcher = if match_case {
            None
        } else {
            match RegexBuilder::new(&regex::escape(find))
                .case_insensitive(true)
                .build()
            {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("find text rejected by matcher: {}", e);
                    return 0;
                }
            }
        };

        let columns: Vec<ColumnId> = self.columns.iter().map(Column::id).collect();
        let mut touched = 0;
        for row in &mut self.rows {
            for &column in &columns {
                let Some(value) = row.get_mut(column) else {
                    continue;
                };
                let replaced = match &matcher {
                    Some(re) if re.is_match(value) => {
                        re.replace_all(value, NoExpand(replace)).into_owned()
                    }
                    None if value.contains(find) => value.replace(find, replace),
                    _ => continue,
                };
                *value = replaced;
                touched += 1;
            }
        }
        touched
    }

    /// Copy the value at `from_row` into every later row of `column`
    ///
    /// Returns the number of rows written.
    pub fn fill_down(&mut self, column: &str, from_row: usize) -> Result<usize> {
        let key = self.key(from_row, column)?;
        let value = self.rows[from_row].get(key.column).to_string();

        let targets = &mut self.rows[from_row + 1..];
        for row in targets.iter_mut() {
            row.set(key.column, value.clone());
        }
        Ok(targets.len())
    }

    /// Append a row holding the sum of `column`
    ///
    /// Non-numeric values count as 0. The new row is blank except for the
    /// sum, stored as the shortest decimal string of the result. A sum
    /// beyond `f64` range is [`Error::NumericOverflow`] and adds nothing.
    pub fn auto_sum(&mut self, column: &str) -> Result<RowId> {
        let col = self.column_id(column)?;
        let sum: f64 = self.rows.iter().map(|r| numeric_value(r.get(col))).sum();
        if !sum.is_finite() {
            return Err(Error::NumericOverflow(column.to_string()));
        }

        let mut row = self.blank_row();
        row.set(col, number_to_cell_string(sum));
        let id = row.id();
        self.rows.push(row);
        Ok(id)
    }

    /// Paste clipboard text with its top-left cell at (`anchor_row`, `anchor_column`)
    ///
    /// A single value is a plain cell write. A block grows the grid as
    /// needed (new rows at the end, new columns named from the grid's
    /// column prefix) and then writes every cell.
    pub fn apply_paste(
        &mut self,
        anchor_row: usize,
        anchor_column: &str,
        text: &str,
    ) -> Result<PasteOutcome> {
        let anchor = self.key(anchor_row, anchor_column)?;
        let block = paste::parse(text);

        if paste::is_single_cell(&block) {
            self.rows[anchor_row].set(anchor.column, block[0][0].clone());
            return Ok(PasteOutcome {
                cells_written: 1,
                single_cell: true,
                ..PasteOutcome::default()
            });
        }

        let anchor_col = self
            .columns
            .iter()
            .position(|c| c.id() == anchor.column)
            .ok_or(Error::StaleReference)?;
        let plan = paste::plan_growth_with_prefix(
            &block,
            anchor_row,
            anchor_col,
            self.rows.len(),
            &self.column_names(),
            &self.options.column_prefix,
        );

        for name in &plan.new_columns {
            self.append_column(name.clone());
        }
        let rows_added = plan.rows_needed.saturating_sub(self.rows.len());
        for _ in 0..rows_added {
            let row = self.blank_row();
            self.rows.push(row);
        }

        let mut cells_written = 0;
        for (r, line) in block.iter().enumerate() {
            let row = &mut self.rows[anchor_row + r];
            for (c, value) in line.iter().enumerate() {
                row.set(self.columns[anchor_col + c].id(), value.clone());
                cells_written += 1;
            }
        }

        Ok(PasteOutcome {
            rows_added,
            columns_added: plan.new_columns,
            cells_written,
            single_cell: false,
        })
    }

    // === Formatting ===

    /// All formatting records
    pub fn formats(&self) -> &CellFormatStore {
        &self.formats
    }

    /// Stored format of a cell (empty when none)
    pub fn format_at(&self, row: usize, column: &str) -> Result<CellFormat> {
        Ok(self.formats.get(self.key(row, column)?))
    }

    /// Column format overlaid with the cell format
    pub fn effective_format_at(&self, row: usize, column: &str) -> Result<CellFormat> {
        Ok(self.formats.effective(self.key(row, column)?))
    }

    /// Merge `patch` into the format of a cell
    pub fn merge_format(&mut self, row: usize, column: &str, patch: &CellFormat) -> Result<()> {
        let key = self.key(row, column)?;
        self.formats.merge(key, patch);
        Ok(())
    }

    /// Merge `patch` into the format of the cell identified by `key`
    pub fn merge_format_key(&mut self, key: CellKey, patch: &CellFormat) -> Result<()> {
        if self.position_of(key).is_none() {
            return Err(Error::StaleReference);
        }
        self.formats.merge(key, patch);
        Ok(())
    }

    /// Remove a cell's format record, returning it
    pub fn clear_format(&mut self, row: usize, column: &str) -> Result<Option<CellFormat>> {
        let key = self.key(row, column)?;
        Ok(self.formats.clear(key))
    }

    /// Column-level format, if any
    pub fn column_format(&self, column: &str) -> Result<Option<&CellFormat>> {
        Ok(self.formats.column_format(self.column_id(column)?))
    }

    /// Replace the column-level format (an empty record removes it)
    pub fn set_column_format(&mut self, column: &str, format: CellFormat) -> Result<()> {
        let id = self.column_id(column)?;
        self.formats.set_column_format(id, format);
        Ok(())
    }

    // === Derived views ===

    /// Distinct values of `column` ("" stands for blank cells)
    pub fn distinct_values(&self, column: &str) -> Result<BTreeSet<String>> {
        let col = self.column_id(column)?;
        Ok(self.rows.iter().map(|r| r.get(col).to_string()).collect())
    }

    /// Indices of the rows that pass `filters`
    pub fn visible_rows(&self, filters: &ColumnFilters) -> Vec<usize> {
        filter::visible_rows(self, filters)
    }
}

/// Locale-style text ordering
///
/// Case-insensitive first; on a tie the first differing character decides,
/// with lowercase before uppercase.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    folded.then_with(|| {
        for (x, y) in a.chars().zip(b.chars()) {
            if x != y {
                return match (x.is_lowercase(), y.is_lowercase()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => x.cmp(&y),
                };
            }
        }
        a.len().cmp(&b.len())
    })
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    numeric_value(a)
        .partial_cmp(&numeric_value(b))
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::NumberFormat;
    use pretty_assertions::assert_eq;

    fn grid(columns: &[&str], rows: &[&[&str]]) -> GridModel {
        let mut grid = GridModel::with_columns(columns.iter().copied()).unwrap();
        for values in rows {
            grid.push_record(columns.iter().copied().zip(values.iter().copied()), None)
                .unwrap();
        }
        grid
    }

    fn column_values(grid: &GridModel, column: &str) -> Vec<String> {
        (0..grid.row_count())
            .map(|r| grid.get(r, column).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_set_cell_strict() {
        let mut g = grid(&["A"], &[&["1"]]);
        g.set_cell(0, "A", "2").unwrap();
        assert_eq!(g.get(0, "A").unwrap(), "2");

        assert_eq!(
            g.set_cell(1, "A", "x"),
            Err(Error::InvalidCoordinate { index: 1, len: 1 })
        );
        assert_eq!(
            g.set_cell(0, "B", "x"),
            Err(Error::UnknownColumn("B".into()))
        );
        assert_eq!(g.get(0, "A").unwrap(), "2");
    }

    #[test]
    fn test_add_row_blank_and_positioned() {
        let mut g = grid(&["A", "B"], &[&["1", "2"], &["3", "4"]]);
        g.add_row(Some(1)).unwrap();
        assert_eq!(column_values(&g, "A"), vec!["1", "", "3"]);
        assert!(g.row(1).unwrap().contains(g.column_id("B").unwrap()));

        g.add_row(None).unwrap();
        assert_eq!(g.row_count(), 4);
        assert!(g.add_row(Some(9)).is_err());
        assert_eq!(g.row_count(), 4);
    }

    #[test]
    fn test_formatting_follows_row_on_insert() {
        let mut g = grid(&["A"], &[&["x"], &["y"]]);
        g.merge_format(1, "A", &CellFormat::new().bold(true)).unwrap();

        g.add_row(Some(0)).unwrap();
        assert_eq!(g.format_at(2, "A").unwrap().bold, Some(true));
        assert!(g.format_at(1, "A").unwrap().is_empty());
    }

    #[test]
    fn test_delete_rows() {
        let mut g = grid(&["A"], &[&["0"], &["1"], &["2"], &["3"]]);
        g.merge_format(3, "A", &CellFormat::new().italic(true)).unwrap();
        g.merge_format(1, "A", &CellFormat::new().bold(true)).unwrap();

        assert_eq!(g.delete_rows(&[1, 2, 1]).unwrap(), 2);
        assert_eq!(column_values(&g, "A"), vec!["0", "3"]);
        assert_eq!(g.format_at(1, "A").unwrap().italic, Some(true));
        assert_eq!(g.formats().len(), 1);
    }

    #[test]
    fn test_delete_rows_out_of_range_is_atomic() {
        let mut g = grid(&["A"], &[&["0"], &["1"]]);
        let before = g.clone();
        assert_eq!(
            g.delete_rows(&[0, 5]),
            Err(Error::InvalidCoordinate { index: 5, len: 2 })
        );
        assert_eq!(g, before);
    }

    #[test]
    fn test_delete_all_rows_editable_synthesizes_blank() {
        let mut g = grid(&["A", "B"], &[&["0", "1"]]);
        g.delete_rows(&[0]).unwrap();
        assert_eq!(g.row_count(), 1);
        assert_eq!(g.record_at(0).unwrap(), vec![("A", ""), ("B", "")]);

        let mut ro = GridModel::new(GridOptions::read_only());
        ro.add_column("A").unwrap();
        ro.add_row(None).unwrap();
        ro.delete_rows(&[0]).unwrap();
        assert!(ro.is_empty());
    }

    #[test]
    fn test_add_column_backfills_and_rejects_duplicates() {
        let mut g = grid(&["A"], &[&["1"], &["2"]]);
        g.add_column("X").unwrap();
        assert_eq!(column_values(&g, "X"), vec!["", ""]);

        assert_eq!(g.add_column("X"), Err(Error::DuplicateColumn("X".into())));
        assert_eq!(g.column_names(), vec!["A", "X"]);
        // Names are case-sensitive
        g.add_column("x").unwrap();
        assert_eq!(g.column_count(), 3);
    }

    #[test]
    fn test_delete_column_drops_values_and_formats() {
        let mut g = grid(&["A", "B"], &[&["1", "2"]]);
        let b = g.column_id("B").unwrap();
        g.merge_format(0, "B", &CellFormat::new().bold(true)).unwrap();
        g.set_column_format("B", CellFormat::new().italic(true)).unwrap();

        g.delete_column("B").unwrap();
        assert_eq!(g.column_names(), vec!["A"]);
        assert!(!g.row(0).unwrap().contains(b));
        assert!(!g.formats().references_column(b));

        let before = g.clone();
        assert_eq!(g.delete_column("B"), Err(Error::UnknownColumn("B".into())));
        assert_eq!(g, before);
    }

    #[test]
    fn test_rename_column_keeps_data_and_format() {
        let mut g = grid(&["Qty"], &[&["5"]]);
        g.merge_format(0, "Qty", &CellFormat::new().bold(true)).unwrap();
        g.add_column("Name").unwrap();

        g.rename_column("Qty", "Quantity").unwrap();
        assert_eq!(g.get(0, "Quantity").unwrap(), "5");
        assert_eq!(g.format_at(0, "Quantity").unwrap().bold, Some(true));

        assert_eq!(
            g.rename_column("Quantity", "Name"),
            Err(Error::DuplicateColumn("Name".into()))
        );
        assert_eq!(
            g.rename_column("Qty", "Other"),
            Err(Error::UnknownColumn("Qty".into()))
        );
        g.rename_column("Name", "Name").unwrap();
        assert_eq!(g.column_names(), vec!["Quantity", "Name"]);
    }

    #[test]
    fn test_numeric_sort_treats_text_as_zero() {
        let mut g = grid(&["V"], &[&["10"], &["2"], &["abc"], &["1"]]);
        g.sort("V", SortOrder::NumericAscending).unwrap();
        assert_eq!(column_values(&g, "V"), vec!["abc", "1", "2", "10"]);

        g.sort("V", SortOrder::NumericDescending).unwrap();
        assert_eq!(column_values(&g, "V"), vec!["10", "2", "1", "abc"]);
    }

    #[test]
    fn test_numeric_sort_is_stable() {
        let mut g = grid(
            &["V", "Tag"],
            &[&["x", "first"], &["0", "second"], &["-1", "third"], &["", "fourth"]],
        );
        g.sort("V", SortOrder::NumericAscending).unwrap();
        assert_eq!(column_values(&g, "Tag"), vec!["third", "first", "second", "fourth"]);
    }

    #[test]
    fn test_lexical_sort() {
        let mut g = grid(&["N"], &[&["banana"], &["Apple"], &["apple"], &["cherry"]]);
        g.sort("N", SortOrder::LexicalAscending).unwrap();
        assert_eq!(column_values(&g, "N"), vec!["apple", "Apple", "banana", "cherry"]);

        g.sort("N", SortOrder::LexicalDescending).unwrap();
        assert_eq!(column_values(&g, "N"), vec!["cherry", "banana", "Apple", "apple"]);
    }

    #[test]
    fn test_sort_moves_formatting_with_rows() {
        let mut g = grid(&["V"], &[&["3"], &["1"], &["2"]]);
        g.merge_format(0, "V", &CellFormat::new().bold(true)).unwrap();
        g.sort("V", SortOrder::NumericAscending).unwrap();
        assert_eq!(g.get(2, "V").unwrap(), "3");
        assert_eq!(g.format_at(2, "V").unwrap().bold, Some(true));
        assert!(g.format_at(0, "V").unwrap().is_empty());
    }

    #[test]
    fn test_sort_unknown_column() {
        let mut g = grid(&["V"], &[&["1"]]);
        assert!(g.sort("W", SortOrder::LexicalAscending).is_err());
    }

    #[test]
    fn test_find_replace() {
        let mut g = grid(&["A", "B"], &[&["banana", "Banana"], &["cherry", "apple"]]);
        assert_eq!(g.find_replace("a", "Z", false), 3);
        assert_eq!(g.get(0, "A").unwrap(), "bZnZnZ");
        assert_eq!(g.get(0, "B").unwrap(), "BZnZnZ");
        assert_eq!(g.get(1, "B").unwrap(), "Zpple");
        assert_eq!(g.get(1, "A").unwrap(), "cherry");
    }

    #[test]
    fn test_find_replace_match_case() {
        let mut g = grid(&["A"], &[&["Banana"]]);
        assert_eq!(g.find_replace("B", "Z", true), 1);
        assert_eq!(g.find_replace("b", "Z", true), 0);
        assert_eq!(g.get(0, "A").unwrap(), "Zanana");
    }

    #[test]
    fn test_find_replace_literal_text() {
        let mut g = grid(&["A"], &[&["cost (USD) $5"]]);
        assert_eq!(g.find_replace("(usd) $", "$1", false), 1);
        assert_eq!(g.get(0, "A").unwrap(), "cost $15");
        assert_eq!(g.find_replace("", "x", false), 0);
    }

    #[test]
    fn test_fill_down() {
        let mut g = grid(&["A", "B"], &[&["1", "k"], &["2", "k"], &["3", "k"]]);
        assert_eq!(g.fill_down("A", 1).unwrap(), 1);
        assert_eq!(column_values(&g, "A"), vec!["1", "2", "2"]);
        assert_eq!(g.fill_down("A", 2).unwrap(), 0);
        assert!(g.fill_down("A", 3).is_err());
    }

    #[test]
    fn test_auto_sum() {
        let mut g = grid(&["Item", "Qty"], &[&["a", "1.5"], &["b", "x"], &["c", "4.5"]]);
        g.auto_sum("Qty").unwrap();
        assert_eq!(g.row_count(), 4);
        assert_eq!(g.record_at(3).unwrap(), vec![("Item", ""), ("Qty", "6")]);

        let mut g = grid(&["V"], &[&["0.1"], &["0.2"]]);
        g.auto_sum("V").unwrap();
        assert_eq!(g.get(2, "V").unwrap(), "0.30000000000000004");
    }

    #[test]
    fn test_auto_sum_overflow_adds_no_row() {
        let mut g = grid(&["V"], &[&["1e308"], &["1e308"]]);
        let before = g.clone();
        assert_eq!(g.auto_sum("V"), Err(Error::NumericOverflow("V".into())));
        assert_eq!(g, before);

        let mut g = grid(&["V"], &[&["1e308"], &["-1e308"], &["5"]]);
        g.auto_sum("V").unwrap();
        assert_eq!(g.get(3, "V").unwrap(), "5");
    }

    #[test]
    fn test_clear_contents_drops_format() {
        let mut g = grid(&["A"], &[&["1"]]);
        g.merge_format(0, "A", &CellFormat::new().bold(true)).unwrap();
        g.clear_contents(0, "A").unwrap();
        assert_eq!(g.get(0, "A").unwrap(), "");
        assert!(g.formats().is_empty());
    }

    #[test]
    fn test_display_value_uses_effective_format() {
        let mut g = grid(&["Price"], &[&["1234.5"], &["n/a"]]);
        g.set_column_format(
            "Price",
            CellFormat::new().with_number_format(NumberFormat::Currency),
        )
        .unwrap();
        assert_eq!(g.display_value(0, "Price").unwrap(), "$1,234.50");
        assert_eq!(g.display_value(1, "Price").unwrap(), "n/a");
        assert_eq!(g.get(0, "Price").unwrap(), "1234.5");
    }

    #[test]
    fn test_paste_grows_grid() {
        let mut g = grid(&["col1", "col2"], &[&["", ""]]);
        let outcome = g.apply_paste(0, "col1", "a\tb\nc\td").unwrap();
        assert_eq!(outcome.rows_added, 1);
        assert!(outcome.columns_added.is_empty());
        assert_eq!(g.record_at(0).unwrap(), vec![("col1", "a"), ("col2", "b")]);
        assert_eq!(g.record_at(1).unwrap(), vec![("col1", "c"), ("col2", "d")]);
    }

    #[test]
    fn test_paste_adds_columns() {
        let mut g = grid(&["A"], &[&["1"]]);
        let outcome = g.apply_paste(0, "A", "x\ty\tz").unwrap();
        assert_eq!(outcome.columns_added, vec!["Column 2", "Column 3"]);
        assert_eq!(
            g.record_at(0).unwrap(),
            vec![("A", "x"), ("Column 2", "y"), ("Column 3", "z")]
        );
    }

    #[test]
    fn test_paste_single_value() {
        let mut g = grid(&["A", "B"], &[&["1", "2"], &["3", "4"]]);
        let outcome = g.apply_paste(1, "B", "x\n").unwrap();
        assert!(outcome.single_cell);
        assert_eq!(g.row_count(), 2);
        assert_eq!(g.column_count(), 2);
        assert_eq!(g.get(1, "B").unwrap(), "x");
    }

    #[test]
    fn test_paste_bad_anchor_is_atomic() {
        let mut g = grid(&["A"], &[&["1"]]);
        let before = g.clone();
        assert!(g.apply_paste(3, "A", "a\tb").is_err());
        assert!(g.apply_paste(0, "Z", "a\tb").is_err());
        assert_eq!(g, before);
    }

    #[test]
    fn test_push_record_unknown_column() {
        let mut g = grid(&["A"], &[]);
        let result = g.push_record([("A", "1"), ("B", "2")], None);
        assert_eq!(result, Err(Error::UnknownColumn("B".into())));
        assert!(g.is_empty());

        g.push_record([("A", "1")], Some(Provenance::Template)).unwrap();
        assert_eq!(g.row(0).unwrap().provenance(), Some(&Provenance::Template));
    }

    #[test]
    fn test_distinct_values() {
        let mut g = grid(&["S"], &[&["b"], &["a"], &["b"]]);
        g.add_row(None).unwrap();
        let values: Vec<String> = g.distinct_values("S").unwrap().into_iter().collect();
        assert_eq!(values, vec!["", "a", "b"]);
    }

    #[test]
    fn test_visible_rows() {
        let g = grid(&["status"], &[&["Active"], &["Inactive"], &["Active"]]);
        let status = g.column_id("status").unwrap();
        let all = g.distinct_values("status").unwrap();

        let mut filters = ColumnFilters::new();
        filters.toggle_value(status, "Inactive", &all);
        assert_eq!(g.visible_rows(&filters), vec![0, 2]);
        assert_eq!(g.visible_rows(&ColumnFilters::new()), vec![0, 1, 2]);
    }

    #[test]
    fn test_filter_survives_rename_and_ignores_deleted_column() {
        let mut g = grid(&["S", "T"], &[&["a", "x"], &["b", "y"]]);
        let s = g.column_id("S").unwrap();
        let all = g.distinct_values("S").unwrap();
        let mut filters = ColumnFilters::new();
        filters.toggle_value(s, "a", &all);

        g.rename_column("S", "Status").unwrap();
        assert_eq!(g.visible_rows(&filters), vec![1]);

        g.delete_column("Status").unwrap();
        assert_eq!(g.visible_rows(&filters), vec![0, 1]);
    }

    #[test]
    fn test_position_of_tracks_row_moves() {
        let mut g = grid(&["V"], &[&["2"], &["1"]]);
        let key = g.key(0, "V").unwrap();
        g.sort("V", SortOrder::NumericAscending).unwrap();
        assert_eq!(g.position_of(key), Some((1, "V")));

        g.delete_rows(&[1]).unwrap();
        assert_eq!(g.position_of(key), None);
        assert_eq!(
            g.merge_format_key(key, &CellFormat::new().bold(true)),
            Err(Error::StaleReference)
        );
    }

    #[test]
    fn test_compare_text() {
        assert_eq!(compare_text("a", "B"), Ordering::Less);
        assert_eq!(compare_text("a", "A"), Ordering::Less);
        assert_eq!(compare_text("Zed", "apple"), Ordering::Greater);
        assert_eq!(compare_text("", "a"), Ordering::Less);
        assert_eq!(compare_text("same", "same"), Ordering::Equal);
    }
}
