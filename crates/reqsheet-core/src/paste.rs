//! Clipboard text parsing
//!
//! Pasted text is tab/newline delimited (what spreadsheet applications put
//! on the clipboard). Parsing is a pure function; growing the grid to fit
//! the parsed block is planned here and applied by
//! [`GridModel::apply_paste`](crate::GridModel::apply_paste).

use ahash::AHashSet;

/// Default prefix for synthesized column names ("Column 3")
pub const DEFAULT_COLUMN_PREFIX: &str = "Column";

/// Split clipboard text into lines of cells
///
/// CRLF and lone CR become LF, one trailing LF is dropped, lines split on
/// LF and cells on TAB. Rows may have different widths.
pub fn parse(text: &str) -> Vec<Vec<String>> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let body = normalized.strip_suffix('\n').unwrap_or(&normalized);

    body.split('\n')
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

/// Check whether a parsed block is a single value
///
/// A single value is a plain cell assignment, never a grid paste.
pub fn is_single_cell(grid: &[Vec<String>]) -> bool {
    grid.len() == 1 && grid[0].len() == 1
}

/// Widest line of a parsed block
pub fn width(grid: &[Vec<String>]) -> usize {
    grid.iter().map(Vec::len).max().unwrap_or(0)
}

/// How much a grid must grow to hold a pasted block
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrowthPlan {
    /// Total row count after growing
    pub rows_needed: usize,
    /// Names of the columns to append, in order
    pub new_columns: Vec<String>,
}

impl GrowthPlan {
    /// Check whether applying this plan to a grid of `row_count` rows changes nothing
    pub fn is_noop(&self, row_count: usize) -> bool {
        self.rows_needed <= row_count && self.new_columns.is_empty()
    }
}

/// Plan growth for `grid` pasted at (`anchor_row`, `anchor_col`)
///
/// New columns are named with [`DEFAULT_COLUMN_PREFIX`].
pub fn plan_growth<S: AsRef<str>>(
    grid: &[Vec<String>],
    anchor_row: usize,
    anchor_col: usize,
    row_count: usize,
    columns: &[S],
) -> GrowthPlan {
    plan_growth_with_prefix(
        grid,
        anchor_row,
        anchor_col,
        row_count,
        columns,
        DEFAULT_COLUMN_PREFIX,
    )
}

/// Plan growth, naming new columns `"{prefix} {N}"`
///
/// N is the 1-based position of the new column; when that name is already
/// taken N counts up until a free name is found. Existing columns keep
/// their names and order.
pub fn plan_growth_with_prefix<S: AsRef<str>>(
    grid: &[Vec<String>],
    anchor_row: usize,
    anchor_col: usize,
    row_count: usize,
    columns: &[S],
    prefix: &str,
) -> GrowthPlan {
    if is_single_cell(grid) {
        return GrowthPlan {
            rows_needed: row_count,
            new_columns: Vec::new(),
        };
    }

    let rows_needed = row_count.max(anchor_row + grid.len());
    let columns_needed = anchor_col + width(grid);

    let mut taken: AHashSet<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
    let mut new_columns = Vec::new();
    for position in columns.len()..columns_needed {
        let mut n = position + 1;
        let name = loop {
            let candidate = format!("{} {}", prefix, n);
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(name.clone());
        new_columns.push(name);
    }

    GrowthPlan {
        rows_needed,
        new_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_block() {
        assert_eq!(
            parse("a\tb\nc\td"),
            vec![vec!["a", "b"], vec!["c", "d"]]
        );
    }

    #[test]
    fn test_parse_line_endings() {
        assert_eq!(parse("a\r\nb\rc\n"), vec![vec!["a"], vec!["b"], vec!["c"]]);
        // Only one trailing newline is dropped
        assert_eq!(parse("a\n\n"), vec![vec!["a"], vec![""]]);
    }

    #[test]
    fn test_parse_keeps_empty_cells() {
        assert_eq!(parse("a\t\tc"), vec![vec!["a", "", "c"]]);
        assert_eq!(parse(""), vec![vec![""]]);
    }

    #[test]
    fn test_single_cell() {
        assert!(is_single_cell(&parse("x")));
        assert!(is_single_cell(&parse("x\n")));
        assert!(!is_single_cell(&parse("x\ty")));
        assert!(!is_single_cell(&parse("x\ny")));

        let plan = plan_growth(&parse("x"), 40, 9, 3, &["A", "B"]);
        assert!(plan.is_noop(3));
    }

    #[test]
    fn test_plan_growth_rows_and_columns() {
        let grid = parse("1\t2\t3\n4\t5\t6");
        let plan = plan_growth(&grid, 2, 1, 3, &["Name", "Qty"]);
        assert_eq!(plan.rows_needed, 4);
        assert_eq!(plan.new_columns, vec!["Column 3", "Column 4"]);
    }

    #[test]
    fn test_plan_growth_fits() {
        let grid = parse("a\tb\nc\td");
        let plan = plan_growth(&grid, 0, 0, 5, &["col1", "col2"]);
        assert!(plan.is_noop(5));
        assert_eq!(plan.rows_needed, 5);
    }

    #[test]
    fn test_plan_growth_skips_taken_names() {
        let grid = parse("a\tb\tc");
        let plan = plan_growth(&grid, 0, 0, 1, &["Column 2"]);
        assert_eq!(plan.new_columns, vec!["Column 3", "Column 4"]);
    }

    #[test]
    fn test_ragged_rows_use_widest_line() {
        let grid = parse("a\nb\tc\td");
        assert_eq!(width(&grid), 3);
        let plan = plan_growth_with_prefix(&grid, 0, 0, 1, &["A"], "Field");
        assert_eq!(plan.new_columns, vec!["Field 2", "Field 3"]);
    }
}
