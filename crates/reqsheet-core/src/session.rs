//! Per-grid editor state
//!
//! [`EditorSession`] holds what a grid editor remembers between operations:
//! the selected range, the internal clipboard buffer and the column
//! filters. It is owned by the host and handed to the operations that need
//! it, so several grids never share selection or clipboard state.
//!
//! The system clipboard sits behind the [`Clipboard`] trait. When the
//! platform refuses access, copy and paste fall back to the session buffer.

use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::filter::ColumnFilters;
use crate::format::{CellFormat, CellKey};
use crate::grid::{GridModel, PasteOutcome};

/// Access to the system clipboard
pub trait Clipboard {
    /// Read the clipboard as text
    fn read_text(&mut self) -> Result<String>;

    /// Replace the clipboard contents with `text`
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// A clipboard that refuses every access
///
/// Useful for hosts without a system clipboard; the session buffer is used
/// instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedClipboard;

impl Clipboard for DeniedClipboard {
    fn read_text(&mut self) -> Result<String> {
        Err(Error::ClipboardAccessDenied("clipboard unavailable".into()))
    }

    fn write_text(&mut self, _text: &str) -> Result<()> {
        Err(Error::ClipboardAccessDenied("clipboard unavailable".into()))
    }
}

/// An in-process clipboard
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    /// Create an empty clipboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replace the contents
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }
}

impl Clipboard for MemoryClipboard {
    fn read_text(&mut self) -> Result<String> {
        Ok(self.text.clone().unwrap_or_default())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.text = Some(text.to_string());
        Ok(())
    }
}

/// A rectangular selection between two cells
///
/// Corners are stable keys, so the selection follows its rows through
/// sorts and inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Cell where the selection started
    pub anchor: CellKey,
    /// Cell where the selection ends
    pub focus: CellKey,
}

/// Selected block resolved to current positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionBounds {
    /// Row indices (inclusive)
    pub rows: RangeInclusive<usize>,
    /// Column indices (inclusive)
    pub columns: RangeInclusive<usize>,
}

/// Editor state for one grid
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    selection: Option<Selection>,
    buffer: Option<String>,
    filters: ColumnFilters,
}

impl EditorSession {
    /// Create a session with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    // === Selection ===

    /// Current selection
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Select a single cell
    pub fn select(&mut self, grid: &GridModel, row: usize, column: &str) -> Result<()> {
        let key = grid.key(row, column)?;
        self.selection = Some(Selection {
            anchor: key,
            focus: key,
        });
        Ok(())
    }

    /// Move the selection's far corner, keeping its anchor
    pub fn extend_selection(&mut self, grid: &GridModel, row: usize, column: &str) -> Result<()> {
        let focus = grid.key(row, column)?;
        let anchor = self.selection.map_or(focus, |s| s.anchor);
        self.selection = Some(Selection { anchor, focus });
        Ok(())
    }

    /// Drop the selection
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Current block covered by the selection
    ///
    /// Fails with [`Error::NoSelection`] when nothing is selected and with
    /// [`Error::StaleReference`] when a corner's row or column is gone.
    pub fn bounds(&self, grid: &GridModel) -> Result<SelectionBounds> {
        let selection = self.selection.ok_or(Error::NoSelection)?;
        let locate = |key: CellKey| -> Result<(usize, usize)> {
            let (row, name) = grid.position_of(key).ok_or(Error::StaleReference)?;
            let column = grid.column_index(name).ok_or(Error::StaleReference)?;
            Ok((row, column))
        };
        let (r1, c1) = locate(selection.anchor)?;
        let (r2, c2) = locate(selection.focus)?;

        Ok(SelectionBounds {
            rows: r1.min(r2)..=r1.max(r2),
            columns: c1.min(c2)..=c1.max(c2),
        })
    }

    /// Stable keys of every selected cell, row by row
    pub fn selected_keys(&self, grid: &GridModel) -> Result<Vec<CellKey>> {
        let bounds = self.bounds(grid)?;
        let mut keys = Vec::new();
        for row in bounds.rows.clone() {
            let row_id = grid.row_id(row)?;
            for column in &grid.columns()[bounds.columns.clone()] {
                keys.push(CellKey::new(row_id, column.id()));
            }
        }
        Ok(keys)
    }

    // === Clipboard ===

    /// Internal clipboard buffer (last copied text)
    pub fn buffer(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    /// Selected values as tab/newline delimited text
    pub fn selection_text(&self, grid: &GridModel) -> Result<String> {
        let bounds = self.bounds(grid)?;
        let columns = &grid.columns()[bounds.columns.clone()];

        let lines: Vec<String> = bounds
            .rows
            .clone()
            .filter_map(|r| grid.row(r))
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c.id()))
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// Copy the selection to the clipboard and the session buffer
    ///
    /// A refused clipboard is logged and the buffer alone holds the copy.
    pub fn copy(&mut self, grid: &GridModel, clipboard: &mut dyn Clipboard) -> Result<String> {
        let text = self.selection_text(grid)?;
        if let Err(e) = clipboard.write_text(&text) {
            log::warn!("clipboard write failed, keeping copy in session buffer: {}", e);
        }
        self.buffer = Some(text.clone());
        Ok(text)
    }

    /// Copy the selection, then blank the selected cells (formatting stays)
    pub fn cut(&mut self, grid: &mut GridModel, clipboard: &mut dyn Clipboard) -> Result<String> {
        let text = self.copy(grid, clipboard)?;
        let bounds = self.bounds(grid)?;
        let names: Vec<String> = grid.columns()[bounds.columns.clone()]
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        for row in bounds.rows {
            for name in &names {
                grid.set_cell(row, name, "")?;
            }
        }
        Ok(text)
    }

    /// Paste at the top-left corner of the selection
    ///
    /// Reads the clipboard; when that is refused the session buffer is
    /// pasted instead. With neither available the clipboard error is
    /// returned and the grid is untouched.
    pub fn paste(
        &mut self,
        grid: &mut GridModel,
        clipboard: &mut dyn Clipboard,
    ) -> Result<PasteOutcome> {
        let bounds = self.bounds(grid)?;
        let text = match clipboard.read_text() {
            Ok(text) => text,
            Err(e) => match &self.buffer {
                Some(buffered) => {
                    log::warn!("clipboard read failed, pasting session buffer: {}", e);
                    buffered.clone()
                }
                None => return Err(e),
            },
        };

        let anchor_row = *bounds.rows.start();
        let anchor_column = grid.columns()[*bounds.columns.start()].name().to_string();
        grid.apply_paste(anchor_row, &anchor_column, &text)
    }

    // === Selection-wide edits ===

    /// Merge `patch` into the format of every selected cell
    pub fn apply_format(&self, grid: &mut GridModel, patch: &CellFormat) -> Result<usize> {
        let keys = self.selected_keys(grid)?;
        for key in &keys {
            grid.merge_format_key(*key, patch)?;
        }
        Ok(keys.len())
    }

    /// Blank every selected cell and drop its formatting
    pub fn clear_contents(&self, grid: &mut GridModel) -> Result<usize> {
        let keys = self.selected_keys(grid)?;
        for key in &keys {
            if let Some((row, name)) = grid.position_of(*key) {
                let name = name.to_string();
                grid.clear_contents(row, &name)?;
            }
        }
        Ok(keys.len())
    }

    // === Filters ===

    /// Column filters of this grid
    pub fn filters(&self) -> &ColumnFilters {
        &self.filters
    }

    /// Mutable column filters
    pub fn filters_mut(&mut self) -> &mut ColumnFilters {
        &mut self.filters
    }

    /// Rows visible under the session's filters
    pub fn visible_rows(&self, grid: &GridModel) -> Vec<usize> {
        grid.visible_rows(&self.filters)
    }
}
