//! Table draft
//!
//! Cells are keyed by a column id that never changes while the draft lives.
//! Header text is only a display name, so renaming or resizing can not
//! orphan cell values. The header-keyed shape that gets persisted is derived
//! on demand.

use indexmap::IndexMap;

use super::EditorError;
use crate::block::Block;

pub const MIN_DIMENSION: usize = 1;
pub const MAX_DIMENSION: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Column {
    id: ColumnId,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDraft {
    columns: Vec<Column>,
    rows: Vec<IndexMap<ColumnId, String>>,
    next_id: u32,
}

fn clamp(n: i64) -> usize {
    n.clamp(MIN_DIMENSION as i64, MAX_DIMENSION as i64) as usize
}

fn placeholder(index: usize) -> String {
    format!("Col{}", index + 1)
}

impl Default for TableDraft {
    /// Two unnamed columns and one empty row.
    fn default() -> Self {
        let mut table = Self {
            columns: Vec::new(),
            rows: vec![IndexMap::new()],
            next_id: 0,
        };
        table.push_column(String::new());
        table.push_column(String::new());
        table
    }
}

impl TableDraft {
    fn push_column(&mut self, name: String) {
        let id = ColumnId(self.next_id);
        self.next_id += 1;
        self.columns.push(Column { id, name });
        for row in &mut self.rows {
            row.insert(id, String::new());
        }
    }

    fn empty_row(&self) -> IndexMap<ColumnId, String> {
        self.columns
            .iter()
            .map(|column| (column.id, String::new()))
            .collect()
    }

    fn header_key(index: usize, column: &Column) -> String {
        if column.name.trim().is_empty() {
            placeholder(index)
        } else {
            column.name.clone()
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Header names as typed, blanks included.
    pub fn header_inputs(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Header keys; a blank name is keyed as `Col{index+1}`.
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, column)| Self::header_key(index, column))
            .collect()
    }

    /// Rows keyed by the current header keys, one entry per column.
    pub fn rows(&self) -> Vec<IndexMap<String, String>> {
        let headers = self.headers();
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(&headers)
                    .map(|(column, header)| {
                        (
                            header.clone(),
                            row.get(&column.id).cloned().unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .collect()
    }

    pub fn set_column_count(&mut self, n: i64) {
        let n = clamp(n);
        if n < self.columns.len() {
            for column in self.columns.drain(n..) {
                for row in &mut self.rows {
                    row.shift_remove(&column.id);
                }
            }
        }
        for (index, column) in self.columns.iter_mut().enumerate() {
            if column.name.trim().is_empty() {
                column.name = placeholder(index);
            }
        }
        while self.columns.len() < n {
            let name = placeholder(self.columns.len());
            self.push_column(name);
        }
    }

    pub fn set_row_count(&mut self, n: i64) {
        let n = clamp(n);
        self.rows.truncate(n);
        while self.rows.len() < n {
            let row = self.empty_row();
            self.rows.push(row);
        }
    }

    pub fn rename_header(&mut self, index: usize, name: impl Into<String>) -> Result<(), EditorError> {
        let len = self.columns.len();
        let column = self
            .columns
            .get_mut(index)
            .ok_or(EditorError::IndexOutOfRange { index, len })?;
        column.name = name.into();
        Ok(())
    }

    /// `header` is a current header key as returned by [`Self::headers`].
    pub fn set_cell(
        &mut self,
        row: usize,
        header: &str,
        value: impl Into<String>,
    ) -> Result<(), EditorError> {
        let id = self
            .columns
            .iter()
            .enumerate()
            .find(|(index, column)| Self::header_key(*index, column) == header)
            .map(|(_, column)| column.id)
            .ok_or_else(|| EditorError::UnknownHeader(header.to_owned()))?;
        let len = self.rows.len();
        let cells = self
            .rows
            .get_mut(row)
            .ok_or(EditorError::IndexOutOfRange { index: row, len })?;
        cells.insert(id, value.into());
        Ok(())
    }

    pub(super) fn to_block(&self) -> Block {
        Block::Table {
            headers: self.headers(),
            rows: self.rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::indexmap;

    use super::*;

    fn cells(table: &TableDraft) -> Vec<Vec<String>> {
        table
            .rows()
            .into_iter()
            .map(|row| row.into_values().collect())
            .collect()
    }

    #[test]
    fn starts_with_two_columns_and_one_row() {
        let table = TableDraft::default();
        assert_eq!(table.header_inputs(), ["", ""]);
        assert_eq!(table.headers(), ["Col1", "Col2"]);
        assert_eq!(
            table.rows(),
            [indexmap! { "Col1".to_owned() => String::new(), "Col2".to_owned() => String::new() }]
        );
    }

    #[test]
    fn rename_keeps_cells() {
        let mut table = TableDraft::default();
        table.set_row_count(3);
        for row in 0..3 {
            table.set_cell(row, "Col1", format!("a{row}")).unwrap();
            table.set_cell(row, "Col2", format!("b{row}")).unwrap();
        }
        table.rename_header(0, "Name").unwrap();
        assert_eq!(table.headers(), ["Name", "Col2"]);
        for (row, cells) in table.rows().iter().enumerate() {
            assert_eq!(cells["Name"], format!("a{row}"));
            assert_eq!(cells["Col2"], format!("b{row}"));
        }
        // renaming back to blank restores the placeholder key, values still attached
        table.rename_header(0, " ").unwrap();
        assert_eq!(table.rows()[2]["Col1"], "a2");
        assert_eq!(
            table.set_cell(0, "Name", "x"),
            Err(EditorError::UnknownHeader("Name".into()))
        );
    }

    #[test]
    fn growing_preserves_existing_columns() {
        let mut table = TableDraft::default();
        table.set_cell(0, "Col1", "x").unwrap();
        table.rename_header(1, "Price").unwrap();
        table.set_cell(0, "Price", "3").unwrap();
        let before = cells(&table);

        table.set_column_count(5);
        assert_eq!(table.headers(), ["Col1", "Price", "Col3", "Col4", "Col5"]);
        for (row, before) in cells(&table).iter().zip(&before) {
            assert_eq!(&row[..2], &before[..]);
            assert!(row[2..].iter().all(String::is_empty));
        }
    }

    #[test]
    fn shrinking_drops_trailing_columns_only() {
        let mut table = TableDraft::default();
        table.set_column_count(3);
        table.set_cell(0, "Col1", "keep").unwrap();
        table.set_cell(0, "Col3", "drop").unwrap();
        table.set_column_count(2);
        assert_eq!(table.headers(), ["Col1", "Col2"]);
        assert_eq!(cells(&table), [["keep", ""]]);
        table.set_column_count(3);
        assert_eq!(cells(&table), [["keep", "", ""]]);
    }

    #[test]
    fn dimensions_are_clamped() {
        let mut table = TableDraft::default();
        table.set_column_count(0);
        assert_eq!(table.column_count(), 1);
        table.set_column_count(-4);
        assert_eq!(table.column_count(), 1);
        table.set_column_count(42);
        assert_eq!(table.column_count(), 10);
        table.set_row_count(0);
        assert_eq!(table.row_count(), 1);
        table.set_row_count(11);
        assert_eq!(table.row_count(), 10);
        assert!(table.rows().iter().all(|row| row.len() == 10));
    }

    #[test]
    fn row_truncation_keeps_leading_rows() {
        let mut table = TableDraft::default();
        table.set_row_count(3);
        table.set_cell(0, "Col1", "first").unwrap();
        table.set_cell(2, "Col1", "last").unwrap();
        table.set_row_count(2);
        assert_eq!(cells(&table), [["first", ""], ["", ""]]);
        assert_eq!(
            table.set_cell(2, "Col1", "x"),
            Err(EditorError::IndexOutOfRange { index: 2, len: 2 })
        );
    }
}
