/// Table structures for Word documents.
use crate::docx::error::{DocxError, Result};

/// A cell in a table row.
///
/// Represents a `<w:tc>` element holding plain text content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// The text content of this cell
    pub text: String,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A row in a table.
///
/// Represents a `<w:tr>` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// The cells of this row, in order
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

/// A table in a Word document.
///
/// Represents a `<w:tbl>` element: a rectangular grid of rows and cells.
/// The column count is fixed at creation from the first row's cell count;
/// the building API rejects ragged input. Rows mutated directly are not
/// re-checked; callers go through the table-building API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// The rows of this table, in order
    pub rows: Vec<Row>,
    /// Number of columns, fixed from the first row at creation
    pub columns: usize,
}

impl Table {
    /// Build a table from rows of cell text.
    ///
    /// The first row fixes the column count; every subsequent row must have
    /// the same number of cells.
    pub fn from_rows(rows: &[Vec<String>]) -> Result<Self> {
        let columns = rows.first().map(|row| row.len()).unwrap_or(0);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns {
                return Err(DocxError::InvalidFormat(format!(
                    "table row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    columns
                )));
            }
        }

        let rows = rows
            .iter()
            .map(|row| Row::new(row.iter().map(Cell::new).collect()))
            .collect();

        Ok(Self { rows, columns })
    }

    /// Get the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the cell at (row, column), if present.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(column))
    }

    /// Get a mutable reference to the cell at (row, column), if present.
    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(column))
    }

    /// Check that every row has exactly the declared column count.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.cells.len() == self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let table = Table::from_rows(&[
            vec!["A".to_string(), "B".to_string()],
            vec!["1".to_string(), "2".to_string()],
        ])
        .unwrap();

        assert_eq!(table.columns, 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 1).unwrap().text, "2");
        assert!(table.is_rectangular());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Table::from_rows(&[
            vec!["A".to_string(), "B".to_string()],
            vec!["1".to_string()],
        ]);
        assert!(matches!(result, Err(DocxError::InvalidFormat(_))));
    }

    #[test]
    fn test_empty_table() {
        let table = Table::from_rows(&[]).unwrap();
        assert_eq!(table.columns, 0);
        assert_eq!(table.row_count(), 0);
    }
}
