//! Rectangular cell grid used for table content.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A rectangular grid of cell strings.
///
/// Every row has the same number of cells; [`Grid::new`] rejects ragged input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Build a grid, failing with [`Error::RaggedTable`] if row lengths differ.
    pub fn new(rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some((row, cells)) = rows
                .iter()
                .enumerate()
                .find(|(_, cells)| cells.len() != expected)
            {
                return Err(Error::RaggedTable {
                    row,
                    expected,
                    found: cells.len(),
                });
            }
        }
        Ok(Self { rows })
    }

    /// Build a grid from anything convertible to strings.
    pub fn from_rows<R, C>(rows: R) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// All rows, top to bottom.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// The first row, used as the header when rendering.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header.
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Check if the grid has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Space-joined text of one row, as it appears on a text line.
    pub fn row_text(&self, row: usize) -> Option<String> {
        self.rows.get(row).map(|cells| cells.join(" "))
    }

    /// Render the grid as aligned plain-text columns.
    ///
    /// Columns are padded to their widest cell and separated by three spaces,
    /// which the table reply parser splits on.
    pub fn to_aligned_text(&self) -> String {
        let widths: Vec<usize> = (0..self.column_count())
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| row[col].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&widths)
                    .map(|(cell, width)| {
                        let pad = width.saturating_sub(cell.chars().count());
                        format!("{}{}", cell, " ".repeat(pad))
                    })
                    .collect::<Vec<_>>()
                    .join("   ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TryFrom<Vec<Vec<String>>> for Grid {
    type Error = Error;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self> {
        Grid::new(rows)
    }
}

impl From<Grid> for Vec<Vec<String>> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rectangular() {
        let grid = Grid::from_rows([["a", "b"], ["c", "d"]]).unwrap();
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.header(), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(grid.body().len(), 1);
        assert_eq!(grid.row_text(1).as_deref(), Some("c d"));
    }

    #[test]
    fn test_grid_ragged_rejected() {
        let result = Grid::from_rows(vec![vec!["a", "b"], vec!["c"]]);
        assert!(matches!(
            result,
            Err(Error::RaggedTable {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_empty_grid() {
        let grid = Grid::default();
        assert!(grid.is_empty());
        assert_eq!(grid.column_count(), 0);
        assert!(grid.body().is_empty());
        assert_eq!(grid.to_aligned_text(), "");
    }

    #[test]
    fn test_aligned_text() {
        let grid = Grid::from_rows([["Name", "Qty"], ["Apple", "3"]]).unwrap();
        assert_eq!(grid.to_aligned_text(), "Name    Qty\nApple   3");
    }

    #[test]
    fn test_grid_serde_validates() {
        let ok: Grid = serde_json::from_str(r#"[["a","b"],["c","d"]]"#).unwrap();
        assert_eq!(ok.row_count(), 2);

        let ragged = serde_json::from_str::<Grid>(r#"[["a","b"],["c"]]"#);
        assert!(ragged.is_err());
    }
}
