//! Parsing model replies for table blocks.

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::Grid;

/// Splits a table reply into a rectangular grid.
///
/// Each non-blank line is one row. Surrounding `[`/`]` are stripped and
/// cells are split by the first separator present, in priority order:
/// `", "`, runs of three or more spaces, runs of two or more spaces, then
/// single spaces.
#[derive(Debug, Clone)]
pub struct TableReplyParser {
    wide_gap: Regex,
    double_gap: Regex,
}

impl TableReplyParser {
    pub fn new() -> Self {
        Self {
            wide_gap: Regex::new(r" {3,}").unwrap(),
            double_gap: Regex::new(r" {2,}").unwrap(),
        }
    }

    /// Parse a reply, failing with [`Error::MalformedResponse`] when it has
    /// no rows or the rows differ in length.
    pub fn parse(&self, reply: &str) -> Result<Grid> {
        let rows: Vec<Vec<String>> = reply
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| self.split_row(line.trim_matches(|c| c == '[' || c == ']')))
            .collect();

        if rows.is_empty() {
            return Err(Error::MalformedResponse("empty table reply".to_string()));
        }

        Grid::new(rows).map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    fn split_row(&self, row: &str) -> Vec<String> {
        let cells: Vec<&str> = if row.contains(", ") {
            row.split(", ").collect()
        } else if self.wide_gap.is_match(row) {
            self.wide_gap.split(row).collect()
        } else if self.double_gap.is_match(row) {
            self.double_gap.split(row).collect()
        } else {
            row.split(' ').collect()
        };
        cells.into_iter().map(|cell| cell.trim().to_string()).collect()
    }
}

impl Default for TableReplyParser {
    fn default() -> Self {
        Self::new()
    }
}
