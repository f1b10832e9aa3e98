//! Table detection using text position analysis (stream mode).
//!
//! Tables are found from column alignment of cell-sized text segments,
//! without relying on ruling lines.

use std::collections::{HashMap, HashSet};

use super::lines::{segments, Segment};
use super::{RawTable, TextLine};

/// One candidate table row: a line and its cell segments.
#[derive(Debug, Clone)]
struct RowData {
    anchor: f32,
    segments: Vec<Segment>,
}

/// A detected table region.
#[derive(Debug, Clone)]
struct DetectedTable {
    right_x: f32,
    columns: Vec<f32>,
    rows: Vec<RowData>,
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Tolerance when matching a segment's left edge to a column (points)
    pub alignment_tolerance: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            alignment_tolerance: 5.0,
        }
    }
}

/// Detects tables among a page's text lines.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables in lines given in reading order.
    ///
    /// Each table's rows are the cell texts of consecutive aligned lines;
    /// its anchor is the first row's first glyph `y0`.
    pub fn detect(&self, lines: &[TextLine]) -> Vec<RawTable> {
        let rows: Vec<RowData> = lines
            .iter()
            .map(|line| RowData {
                anchor: line.chars.first().map(|g| g.y0).unwrap_or(line.bbox.y0),
                segments: segments(line),
            })
            .collect();

        if rows.len() < self.config.min_rows {
            return vec![];
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "TableDetector: {} rows, page columns at {:?}",
            rows.len(),
            columns
        );
        if columns.len() < self.config.min_columns {
            return vec![];
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let table_rows = rows[start..=end].to_vec();

            // Re-detect columns for this specific table region
            let table_columns = self.detect_columns(&table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region, detected as list pattern");
                continue;
            }

            let right_x = table_rows
                .iter()
                .flat_map(|r| r.segments.iter())
                .map(|s| s.x1)
                .fold(f32::NEG_INFINITY, f32::max);

            let detected = DetectedTable {
                right_x,
                columns: table_columns,
                rows: table_rows,
            };
            let raw = self.to_raw_table(&detected);
            log::debug!(
                "TableDetector: table with {} rows x {} columns",
                raw.rows.len(),
                detected.columns.len()
            );
            tables.push(raw);
        }

        tables
    }

    /// Column left edges that recur across rows with two or more segments.
    fn detect_columns(&self, rows: &[RowData]) -> Vec<f32> {
        let multi: Vec<&RowData> = rows.iter().filter(|r| r.segments.len() >= 2).collect();
        if multi.len() < self.config.min_rows {
            return vec![];
        }

        let bucket_size = 5.0;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &multi {
            // Count each bucket only once per row
            let buckets: HashSet<i32> = row
                .segments
                .iter()
                .map(|s| (s.x0 / bucket_size).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((multi.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * bucket_size)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // Merge close edges
        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous runs of rows whose segments align with the columns.
    fn find_table_regions(&self, rows: &[RowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = row.segments.len() >= 2
                && self.alignment_score(row, columns) >= self.config.min_alignment_ratio;

            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }

        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }

    fn alignment_score(&self, row: &RowData, columns: &[f32]) -> f32 {
        if row.segments.is_empty() || columns.is_empty() {
            return 0.0;
        }

        let aligned = row
            .segments
            .iter()
            .filter(|s| {
                columns
                    .iter()
                    .any(|col| (s.x0 - col).abs() <= self.config.alignment_tolerance)
            })
            .count();

        aligned as f32 / row.segments.len() as f32
    }

    /// Assign each segment to a column and join the cell texts.
    fn to_raw_table(&self, detected: &DetectedTable) -> RawTable {
        let rows = detected
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); detected.columns.len()];
                for segment in &row.segments {
                    let col = find_column(segment.x0, &detected.columns, detected.right_x);
                    cells[col].push(segment.text.trim());
                }
                cells.into_iter().map(|parts| parts.join(" ")).collect()
            })
            .collect();

        RawTable {
            rows,
            anchor: detected.rows.first().map(|r| r.anchor).unwrap_or(0.0),
        }
    }

    /// Check if detected table rows actually represent a numbered or bulleted list.
    fn is_list_pattern(&self, rows: &[RowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            if let Some(first) = row.segments.first() {
                let text = first.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;

        // Bullet markers are almost never real table data; numbered markers
        // only disqualify two-column layouts.
        bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
    }
}

/// Column whose span contains `x`, else the nearest column start.
fn find_column(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Check if text is a bullet marker (•, -, etc.).
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "※" | "□" | "◆" | "▶" | "➤"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
