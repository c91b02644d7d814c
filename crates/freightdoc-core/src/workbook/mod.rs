//! XLSX workbook loading and cell-grid analysis.
//!
//! The loader turns an OOXML package into a [`Sheet`]: cells keyed by
//! position with their rendered value and resolved style. The analyzer walks
//! that sheet to produce the structural dump and the template grid.

mod analyzer;
mod styles;
mod xlsx;

pub use analyzer::{analyze_workbook, template_grid, WorkbookAnalyzer};
pub use styles::{indexed_color, StyleSheet};
pub use xlsx::load_active_sheet;

#[cfg(test)]
pub(crate) use xlsx::fixtures;

use std::collections::BTreeMap;

use crate::error::WorkbookError;
use crate::models::workbook::{
    AlignmentInfo, BorderInfo, DataType, Dimensions, FillInfo, FontInfo, MergedRange,
};

/// Last addressable worksheet row.
pub const MAX_ROWS: u32 = 1_048_576;
/// Last addressable worksheet column (`XFD`).
pub const MAX_COLUMNS: u32 = 16_384;

/// Convert a 1-based column index to letters (`1` -> `A`, `27` -> `AA`).
pub fn column_letters(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        letters.push(b'A' + rem);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 label of a position.
pub fn coordinate(row: u32, column: u32) -> String {
    format!("{}{}", column_letters(column), row)
}

/// Parse an A1 reference into `(row, column)`. `$` anchors are ignored and
/// positions outside the worksheet grid are rejected.
pub fn parse_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let column = letters
        .chars()
        .fold(0u32, |acc, c| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1));
    let row: u32 = digits.parse().ok()?;
    ((1..=MAX_ROWS).contains(&row) && column <= MAX_COLUMNS).then_some((row, column))
}

/// Parse a range like `A1:C2` (a single reference is a 1x1 range).
pub fn parse_range(range: &str) -> Result<MergedRange, WorkbookError> {
    let invalid = || WorkbookError::InvalidReference(range.to_string());
    let (start, end) = range.split_once(':').unwrap_or((range, range));
    let (r1, c1) = parse_reference(start).ok_or_else(invalid)?;
    let (r2, c2) = parse_reference(end).ok_or_else(invalid)?;

    Ok(MergedRange {
        range: range.trim().to_string(),
        min_row: r1.min(r2),
        max_row: r1.max(r2),
        min_col: c1.min(c2),
        max_col: c1.max(c2),
    })
}

/// One stored cell of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetCell {
    /// Rendered value, `None` for a cell that only carries a style.
    pub value: Option<String>,
    pub data_type: DataType,
    pub font: Option<FontInfo>,
    pub fill: Option<FillInfo>,
    pub alignment: Option<AlignmentInfo>,
    pub border: Option<BorderInfo>,
}

impl SheetCell {
    /// An unstyled numeric-typed empty cell.
    pub fn empty() -> Self {
        Self {
            value: None,
            data_type: DataType::Numeric,
            font: None,
            fill: None,
            alignment: None,
            border: None,
        }
    }

    /// A string cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            data_type: DataType::String,
            ..Self::empty()
        }
    }

    /// A numeric cell.
    pub fn number(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::empty()
        }
    }

    pub fn with_font(mut self, font: FontInfo) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_fill(mut self, fill: FillInfo) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentInfo) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_border(mut self, border: BorderInfo) -> Self {
        self.border = Some(border);
        self
    }

    /// Font color as stored, if any.
    pub fn font_color(&self) -> Option<&str> {
        self.font.as_ref().and_then(|f| f.color.as_deref())
    }
}

/// The active worksheet of a workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// Workbook default font; a cell font equal to it is not "non-default".
    pub default_font: Option<FontInfo>,
    cells: BTreeMap<(u32, u32), SheetCell>,
    merged: Vec<MergedRange>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Store a cell at a 1-based position, replacing any previous one.
    pub fn insert(&mut self, row: u32, column: u32, cell: SheetCell) {
        self.cells.insert((row, column), cell);
    }

    /// Builder form of [`Sheet::insert`] taking an A1 label.
    pub fn with_cell(mut self, reference: &str, cell: SheetCell) -> Result<Self, WorkbookError> {
        let (row, column) = parse_reference(reference)
            .ok_or_else(|| WorkbookError::InvalidReference(reference.to_string()))?;
        self.insert(row, column, cell);
        Ok(self)
    }

    /// Register a merged range in A1 notation.
    pub fn add_merged(&mut self, range: &str) -> Result<(), WorkbookError> {
        self.merged.push(parse_range(range)?);
        Ok(())
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<&SheetCell> {
        self.cells.get(&(row, column))
    }

    /// Stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&(u32, u32), &SheetCell)> {
        self.cells.iter()
    }

    pub fn merged_ranges(&self) -> &[MergedRange] {
        &self.merged
    }

    /// Used range covering stored cells and merged ranges, `1` on every
    /// bound for an empty sheet.
    pub fn dimensions(&self) -> Dimensions {
        let bounds = self
            .cells
            .keys()
            .map(|&(row, col)| (row, row, col, col))
            .chain(
                self.merged
                    .iter()
                    .map(|m| (m.min_row, m.max_row, m.min_col, m.max_col)),
            )
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1), a.2.min(b.2), a.3.max(b.3)));

        match bounds {
            Some((min_row, max_row, min_column, max_column)) => Dimensions {
                min_row,
                max_row,
                min_column,
                max_column,
            },
            None => Dimensions::default(),
        }
    }

    /// Whether a cell carries a font other than the workbook default.
    pub fn has_custom_font(&self, cell: &SheetCell) -> bool {
        cell.font.is_some() && cell.font != self.default_font
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(coordinate(12, 2), "B12");
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("A1"), Some((1, 1)));
        assert_eq!(parse_reference("$AB$12"), Some((12, 28)));
        assert_eq!(parse_reference("a3"), Some((3, 1)));
        assert_eq!(parse_reference("A0"), None);
        assert_eq!(parse_reference("12"), None);
        assert_eq!(parse_reference("Ж1"), None);
    }

    #[test]
    fn test_parse_reference_grid_limits() {
        assert_eq!(parse_reference("XFD1048576"), Some((MAX_ROWS, MAX_COLUMNS)));
        assert_eq!(parse_reference("XFE1"), None);
        assert_eq!(parse_reference("A1048577"), None);
        assert_eq!(parse_reference("A4294967296"), None);
        assert!(matches!(parse_range("A1:ZZZ1"), Err(WorkbookError::InvalidReference(_))));
    }

    #[test]
    fn test_parse_range() {
        let range = parse_range("A1:C2").unwrap();
        assert_eq!((range.min_row, range.max_row, range.min_col, range.max_col), (1, 2, 1, 3));
        assert_eq!(range.range, "A1:C2");

        let single = parse_range("D4").unwrap();
        assert_eq!((single.min_row, single.max_col), (4, 4));
        assert!(matches!(parse_range("A1:??"), Err(WorkbookError::InvalidReference(_))));
    }

    #[test]
    fn test_dimensions_include_merged_ranges() {
        let mut sheet = Sheet::new("Лист1")
            .with_cell("B2", SheetCell::text("x"))
            .unwrap();
        assert_eq!(
            sheet.dimensions(),
            Dimensions { min_row: 2, max_row: 2, min_column: 2, max_column: 2 }
        );

        sheet.add_merged("B2:D5").unwrap();
        assert_eq!(sheet.dimensions().max_row, 5);
        assert_eq!(sheet.dimensions().max_column, 4);
    }

    #[test]
    fn test_empty_sheet_dimensions() {
        assert_eq!(Sheet::new("empty").dimensions(), Dimensions::default());
    }

    #[test]
    fn test_custom_font_against_default() {
        let default = FontInfo { name: Some("Calibri".into()), size: Some(11.0), ..FontInfo::default() };
        let mut sheet = Sheet::new("s");
        sheet.default_font = Some(default.clone());

        assert!(!sheet.has_custom_font(&SheetCell::empty()));
        assert!(!sheet.has_custom_font(&SheetCell::empty().with_font(default.clone())));
        let bold = FontInfo { bold: true, ..default };
        assert!(sheet.has_custom_font(&SheetCell::empty().with_font(bold)));
    }
}
