//! Cell-grid records produced by the workbook analyzer.
//!
//! Style descriptors are typed optionals: a cell without a border carries
//! `border: None` instead of failing the traversal.

use serde::{Deserialize, Serialize};

/// Used range of a sheet, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub min_row: u32,
    pub max_row: u32,
    pub min_column: u32,
    pub max_column: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            min_row: 1,
            max_row: 1,
            min_column: 1,
            max_column: 1,
        }
    }
}

/// A rectangular block of merged cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRange {
    /// Range in A1 notation, e.g. `A1:C2`.
    pub range: String,
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

/// Cell data type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "n")]
    Numeric,
    #[serde(rename = "s")]
    String,
    #[serde(rename = "b")]
    Bool,
    #[serde(rename = "d")]
    Date,
    #[serde(rename = "e")]
    Error,
    #[serde(rename = "f")]
    Formula,
}

impl DataType {
    /// One-letter tag as serialized.
    pub fn code(&self) -> &'static str {
        match self {
            DataType::Numeric => "n",
            DataType::String => "s",
            DataType::Bool => "b",
            DataType::Date => "d",
            DataType::Error => "e",
            DataType::Formula => "f",
        }
    }
}

/// Font descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    /// Underline style (`single`, `double`, ...), absent when not underlined.
    pub underline: Option<String>,
    /// ARGB hex color, absent for theme/automatic colors.
    pub color: Option<String>,
}

/// Fill descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInfo {
    #[serde(rename = "patternType")]
    pub pattern_type: Option<String>,
    #[serde(rename = "fgColor")]
    pub fg_color: Option<String>,
    #[serde(rename = "bgColor")]
    pub bg_color: Option<String>,
}

/// Alignment descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentInfo {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub text_rotation: u32,
}

/// Border style per side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderInfo {
    pub left: Option<String>,
    pub right: Option<String>,
    pub top: Option<String>,
    pub bottom: Option<String>,
}

impl BorderInfo {
    /// Whether any side has a style.
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }
}

/// Full observable state of one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub coordinate: String,
    pub row: u32,
    pub column: u32,
    /// Value as text, empty when the cell has no value.
    pub value: String,
    pub data_type: DataType,
    pub font: Option<FontInfo>,
    pub fill: Option<FillInfo>,
    pub alignment: Option<AlignmentInfo>,
    pub border: Option<BorderInfo>,
}

/// A cell whose font color is red, marking a template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedCellMarker {
    pub coordinate: String,
    pub row: u32,
    pub column: u32,
    pub value: String,
    pub color_rgb: String,
}

/// Aggregates derived from the analysis lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookSummary {
    pub total_cells_with_data: usize,
    pub total_merged_ranges: usize,
    pub total_red_cells: usize,
    /// `"A1: value"` per red cell.
    pub red_cells_list: Vec<String>,
}

/// Structural dump of the active sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookAnalysis {
    pub sheet_name: String,
    pub dimensions: Dimensions,
    pub merged_cells: Vec<MergedRange>,
    pub cells: Vec<CellRecord>,
    pub red_cells: Vec<RedCellMarker>,
    pub summary: WorkbookSummary,
}

/// One position of the template grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub value: String,
    pub is_red: bool,
    pub is_bold: bool,
    pub font_size: Option<f64>,
}

/// Dense `max_row x max_column` view used by the template editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateGrid {
    pub sheet_name: String,
    pub max_row: u32,
    pub max_column: u32,
    pub merged_cells: Vec<String>,
    pub rows: Vec<Vec<GridCell>>,
}
