//! Cell-grid analysis of the active sheet.

use tracing::debug;

use super::{coordinate, Sheet, SheetCell};
use crate::color::RedClassifier;
use crate::error::WorkbookError;
use crate::models::workbook::{
    CellRecord, GridCell, RedCellMarker, TemplateGrid, WorkbookAnalysis, WorkbookSummary,
};

/// Largest `max_row x max_column` area rendered as a template grid.
pub const MAX_GRID_CELLS: u64 = 100_000;

/// Walks a sheet row-major and derives records, red markers and summary.
#[derive(Debug, Clone, Default)]
pub struct WorkbookAnalyzer {
    classifier: RedClassifier,
}

impl WorkbookAnalyzer {
    /// Create an analyzer with the default red thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a configured red classifier.
    pub fn with_classifier(mut self, classifier: RedClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    fn is_red(&self, cell: &SheetCell) -> bool {
        cell.font_color()
            .map(|color| self.classifier.is_red_hex(color))
            .unwrap_or(false)
    }

    /// A cell is reported when it has a value, a non-default font or a fill.
    fn is_reported(sheet: &Sheet, cell: &SheetCell) -> bool {
        cell.value.is_some() || sheet.has_custom_font(cell) || cell.fill.is_some()
    }

    /// Structural dump of the sheet.
    pub fn analyze(&self, sheet: &Sheet) -> WorkbookAnalysis {
        let dimensions = sheet.dimensions();
        let mut cells = Vec::new();
        let mut red_cells = Vec::new();

        for (&(row, column), cell) in sheet.cells() {
            if !Self::is_reported(sheet, cell) {
                continue;
            }

            let record = CellRecord {
                coordinate: coordinate(row, column),
                row,
                column,
                value: cell.value.clone().unwrap_or_default(),
                data_type: cell.data_type,
                font: cell.font.clone(),
                fill: cell.fill.clone(),
                alignment: cell.alignment.clone(),
                border: cell.border.clone(),
            };

            if self.is_red(cell) {
                red_cells.push(RedCellMarker {
                    coordinate: record.coordinate.clone(),
                    row,
                    column,
                    value: record.value.clone(),
                    color_rgb: cell.font_color().unwrap_or_default().to_string(),
                });
            }
            cells.push(record);
        }

        let merged_cells = sheet.merged_ranges().to_vec();
        let summary = WorkbookSummary {
            total_cells_with_data: cells.len(),
            total_merged_ranges: merged_cells.len(),
            total_red_cells: red_cells.len(),
            red_cells_list: red_cells
                .iter()
                .map(|c| format!("{}: {}", c.coordinate, c.value))
                .collect(),
        };

        debug!(
            "Analyzed '{}': {} cells, {} merged ranges, {} red cells",
            sheet.name, summary.total_cells_with_data, summary.total_merged_ranges, summary.total_red_cells
        );

        WorkbookAnalysis {
            sheet_name: sheet.name.clone(),
            dimensions,
            merged_cells,
            cells,
            red_cells,
            summary,
        }
    }

    /// Dense grid over `1..=max_row x 1..=max_column` for the template editor.
    ///
    /// Fails with [`WorkbookError::GridTooLarge`] when the area exceeds
    /// [`MAX_GRID_CELLS`].
    pub fn template_grid(&self, sheet: &Sheet) -> Result<TemplateGrid, WorkbookError> {
        let dimensions = sheet.dimensions();
        if u64::from(dimensions.max_row) * u64::from(dimensions.max_column) > MAX_GRID_CELLS {
            return Err(WorkbookError::GridTooLarge {
                rows: dimensions.max_row,
                columns: dimensions.max_column,
            });
        }
        let rows = (1..=dimensions.max_row)
            .map(|row| {
                (1..=dimensions.max_column)
                    .map(|column| match sheet.cell(row, column) {
                        Some(cell) => GridCell {
                            value: cell.value.clone().unwrap_or_default(),
                            is_red: self.is_red(cell),
                            is_bold: cell.font.as_ref().is_some_and(|f| f.bold),
                            font_size: cell.font.as_ref().and_then(|f| f.size),
                        },
                        None => GridCell {
                            font_size: sheet.default_font.as_ref().and_then(|f| f.size),
                            ..GridCell::default()
                        },
                    })
                    .collect()
            })
            .collect();

        Ok(TemplateGrid {
            sheet_name: sheet.name.clone(),
            max_row: dimensions.max_row,
            max_column: dimensions.max_column,
            merged_cells: sheet.merged_ranges().iter().map(|m| m.range.clone()).collect(),
            rows,
        })
    }
}

/// Analyze a sheet with the default thresholds.
pub fn analyze_workbook(sheet: &Sheet) -> WorkbookAnalysis {
    WorkbookAnalyzer::new().analyze(sheet)
}

/// Template grid with the default thresholds.
pub fn template_grid(sheet: &Sheet) -> Result<TemplateGrid, WorkbookError> {
    WorkbookAnalyzer::new().template_grid(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{FloatThresholds, HexThresholds};
    use crate::models::workbook::{FillInfo, FontInfo};
    use crate::workbook::load_active_sheet;
    use crate::workbook::xlsx::fixtures::template_workbook;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn red_font() -> FontInfo {
        FontInfo {
            color: Some("FF0000".to_string()),
            ..FontInfo::default()
        }
    }

    fn two_by_two() -> Sheet {
        Sheet::new("Лист1")
            .with_cell("A1", SheetCell::text("X").with_font(red_font()))
            .unwrap()
            .with_cell("B2", SheetCell::empty())
            .unwrap()
    }

    #[test]
    fn test_single_red_cell() {
        let analysis = analyze_workbook(&two_by_two());

        assert_eq!(analysis.dimensions.max_row, 2);
        assert_eq!(analysis.dimensions.max_column, 2);
        assert_eq!(analysis.cells.len(), 1);
        assert_eq!(analysis.cells[0].coordinate, "A1");
        assert_eq!(analysis.red_cells.len(), 1);
        assert_eq!(analysis.red_cells[0].coordinate, "A1");
        assert_eq!(analysis.red_cells[0].color_rgb, "FF0000");
        assert_eq!(analysis.summary.red_cells_list, vec!["A1: X".to_string()]);
    }

    #[test]
    fn test_value_alone_is_reported_but_not_red() {
        let sheet = Sheet::new("s").with_cell("C3", SheetCell::number("42")).unwrap();
        let analysis = analyze_workbook(&sheet);

        assert_eq!(analysis.cells.len(), 1);
        assert_eq!(analysis.cells[0].value, "42");
        assert_eq!(analysis.cells[0].font, None);
        assert!(analysis.red_cells.is_empty());
    }

    #[test]
    fn test_styled_empty_cells() {
        let sheet = Sheet::new("s")
            .with_cell(
                "A1",
                SheetCell::empty().with_fill(FillInfo {
                    pattern_type: Some("solid".into()),
                    fg_color: Some("FFFFFF00".into()),
                    bg_color: None,
                }),
            )
            .unwrap()
            .with_cell("A2", SheetCell::empty().with_font(red_font()))
            .unwrap();
        let analysis = analyze_workbook(&sheet);

        assert_eq!(analysis.cells.len(), 2);
        assert_eq!(analysis.cells[1].value, "");
        assert_eq!(analysis.red_cells.len(), 1);
        assert_eq!(analysis.summary.red_cells_list, vec!["A2: ".to_string()]);
    }

    #[test]
    fn test_summary_matches_lists_and_red_subset() {
        let sheet = load_active_sheet(&template_workbook()).unwrap();
        let analysis = analyze_workbook(&sheet);

        assert_eq!(analysis.cells.len(), analysis.summary.total_cells_with_data);
        assert_eq!(analysis.merged_cells.len(), analysis.summary.total_merged_ranges);
        assert_eq!(analysis.red_cells.len(), analysis.summary.total_red_cells);

        let coordinates: HashSet<_> = analysis.cells.iter().map(|c| c.coordinate.as_str()).collect();
        for red in &analysis.red_cells {
            assert!(coordinates.contains(red.coordinate.as_str()));
        }
    }

    #[test]
    fn test_template_workbook_analysis() {
        let sheet = load_active_sheet(&template_workbook()).unwrap();
        let analysis = analyze_workbook(&sheet);

        assert_eq!(analysis.sheet_name, "Д-З");
        let coordinates: Vec<_> = analysis.cells.iter().map(|c| c.coordinate.as_str()).collect();
        assert_eq!(
            coordinates,
            vec!["A1", "A2", "B2", "C2", "A3", "B3", "C3", "D3", "A4", "B4", "C4", "D4"]
        );
        assert_eq!(
            analysis.summary.red_cells_list,
            vec!["B2: ФИО водителя".to_string(), "D4: 7".to_string()]
        );
        assert_eq!(analysis.merged_cells[0].max_col, 3);
    }

    #[test]
    fn test_idempotent() {
        let data = template_workbook();
        let first = serde_json::to_string(&analyze_workbook(&load_active_sheet(&data).unwrap())).unwrap();
        let second = serde_json::to_string(&analyze_workbook(&load_active_sheet(&data).unwrap())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_configured_thresholds() {
        let sheet = Sheet::new("s")
            .with_cell(
                "A1",
                SheetCell::text("v").with_font(FontInfo {
                    color: Some("FFC00000".into()),
                    ..FontInfo::default()
                }),
            )
            .unwrap();
        assert!(analyze_workbook(&sheet).red_cells.is_empty());

        let lenient = WorkbookAnalyzer::new().with_classifier(RedClassifier::new(
            HexThresholds {
                min_red: 150,
                ..HexThresholds::default()
            },
            FloatThresholds::default(),
        ));
        assert_eq!(lenient.analyze(&sheet).red_cells.len(), 1);
    }

    #[test]
    fn test_far_corner_cell_is_reported_without_dense_walk() {
        let sheet = Sheet::new("s")
            .with_cell("A1", SheetCell::text("Заказчик"))
            .unwrap()
            .with_cell("XFD1048576", SheetCell::text("хвост"))
            .unwrap();

        let analysis = analyze_workbook(&sheet);
        assert_eq!(analysis.dimensions.max_row, 1_048_576);
        assert_eq!(analysis.dimensions.max_column, 16_384);
        let coordinates: Vec<_> = analysis.cells.iter().map(|c| c.coordinate.as_str()).collect();
        assert_eq!(coordinates, vec!["A1", "XFD1048576"]);

        assert!(matches!(
            template_grid(&sheet),
            Err(WorkbookError::GridTooLarge { rows: 1_048_576, columns: 16_384 })
        ));
    }

    #[test]
    fn test_template_grid() {
        let sheet = load_active_sheet(&template_workbook()).unwrap();
        let grid = template_grid(&sheet).unwrap();

        assert_eq!(grid.max_row, 4);
        assert_eq!(grid.max_column, 4);
        assert_eq!(grid.rows.len(), 4);
        assert!(grid.rows.iter().all(|r| r.len() == 4));
        assert_eq!(grid.merged_cells, vec!["A1:C1".to_string()]);

        let variable = &grid.rows[1][1];
        assert_eq!(variable.value, "ФИО водителя");
        assert!(variable.is_red);
        assert!(variable.is_bold);
        assert_eq!(variable.font_size, Some(12.0));

        // B1 is inside the merged title and has no cell of its own
        let blank = &grid.rows[0][1];
        assert_eq!(blank.value, "");
        assert!(!blank.is_red);
        assert_eq!(blank.font_size, Some(11.0));
    }
}
