//! Core library for freight contract field extraction.
//!
//! This crate provides:
//! - PDF text extraction (lopdf + pdf-extract) and the contract field rule catalog
//! - XLSX template analysis: cell values, styles, merged ranges and red markers
//! - The red-color rule shared by both document kinds
//! - A diagnostic character/word inspector for PDF pages

pub mod color;
pub mod contract;
pub mod error;
pub mod extract;
pub mod models;
pub mod pdf;
pub mod workbook;

pub use color::{is_red, is_red_hex, ColorValue, RedClassifier};
pub use contract::{extract_contract_fields, ContractExtractor, ContractParser, ExtractionResult};
pub use error::{FreightError, Result};
pub use extract::{
    decode_base64, extract_from_pdf, extract_from_pdf_bytes, extract_from_workbook, inspect_pdf,
    pdf_response, template_grid_from_bytes,
};
pub use models::config::FreightConfig;
pub use models::contract::{ExtractionFailure, FieldMapping, PdfExtraction, PdfExtractionResponse};
pub use models::inspection::{CharInfo, DocumentInspection, PageInspection, WordInfo};
pub use models::workbook::{CellRecord, RedCellMarker, TemplateGrid, WorkbookAnalysis};
pub use pdf::{PdfContent, PdfExtractor, PdfInspector, PdfProcessor};
pub use workbook::{analyze_workbook, load_active_sheet, Sheet, SheetCell, WorkbookAnalyzer};
