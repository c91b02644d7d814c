//! Document entry points shared by the CLI, the HTTP service and the WASM
//! bindings.
//!
//! PDF input arrives base64-encoded on the wire (optionally as a `data:` URL),
//! workbooks and inspection input as raw bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info};

use crate::contract::ContractParser;
use crate::error::{InputError, Result};
use crate::models::config::FreightConfig;
use crate::models::contract::{PdfExtraction, PdfExtractionResponse};
use crate::models::inspection::DocumentInspection;
use crate::models::workbook::{TemplateGrid, WorkbookAnalysis};
use crate::pdf::{PdfExtractor, PdfInspector, PdfProcessor};
use crate::workbook::{load_active_sheet, WorkbookAnalyzer};

/// Decode a base64 payload, accepting a `data:...;base64,` prefix.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => trimmed,
    };
    if payload.is_empty() {
        return Err(InputError::Missing.into());
    }

    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(cleaned).map_err(InputError::from)?;
    Ok(bytes)
}

/// Extract contract fields from a base64-encoded PDF.
pub fn extract_from_pdf(file: Option<&str>, config: &FreightConfig) -> Result<PdfExtraction> {
    let encoded = file.ok_or(InputError::Missing)?;
    let data = decode_base64(encoded)?;
    extract_from_pdf_bytes(&data, config)
}

/// Extract contract fields from raw PDF bytes.
pub fn extract_from_pdf_bytes(data: &[u8], config: &FreightConfig) -> Result<PdfExtraction> {
    if data.is_empty() {
        return Err(InputError::Missing.into());
    }

    let mut extractor = PdfExtractor::with_config(&config.pdf);
    extractor.load(data)?;
    let content = extractor.extract_all()?;

    let parser = ContractParser::from_config(&config.extraction);
    let result = parser.parse(&content.text);
    info!(
        "Extracted {}/{} contract fields from {} pages",
        result.matched(),
        result.fields.len(),
        content.pages.len()
    );

    let full_text = if config.extraction.include_full_text {
        content.text
    } else {
        String::new()
    };
    Ok(PdfExtraction::new(result.fields, full_text))
}

/// Wire form of [`extract_from_pdf`]: success payload or `{success: false, error, type}`.
pub fn pdf_response(file: Option<&str>, config: &FreightConfig) -> PdfExtractionResponse {
    extract_from_pdf(file, config).into()
}

/// Structural dump of the active sheet of an XLSX workbook.
pub fn extract_from_workbook(data: &[u8], config: &FreightConfig) -> Result<WorkbookAnalysis> {
    if data.is_empty() {
        return Err(InputError::Missing.into());
    }
    let sheet = load_active_sheet(data)?;
    let analyzer = WorkbookAnalyzer::new().with_classifier(config.color.classifier());
    let analysis = analyzer.analyze(&sheet);
    info!(
        "Analyzed sheet '{}': {} cells, {} red",
        analysis.sheet_name, analysis.summary.total_cells_with_data, analysis.summary.total_red_cells
    );
    Ok(analysis)
}

/// Dense template grid of the active sheet.
pub fn template_grid_from_bytes(data: &[u8], config: &FreightConfig) -> Result<TemplateGrid> {
    if data.is_empty() {
        return Err(InputError::Missing.into());
    }
    let sheet = load_active_sheet(data)?;
    Ok(WorkbookAnalyzer::new()
        .with_classifier(config.color.classifier())
        .template_grid(&sheet)?)
}

/// Run the character/word inspector over every page of a PDF.
pub fn inspect_pdf(data: &[u8], config: &FreightConfig, include_chars: bool) -> Result<DocumentInspection> {
    if data.is_empty() {
        return Err(InputError::Missing.into());
    }
    let inspection = PdfInspector::new()
        .with_classifier(config.color.classifier())
        .with_chars(include_chars)
        .inspect_bytes(data, &config.pdf)?;
    debug!("Inspected {} pages", inspection.total_pages);
    Ok(inspection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FreightError, PdfError, WorkbookError};
    use crate::pdf::fixtures::{pdf_with_pages, show_text};
    use crate::workbook::fixtures::template_workbook;
    use pretty_assertions::assert_eq;

    fn contract_pdf() -> Vec<u8> {
        pdf_with_pages(vec![
            show_text(50, 800, 12, "INN 7707083893"),
            show_text(50, 800, 12, "Page two"),
        ])
    }

    #[test]
    fn test_decode_base64_variants() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64("data:application/pdf;base64,aGVs\nbG8=").unwrap(), b"hello");
        assert!(matches!(
            decode_base64("  "),
            Err(FreightError::Input(InputError::Missing))
        ));
        assert!(matches!(
            decode_base64("not base64!"),
            Err(FreightError::Input(InputError::Base64(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = extract_from_pdf(None, &FreightConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "InputMissing");
    }

    #[test]
    fn test_pdf_extraction_keeps_every_field() {
        let encoded = STANDARD.encode(contract_pdf());
        let extraction = extract_from_pdf(Some(&encoded), &FreightConfig::default()).unwrap();

        assert!(extraction.success);
        assert_eq!(extraction.data.len(), crate::contract::FIELD_RULES.len());
        assert!(extraction.full_text.contains("7707083893"));
        assert!(extraction.full_text.ends_with("\n\n"));
        assert!(extraction.full_text.find("INN").unwrap() < extraction.full_text.find("Page two").unwrap());
    }

    #[test]
    fn test_full_text_can_be_omitted() {
        let mut config = FreightConfig::default();
        config.extraction.include_full_text = false;
        let extraction = extract_from_pdf_bytes(&contract_pdf(), &config).unwrap();
        assert_eq!(extraction.full_text, "");
    }

    #[test]
    fn test_invalid_pdf_is_explicit_failure() {
        let encoded = STANDARD.encode(b"%PDF-1.4 truncated");
        let response = pdf_response(Some(&encoded), &FreightConfig::default());
        assert!(!response.is_success());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["type"], "PdfParseError");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_workbook_entry_points() {
        let config = FreightConfig::default();
        let analysis = extract_from_workbook(&template_workbook(), &config).unwrap();
        assert_eq!(analysis.summary.total_red_cells, 2);

        let grid = template_grid_from_bytes(&template_workbook(), &config).unwrap();
        assert_eq!(grid.sheet_name, analysis.sheet_name);

        let err = extract_from_workbook(b"garbage", &config).unwrap_err();
        assert!(matches!(err, FreightError::Workbook(WorkbookError::Archive(_))));
        assert!(matches!(
            extract_from_workbook(&[], &config),
            Err(FreightError::Input(InputError::Missing))
        ));
    }

    #[test]
    fn test_inspect_pdf() {
        let inspection = inspect_pdf(&contract_pdf(), &FreightConfig::default(), false).unwrap();
        assert_eq!(inspection.total_pages, 2);
        assert!(inspection.pages[0].chars.is_empty());
        assert_eq!(inspection.pages[1].words[0].text, "Page");

        let err = inspect_pdf(b"nope", &FreightConfig::default(), true).unwrap_err();
        assert!(matches!(err, FreightError::Pdf(PdfError::Parse(_))));
    }
}
