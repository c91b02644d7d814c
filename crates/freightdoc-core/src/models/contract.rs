//! Contract field extraction results and the PDF wire payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to extracted value. Every catalog field is always present;
/// unmatched fields hold the rule default.
pub type FieldMapping = BTreeMap<String, String>;

/// Successful PDF extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfExtraction {
    /// Always `true`.
    pub success: bool,
    /// Extracted contract fields.
    pub data: FieldMapping,
    /// Concatenated page text the fields were extracted from.
    pub full_text: String,
}

impl PdfExtraction {
    pub fn new(data: FieldMapping, full_text: String) -> Self {
        Self {
            success: true,
            data,
            full_text,
        }
    }
}

/// Failure payload returned instead of a partial result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message from the failing decoder.
    pub error: String,
    /// Error type name.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ExtractionFailure {
    pub fn new(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            kind: kind.into(),
        }
    }
}

impl From<&crate::FreightError> for ExtractionFailure {
    fn from(err: &crate::FreightError) -> Self {
        Self::new(err.to_string(), err.kind())
    }
}

/// Either a complete extraction or a single explicit error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PdfExtractionResponse {
    Success(PdfExtraction),
    Failure(ExtractionFailure),
}

impl PdfExtractionResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, PdfExtractionResponse::Success(_))
    }
}

impl From<crate::Result<PdfExtraction>> for PdfExtractionResponse {
    fn from(result: crate::Result<PdfExtraction>) -> Self {
        match result {
            Ok(extraction) => PdfExtractionResponse::Success(extraction),
            Err(err) => PdfExtractionResponse::Failure(ExtractionFailure::from(&err)),
        }
    }
}
