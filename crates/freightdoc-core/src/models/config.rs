//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

use crate::color::{FloatThresholds, HexThresholds, RedClassifier};

/// Main configuration for the freightdoc pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreightConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Contract field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Red marker classification thresholds.
    pub color: ColorConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Try the empty user password on encrypted documents.
    pub decrypt_empty_password: bool,

    /// Maximum pages to read (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            decrypt_empty_password: true,
            max_pages: 0,
        }
    }
}

/// Contract field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Match carrier identity fields only after the "Перевозчик:" label.
    pub scope_carrier_fields: bool,

    /// Return the concatenated document text alongside the fields.
    pub include_full_text: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scope_carrier_fields: false,
            include_full_text: true,
        }
    }
}

/// Thresholds for the two color representations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Thresholds for spreadsheet hex colors (0-255 channels).
    pub hex: HexThresholds,

    /// Thresholds for PDF float colors (0-1 channels).
    pub float: FloatThresholds,
}

impl ColorConfig {
    /// Build the classifier these thresholds describe.
    pub fn classifier(&self) -> RedClassifier {
        RedClassifier::new(self.hex, self.float)
    }
}

impl FreightConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
