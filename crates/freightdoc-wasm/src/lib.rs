//! WASM bindings for freight contract extraction.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.
//! PDFs are passed base64-encoded, workbooks as `Uint8Array`.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use freightdoc_core::contract::rules::field_names;
use freightdoc_core::{ContractParser, FreightConfig, FreightError};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Serialize maps as plain objects so field lookups work from JS.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(err: FreightError) -> JsValue {
    let error = js_sys::Error::new(&err.to_string());
    error.set_name(err.kind());
    error.into()
}

/// Extract contract fields from a base64 PDF.
///
/// Resolves to `{ success: true, data, full_text }` or
/// `{ success: false, error, type }`; decode failures are not thrown.
#[wasm_bindgen]
pub fn extract_from_pdf(file: &str) -> Result<JsValue, JsValue> {
    to_js(&freightdoc_core::pdf_response(Some(file), &FreightConfig::default()))
}

/// Structural dump of the active sheet of an XLSX workbook.
#[wasm_bindgen]
pub fn extract_from_workbook(data: &[u8]) -> Result<JsValue, JsValue> {
    let analysis =
        freightdoc_core::extract_from_workbook(data, &FreightConfig::default()).map_err(to_js_error)?;
    to_js(&analysis)
}

/// Run the field rule catalog over already extracted text.
#[wasm_bindgen]
pub fn extract_fields_from_text(text: &str) -> Result<JsValue, JsValue> {
    to_js(&freightdoc_core::extract_contract_fields(text))
}

/// Names of every contract field in catalog order.
#[wasm_bindgen]
pub fn contract_field_names() -> Result<JsValue, JsValue> {
    to_js(&field_names().collect::<Vec<_>>())
}

/// Red-marker rule for spreadsheet hex colors (`FF0000`, `FFFF0000`).
#[wasm_bindgen]
pub fn is_red(hex: &str) -> bool {
    freightdoc_core::is_red_hex(hex)
}

/// Red-marker rule for float RGB channels in `0..=1`.
#[wasm_bindgen]
pub fn is_red_rgb(r: f32, g: f32, b: f32) -> bool {
    freightdoc_core::RedClassifier::default().is_red_rgb(r, g, b)
}

/// Configurable extractor for browser use.
#[wasm_bindgen]
pub struct FreightExtractor {
    config: FreightConfig,
}

#[wasm_bindgen]
impl FreightExtractor {
    /// Create an extractor; `config` is an optional partial configuration object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<FreightExtractor, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            FreightConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        Ok(Self { config })
    }

    /// Current configuration as a plain object.
    #[wasm_bindgen]
    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_js(&self.config)
    }

    /// Extract contract fields from a base64 PDF.
    #[wasm_bindgen]
    pub fn extract_pdf(&self, file: &str) -> Result<JsValue, JsValue> {
        to_js(&freightdoc_core::pdf_response(Some(file), &self.config))
    }

    /// Extract contract fields from text with this extractor's rule scoping.
    #[wasm_bindgen]
    pub fn extract_text(&self, text: &str) -> Result<JsValue, JsValue> {
        let result = ContractParser::from_config(&self.config.extraction).parse(text);
        to_js(&result.fields)
    }

    /// Structural dump of the active sheet.
    #[wasm_bindgen]
    pub fn extract_workbook(&self, data: &[u8]) -> Result<JsValue, JsValue> {
        let analysis = freightdoc_core::extract_from_workbook(data, &self.config).map_err(to_js_error)?;
        to_js(&analysis)
    }

    /// Dense template grid of the active sheet.
    #[wasm_bindgen]
    pub fn template_grid(&self, data: &[u8]) -> Result<JsValue, JsValue> {
        let grid = freightdoc_core::template_grid_from_bytes(data, &self.config).map_err(to_js_error)?;
        to_js(&grid)
    }

    /// Character/word inspection of every page.
    #[wasm_bindgen]
    pub fn inspect_pdf(&self, data: &[u8], include_chars: bool) -> Result<JsValue, JsValue> {
        let inspection =
            freightdoc_core::inspect_pdf(data, &self.config, include_chars).map_err(to_js_error)?;
        to_js(&inspection)
    }
}
