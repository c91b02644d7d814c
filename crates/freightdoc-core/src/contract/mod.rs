//! Contract field extraction from flattened document text.

mod parser;
pub mod rules;

pub use parser::{extract_contract_fields, ContractParser, ExtractionResult};
pub use rules::{FieldRule, FIELD_RULES};

use crate::models::contract::FieldMapping;

/// Trait for contract field extractors.
pub trait ContractExtractor {
    /// Extract the full field mapping from plain text.
    fn extract_fields(&self, text: &str) -> FieldMapping;
}
