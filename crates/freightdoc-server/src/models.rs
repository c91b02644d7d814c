use serde::{Deserialize, Serialize};

/// Body of every upload endpoint: the document as base64.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileRequest {
    pub file: Option<String>,
    /// `/inspect-pdf` only: include per-character records.
    pub chars: bool,
}

/// 400 body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
