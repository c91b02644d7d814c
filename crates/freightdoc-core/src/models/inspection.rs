//! Output of the diagnostic PDF character/word inspector.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A word token with its bounding box in top-left page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordInfo {
    pub text: String,
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
    pub fontname: String,
    pub size: f32,
}

/// A single decoded character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharInfo {
    pub text: String,
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
    pub fontname: String,
    pub size: f32,
    /// Non-stroking (fill) color components as set by the content stream.
    pub non_stroking_color: Vec<f32>,
    pub is_red: bool,
}

/// Inspection report for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInspection {
    /// 1-based page number.
    pub page: u32,
    pub width: f32,
    pub height: f32,
    pub words: Vec<WordInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub chars: Vec<CharInfo>,
    pub unique_fonts: BTreeSet<String>,
    pub unique_colors: BTreeSet<String>,
    /// Red characters concatenated in content-stream order.
    pub red_text: String,
}

/// Inspection report for a whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInspection {
    pub total_pages: u32,
    pub pages: Vec<PageInspection>,
}
