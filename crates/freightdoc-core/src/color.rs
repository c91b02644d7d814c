//! Red marker classification shared by the workbook analyzer and the PDF
//! inspector.
//!
//! Contract templates mark their fillable slots with red text. Spreadsheets
//! report font colors as hex strings (`FFFF0000`, only the last six digits
//! count), PDFs report fill colors as float channels in `0..=1`. The two
//! threshold sets are independent and are not numerically equivalent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default minimum red channel for hex colors.
pub const HEX_MIN_RED: u8 = 200;
/// Default maximum green channel for hex colors.
pub const HEX_MAX_GREEN: u8 = 100;
/// Default maximum blue channel for hex colors.
pub const HEX_MAX_BLUE: u8 = 100;

/// Default minimum red channel for float colors.
pub const FLOAT_MIN_RED: f32 = 0.5;
/// Default maximum green channel for float colors.
pub const FLOAT_MAX_GREEN: f32 = 0.3;
/// Default maximum blue channel for float colors.
pub const FLOAT_MAX_BLUE: f32 = 0.3;

/// Thresholds on the 0-255 scale. Bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexThresholds {
    pub min_red: u8,
    pub max_green: u8,
    pub max_blue: u8,
}

impl Default for HexThresholds {
    fn default() -> Self {
        Self {
            min_red: HEX_MIN_RED,
            max_green: HEX_MAX_GREEN,
            max_blue: HEX_MAX_BLUE,
        }
    }
}

/// Thresholds on the 0-1 scale. Bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatThresholds {
    pub min_red: f32,
    pub max_green: f32,
    pub max_blue: f32,
}

impl Default for FloatThresholds {
    fn default() -> Self {
        Self {
            min_red: FLOAT_MIN_RED,
            max_green: FLOAT_MAX_GREEN,
            max_blue: FLOAT_MAX_BLUE,
        }
    }
}

/// A color as reported by one of the document sources.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorValue {
    /// Hex string, `RRGGBB` optionally prefixed with alpha digits.
    Hex(String),
    /// Float RGB channels in `0..=1`.
    Rgb(f32, f32, f32),
}

impl ColorValue {
    /// Build a float color from PDF fill-color operands.
    ///
    /// One component is gray, three are RGB, four are CMYK. Anything else
    /// is not a color we can classify.
    pub fn from_components(components: &[f32]) -> Option<Self> {
        match *components {
            [g] => Some(ColorValue::Rgb(g, g, g)),
            [r, g, b] => Some(ColorValue::Rgb(r, g, b)),
            [c, m, y, k] => Some(ColorValue::Rgb(
                (1.0 - c) * (1.0 - k),
                (1.0 - m) * (1.0 - k),
                (1.0 - y) * (1.0 - k),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorValue::Hex(hex) => f.write_str(hex),
            ColorValue::Rgb(r, g, b) => write!(f, "({r}, {g}, {b})"),
        }
    }
}

/// Red classifier with configurable thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RedClassifier {
    hex: HexThresholds,
    float: FloatThresholds,
}

impl RedClassifier {
    /// Create a classifier with explicit thresholds.
    pub fn new(hex: HexThresholds, float: FloatThresholds) -> Self {
        Self { hex, float }
    }

    /// Classify any color value. Absent colors are never red.
    pub fn is_red(&self, color: Option<&ColorValue>) -> bool {
        match color {
            Some(ColorValue::Hex(hex)) => self.is_red_hex(hex),
            Some(ColorValue::Rgb(r, g, b)) => self.is_red_rgb(*r, *g, *b),
            None => false,
        }
    }

    /// Classify a hex color string. Malformed input is not red.
    pub fn is_red_hex(&self, hex: &str) -> bool {
        match parse_hex_rgb(hex) {
            Some((r, g, b)) => {
                r > self.hex.min_red && g < self.hex.max_green && b < self.hex.max_blue
            }
            None => false,
        }
    }

    /// Classify float channels.
    pub fn is_red_rgb(&self, r: f32, g: f32, b: f32) -> bool {
        r > self.float.min_red && g < self.float.max_green && b < self.float.max_blue
    }
}

/// Classify a color with the default thresholds.
pub fn is_red(color: Option<&ColorValue>) -> bool {
    RedClassifier::default().is_red(color)
}

/// Classify a hex color string with the default thresholds.
pub fn is_red_hex(hex: &str) -> bool {
    RedClassifier::default().is_red_hex(hex)
}

/// Parse the last six hex digits of a color string into RGB channels.
pub fn parse_hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim();
    if hex.len() < 6 || !hex.is_ascii() {
        return None;
    }
    let rgb = &hex[hex.len() - 6..];
    let channel = |i: usize| u8::from_str_radix(&rgb[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
