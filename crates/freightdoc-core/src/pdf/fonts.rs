//! Font resources for content-stream decoding: character codes to Unicode
//! through ToUnicode CMaps, and glyph advance widths.

use std::collections::HashMap;

use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::trace;

/// Advance width used when a font carries no metrics, in glyph space units.
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Largest bfrange expanded into the code table.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

lazy_static! {
    static ref CMAP_TOKEN: Regex = Regex::new(r"<([0-9A-Fa-f\s]*)>|\[|\]|[A-Za-z]+").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(String),
    Open,
    Close,
    Word(String),
}

fn tokenize(text: &str) -> Vec<Token> {
    CMAP_TOKEN
        .captures_iter(text)
        .map(|caps| match caps.get(1) {
            Some(hex) => Token::Hex(hex.as_str().split_whitespace().collect()),
            None => match &caps[0] {
                "[" => Token::Open,
                "]" => Token::Close,
                word => Token::Word(word.to_string()),
            },
        })
        .collect()
}

fn parse_code(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Destination strings are UTF-16BE.
fn utf16_units(hex: &str) -> Vec<u16> {
    if hex.len() <= 2 {
        return u16::from_str_radix(hex, 16).into_iter().collect();
    }
    hex.as_bytes()
        .chunks(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .filter_map(|chunk| u16::from_str_radix(chunk, 16).ok())
        .collect()
}

/// Code to Unicode table parsed from a ToUnicode CMap stream.
#[derive(Debug, Clone, Default)]
pub(crate) struct ToUnicodeMap {
    map: HashMap<u32, String>,
    /// Code length from the first codespace range.
    code_bytes: Option<usize>,
}

impl ToUnicodeMap {
    /// Parse the `bfchar` and `bfrange` sections of a CMap.
    pub(crate) fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let tokens = tokenize(&text);
        let mut cmap = Self::default();

        let hex_at = |i: usize| match tokens.get(i) {
            Some(Token::Hex(hex)) => Some(hex.as_str()),
            _ => None,
        };

        let mut i = 0;
        while i < tokens.len() {
            let Token::Word(word) = &tokens[i] else {
                i += 1;
                continue;
            };
            i += 1;
            match word.as_str() {
                "begincodespacerange" => {
                    if let (Some(lo), None) = (hex_at(i), cmap.code_bytes) {
                        cmap.code_bytes = Some(lo.len().div_ceil(2).max(1));
                    }
                }
                "beginbfchar" => {
                    while let (Some(src), Some(dst)) = (hex_at(i), hex_at(i + 1)) {
                        if let Some(code) = parse_code(src) {
                            cmap.map.insert(code, String::from_utf16_lossy(&utf16_units(dst)));
                        }
                        i += 2;
                    }
                }
                "beginbfrange" => {
                    while let (Some(lo), Some(hi)) = (hex_at(i), hex_at(i + 1)) {
                        let (Some(lo), Some(hi)) = (parse_code(lo), parse_code(hi)) else {
                            break;
                        };
                        match tokens.get(i + 2) {
                            Some(Token::Hex(dst)) => {
                                cmap.insert_range(lo, hi, &utf16_units(dst));
                                i += 3;
                            }
                            Some(Token::Open) => {
                                let mut j = i + 3;
                                let mut code = lo;
                                while let Some(dst) = hex_at(j) {
                                    cmap.map
                                        .insert(code, String::from_utf16_lossy(&utf16_units(dst)));
                                    code = code.saturating_add(1);
                                    j += 1;
                                }
                                if tokens.get(j) == Some(&Token::Close) {
                                    j += 1;
                                }
                                i = j;
                            }
                            _ => break,
                        }
                    }
                }
                _ => {}
            }
        }

        trace!("Parsed ToUnicode CMap with {} codes", cmap.map.len());
        cmap
    }

    fn insert_range(&mut self, lo: u32, hi: u32, dst: &[u16]) {
        let Some((&last, head)) = dst.split_last() else {
            return;
        };
        if hi < lo || hi - lo > MAX_RANGE_SPAN {
            return;
        }
        for offset in 0..=(hi - lo) {
            let mut units = head.to_vec();
            units.push(last.wrapping_add(offset as u16));
            self.map.insert(lo + offset, String::from_utf16_lossy(&units));
        }
    }

    pub(crate) fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    pub code: u32,
    pub text: String,
    /// Width of the code in the string, for word spacing.
    pub bytes: usize,
}

/// Decoder for one font resource.
#[derive(Debug, Clone)]
pub(crate) struct FontDecoder {
    /// `BaseFont` name, or the resource key when the font has none.
    pub name: String,
    code_bytes: usize,
    to_unicode: Option<ToUnicodeMap>,
    widths: HashMap<u32, f32>,
    default_width: f32,
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    doc.dereference(obj).map(|(_, o)| o).unwrap_or(obj)
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    resolve(doc, obj).as_float().ok()
}

impl FontDecoder {
    /// Decoder for a font name that is missing from the page resources.
    pub(crate) fn fallback(key: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(key).into_owned(),
            code_bytes: 1,
            to_unicode: None,
            widths: HashMap::new(),
            default_width: DEFAULT_GLYPH_WIDTH,
        }
    }

    /// Build a decoder from a font dictionary.
    pub(crate) fn from_dict(doc: &Document, key: &[u8], dict: &Dictionary) -> Self {
        let mut decoder = Self::fallback(key);

        if let Ok(name) = dict.get(b"BaseFont").and_then(Object::as_name) {
            decoder.name = String::from_utf8_lossy(name).into_owned();
        }

        let composite = matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Type0"));
        if composite {
            decoder.code_bytes = 2;
            decoder.load_cid_widths(doc, dict);
        } else {
            decoder.load_simple_widths(doc, dict);
        }

        if let Ok(obj) = dict.get(b"ToUnicode") {
            if let Ok(stream) = resolve(doc, obj).as_stream() {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let cmap = ToUnicodeMap::parse(&data);
                if let Some(bytes) = cmap.code_bytes {
                    decoder.code_bytes = bytes.min(4);
                }
                decoder.to_unicode = Some(cmap);
            }
        }

        trace!(
            "Font {}: {} byte codes, {} widths, ToUnicode={}",
            decoder.name,
            decoder.code_bytes,
            decoder.widths.len(),
            decoder.to_unicode.as_ref().map(ToUnicodeMap::len).unwrap_or(0)
        );
        decoder
    }

    fn load_simple_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let first = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| resolve(doc, o).as_i64().ok())
            .unwrap_or(0);
        let Ok(widths) = dict.get(b"Widths").and_then(|o| resolve(doc, o).as_array()) else {
            return;
        };
        for (idx, width) in widths.iter().enumerate() {
            let code = u32::try_from(first.saturating_add(idx as i64));
            if let (Ok(code), Some(width)) = (code, number(doc, width)) {
                self.widths.insert(code, width);
            }
        }
    }

    fn load_cid_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let Some(descendant) = dict
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .and_then(|fonts| fonts.first())
            .and_then(|o| resolve(doc, o).as_dict().ok())
        else {
            return;
        };

        self.default_width = descendant
            .get(b"DW")
            .ok()
            .and_then(|o| number(doc, o))
            .unwrap_or(1000.0);

        let Ok(w) = descendant.get(b"W").and_then(|o| resolve(doc, o).as_array()) else {
            return;
        };

        // Entries are `c [w1 w2 ...]` or `c_first c_last w`.
        let mut i = 0;
        while i < w.len() {
            let Some(start) = resolve(doc, &w[i]).as_i64().ok() else {
                break;
            };
            match w.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(run)) => {
                    for (offset, width) in run.iter().enumerate() {
                        let code = u32::try_from(start.saturating_add(offset as i64));
                        if let (Ok(code), Some(width)) = (code, number(doc, width)) {
                            self.widths.insert(code, width);
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let (Ok(end), Some(width)) = (end.as_i64(), w.get(i + 2).and_then(|o| number(doc, o)))
                    else {
                        break;
                    };
                    let last = end.min(start.saturating_add(i64::from(MAX_RANGE_SPAN)));
                    for code in start.max(0)..=last {
                        if let Ok(code) = u32::try_from(code) {
                            self.widths.insert(code, width);
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    /// Split a string operand into character codes and decode each.
    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        bytes
            .chunks(self.code_bytes)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
                let text = match self.to_unicode.as_ref().and_then(|m| m.get(code)) {
                    Some(text) => text.to_string(),
                    None if self.code_bytes == 1 => (code as u8 as char).to_string(),
                    None => char::from_u32(code).unwrap_or('\u{FFFD}').to_string(),
                };
                Glyph {
                    code,
                    text,
                    bytes: chunk.len(),
                }
            })
            .collect()
    }

    /// Horizontal advance of a code in text space units per unit font size.
    pub(crate) fn advance(&self, code: u32) -> f32 {
        self.widths.get(&code).copied().unwrap_or(self.default_width) / 1000.0
    }
}
