//! `xl/styles.xml` parsing: number formats, fonts, fills, borders and the
//! cell formats (`cellXfs`) that cells point at through their `s` index.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::error::WorkbookError;
use crate::models::workbook::{AlignmentInfo, BorderInfo, FillInfo, FontInfo};

/// Legacy indexed color palette (ARGB).
const INDEXED_COLORS: [&str; 64] = [
    "00000000", "00FFFFFF", "00FF0000", "0000FF00", "000000FF", "00FFFF00", "00FF00FF", "0000FFFF",
    "00000000", "00FFFFFF", "00FF0000", "0000FF00", "000000FF", "00FFFF00", "00FF00FF", "0000FFFF",
    "00800000", "00008000", "00000080", "00808000", "00800080", "00008080", "00C0C0C0", "00808080",
    "009999FF", "00993366", "00FFFFCC", "00CCFFFF", "00660066", "00FF8080", "000066CC", "00CCCCFF",
    "00000080", "00FF00FF", "00FFFF00", "0000FFFF", "00800080", "00800000", "00008080", "000000FF",
    "0000CCFF", "00CCFFFF", "00CCFFCC", "00FFFF99", "0099CCFF", "00FF99CC", "00CC99FF", "00FFCC99",
    "003366FF", "0033CCCC", "0099CC00", "00FFCC00", "00FF9900", "00FF6600", "00666699", "00969696",
    "00003366", "00339966", "00003300", "00333300", "00993300", "00993366", "00333399", "00333333",
];

/// Resolve a legacy palette index. System foreground/background (64, 65)
/// and out-of-range indexes have no fixed RGB.
pub fn indexed_color(index: usize) -> Option<String> {
    INDEXED_COLORS.get(index).map(|c| c.to_string())
}

/// Built-in number format ids that render as dates or times.
fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Whether a custom format code formats a date or time.
pub(crate) fn is_date_format_code(code: &str) -> bool {
    let mut stripped = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '[' => {
                for q in chars.by_ref() {
                    if q == ']' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            other => stripped.push(other.to_ascii_lowercase()),
        }
    }
    stripped.chars().any(|c| matches!(c, 'd' | 'm' | 'y' | 'h' | 's'))
}

/// One entry of `cellXfs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellFormat {
    pub num_fmt_id: u32,
    pub font_id: usize,
    pub fill_id: usize,
    pub border_id: usize,
    pub alignment: Option<AlignmentInfo>,
}

/// Resolved style of one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub font: Option<FontInfo>,
    pub fill: Option<FillInfo>,
    pub alignment: Option<AlignmentInfo>,
    pub border: Option<BorderInfo>,
    pub is_date: bool,
}

/// Parsed style tables of a workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSheet {
    pub num_fmts: HashMap<u32, String>,
    pub fonts: Vec<FontInfo>,
    pub fills: Vec<FillInfo>,
    pub borders: Vec<BorderInfo>,
    pub cell_formats: Vec<CellFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    /// Any table whose entries we do not keep (`cellStyleXfs`, `dxfs`, ...).
    Other,
}

fn attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

fn attr_num<T: std::str::FromStr>(e: &BytesStart, name: &[u8]) -> Option<T> {
    attr(e, name).and_then(|v| v.trim().parse().ok())
}

/// Boolean flag elements like `<b/>` are on unless `val` says otherwise.
fn flag(e: &BytesStart) -> bool {
    !matches!(attr(e, b"val").as_deref(), Some("0" | "false"))
}

/// ARGB value of a color element: `rgb` verbatim, `indexed` through the
/// palette, `theme`/`auto` unresolved.
pub(crate) fn color_value(e: &BytesStart) -> Option<String> {
    if let Some(rgb) = attr(e, b"rgb") {
        return Some(rgb);
    }
    attr_num::<usize>(e, b"indexed").and_then(indexed_color)
}

fn xml_error(e: impl std::fmt::Display) -> WorkbookError {
    WorkbookError::Xml {
        part: "xl/styles.xml".to_string(),
        reason: e.to_string(),
    }
}

impl StyleSheet {
    /// Parse the content of `xl/styles.xml`.
    pub fn parse(xml: &str) -> Result<Self, WorkbookError> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        let mut buf = Vec::new();
        let mut styles = StyleSheet::default();

        let mut section = Section::None;
        let mut font: Option<FontInfo> = None;
        let mut fill: Option<FillInfo> = None;
        let mut border: Option<BorderInfo> = None;
        let mut xf: Option<CellFormat> = None;

        loop {
            buf.clear();
            let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
            let (e, is_empty) = match &event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(e) => {
                    match e.local_name().as_ref() {
                        b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs"
                        | b"cellStyleXfs" | b"dxfs" | b"cellStyles" | b"colors"
                        | b"extLst" | b"tableStyles" => section = Section::None,
                        b"font" if section == Section::Fonts => {
                            styles.fonts.extend(font.take());
                        }
                        b"fill" if section == Section::Fills => {
                            styles.fills.extend(fill.take());
                        }
                        b"border" if section == Section::Borders => {
                            styles.borders.extend(border.take());
                        }
                        b"xf" if section == Section::CellXfs => {
                            styles.cell_formats.extend(xf.take());
                        }
                        _ => {}
                    }
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            let name = e.local_name();
            match (section, name.as_ref()) {
                (Section::None, b"numFmts") if !is_empty => section = Section::NumFmts,
                (Section::None, b"fonts") if !is_empty => section = Section::Fonts,
                (Section::None, b"fills") if !is_empty => section = Section::Fills,
                (Section::None, b"borders") if !is_empty => section = Section::Borders,
                (Section::None, b"cellXfs") if !is_empty => section = Section::CellXfs,
                (
                    Section::None,
                    b"cellStyleXfs" | b"dxfs" | b"cellStyles" | b"colors" | b"extLst"
                    | b"tableStyles",
                ) if !is_empty => section = Section::Other,

                (Section::NumFmts, b"numFmt") => {
                    if let (Some(id), Some(code)) = (attr_num(e, b"numFmtId"), attr(e, b"formatCode")) {
                        styles.num_fmts.insert(id, code);
                    }
                }

                (Section::Fonts, b"font") => {
                    if is_empty {
                        styles.fonts.push(FontInfo::default());
                    } else {
                        font = Some(FontInfo::default());
                    }
                }
                (Section::Fonts, child) => {
                    if let Some(f) = font.as_mut() {
                        match child {
                            b"b" => f.bold = flag(e),
                            b"i" => f.italic = flag(e),
                            b"u" => {
                                f.underline = match attr(e, b"val").as_deref() {
                                    Some("none") => None,
                                    Some(style) => Some(style.to_string()),
                                    None => Some("single".to_string()),
                                }
                            }
                            b"sz" => f.size = attr_num(e, b"val"),
                            b"name" => f.name = attr(e, b"val"),
                            b"color" => f.color = color_value(e),
                            _ => {}
                        }
                    }
                }

                (Section::Fills, b"fill") => {
                    if is_empty {
                        styles.fills.push(FillInfo::default());
                    } else {
                        fill = Some(FillInfo::default());
                    }
                }
                (Section::Fills, child) => {
                    if let Some(f) = fill.as_mut() {
                        match child {
                            b"patternFill" => f.pattern_type = attr(e, b"patternType"),
                            b"fgColor" => f.fg_color = color_value(e),
                            b"bgColor" => f.bg_color = color_value(e),
                            _ => {}
                        }
                    }
                }

                (Section::Borders, b"border") => {
                    if is_empty {
                        styles.borders.push(BorderInfo::default());
                    } else {
                        border = Some(BorderInfo::default());
                    }
                }
                (Section::Borders, side @ (b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end")) => {
                    if let Some(b) = border.as_mut() {
                        let style = attr(e, b"style");
                        match side {
                            b"left" | b"start" => b.left = style,
                            b"right" | b"end" => b.right = style,
                            b"top" => b.top = style,
                            _ => b.bottom = style,
                        }
                    }
                }

                (Section::CellXfs, b"xf") => {
                    let format = CellFormat {
                        num_fmt_id: attr_num(e, b"numFmtId").unwrap_or(0),
                        font_id: attr_num(e, b"fontId").unwrap_or(0),
                        fill_id: attr_num(e, b"fillId").unwrap_or(0),
                        border_id: attr_num(e, b"borderId").unwrap_or(0),
                        alignment: None,
                    };
                    if is_empty {
                        styles.cell_formats.push(format);
                    } else {
                        xf = Some(format);
                    }
                }
                (Section::CellXfs, b"alignment") => {
                    if let Some(x) = xf.as_mut() {
                        x.alignment = Some(AlignmentInfo {
                            horizontal: attr(e, b"horizontal"),
                            vertical: attr(e, b"vertical"),
                            wrap_text: matches!(attr(e, b"wrapText").as_deref(), Some("1" | "true")),
                            text_rotation: attr_num(e, b"textRotation").unwrap_or(0),
                        });
                    }
                }
                _ => {}
            }
        }

        trace!(
            "Styles: {} fonts, {} fills, {} borders, {} cell formats, {} number formats",
            styles.fonts.len(),
            styles.fills.len(),
            styles.borders.len(),
            styles.cell_formats.len(),
            styles.num_fmts.len()
        );
        Ok(styles)
    }

    /// The workbook default font (font 0).
    pub fn default_font(&self) -> Option<&FontInfo> {
        self.fonts.first()
    }

    /// Whether a number format id renders as a date.
    pub fn is_date_format(&self, num_fmt_id: u32) -> bool {
        match self.num_fmts.get(&num_fmt_id) {
            Some(code) => is_date_format_code(code),
            None => is_builtin_date_format(num_fmt_id),
        }
    }

    /// Resolve the style of a cell from its `s` index.
    ///
    /// Fill 0 (`none`) and fill 1 (`gray125`) are the mandatory defaults and
    /// resolve to no fill, as do fills without a pattern.
    pub fn resolve(&self, index: usize) -> CellStyle {
        let Some(format) = self.cell_formats.get(index) else {
            return CellStyle {
                font: self.default_font().cloned(),
                ..CellStyle::default()
            };
        };

        let fill = self
            .fills
            .get(format.fill_id)
            .filter(|_| format.fill_id > 1)
            .filter(|f| !matches!(f.pattern_type.as_deref(), None | Some("none")))
            .cloned();
        let border = self
            .borders
            .get(format.border_id)
            .filter(|b| !b.is_empty())
            .cloned();

        CellStyle {
            font: self
                .fonts
                .get(format.font_id)
                .or_else(|| self.default_font())
                .cloned(),
            fill,
            alignment: format.alignment.clone(),
            border,
            is_date: self.is_date_format(format.num_fmt_id),
        }
    }
}
