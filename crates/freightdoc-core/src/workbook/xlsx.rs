//! OOXML package reader for the active worksheet.
//!
//! Reads only what the analyzer needs: the workbook sheet list and active
//! tab, relationships, shared strings, styles, and the active sheet's cells
//! and merged ranges.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use chrono::{NaiveDate, TimeDelta};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace};
use zip::result::ZipError;
use zip::ZipArchive;

use super::styles::StyleSheet;
use super::{coordinate, parse_reference, Sheet, SheetCell, MAX_COLUMNS, MAX_ROWS};
use crate::error::WorkbookError;
use crate::models::workbook::DataType;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Load the active sheet of an XLSX workbook.
pub fn load_active_sheet(data: &[u8]) -> Result<Sheet, WorkbookError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let workbook = parse_workbook(&require_part(&mut archive, WORKBOOK_PART)?)?;
    let relationships = match read_part(&mut archive, WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    let entry = workbook
        .sheets
        .get(workbook.active_tab)
        .or_else(|| workbook.sheets.first())
        .ok_or(WorkbookError::NoSheets)?;
    let part = relationships
        .get(&entry.rel_id)
        .map(|target| resolve_target(target))
        .ok_or_else(|| WorkbookError::MissingPart(format!("relationship {}", entry.rel_id)))?;

    let shared = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let styles = match read_part(&mut archive, STYLES_PART)? {
        Some(xml) => StyleSheet::parse(&xml)?,
        None => StyleSheet::default(),
    };

    debug!(
        "Workbook: {} sheets, active '{}' at {}, {} shared strings",
        workbook.sheets.len(),
        entry.name,
        part,
        shared.len()
    );

    let xml = require_part(&mut archive, &part)?;
    let context = SheetContext {
        part: &part,
        shared: &shared,
        styles: &styles,
        date1904: workbook.date1904,
    };
    context.parse(&entry.name, &xml)
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, WorkbookError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    trace!("Read part {} ({} bytes)", name, content.len());
    Ok(Some(content))
}

fn require_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, WorkbookError> {
    read_part(archive, name)?.ok_or_else(|| WorkbookError::MissingPart(name.to_string()))
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
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

fn xml_error(part: &str) -> impl Fn(quick_xml::Error) -> WorkbookError + '_ {
    move |e| WorkbookError::Xml {
        part: part.to_string(),
        reason: e.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SheetEntry {
    name: String,
    rel_id: String,
}

#[derive(Debug, Default)]
struct WorkbookInfo {
    sheets: Vec<SheetEntry>,
    active_tab: usize,
    date1904: bool,
}

fn parse_workbook(xml: &str) -> Result<WorkbookInfo, WorkbookError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut info = WorkbookInfo::default();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(xml_error(WORKBOOK_PART))? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    info.date1904 = matches!(attr(e, b"date1904").as_deref(), Some("1" | "true"));
                }
                b"workbookView" => {
                    info.active_tab = attr(e, b"activeTab")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
                b"sheet" => {
                    if let (Some(name), Some(rel_id)) = (attr(e, b"name"), attr(e, b"id")) {
                        info.sheets.push(SheetEntry { name, rel_id });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if info.sheets.is_empty() {
        return Err(WorkbookError::NoSheets);
    }
    Ok(info)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, WorkbookError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(xml_error(WORKBOOK_RELS_PART))?
        {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Shared string table; rich text runs are concatenated, phonetic runs
/// (`rPh`) skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, WorkbookError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut strings = Vec::new();

    let mut current = String::new();
    let mut in_si = false;
    let mut in_phonetic = false;
    let mut in_text = false;

    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(xml_error(SHARED_STRINGS_PART))?
        {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_text = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref e) if in_text => {
                let text = e.unescape().map_err(xml_error(SHARED_STRINGS_PART))?;
                current.push_str(&text);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Render a numeric cell value the way it reads in the workbook: integers
/// as written, decimals in shortest form, integral decimals with `.0`.
fn render_number(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains(['.', 'e', 'E']) {
        match raw.parse::<f64>() {
            Ok(n) if n.fract() == 0.0 && n.abs() < 1e16 => format!("{n:.1}"),
            Ok(n) => n.to_string(),
            Err(_) => raw.to_string(),
        }
    } else {
        raw.parse::<i64>()
            .map(|n| n.to_string())
            .unwrap_or_else(|_| raw.to_string())
    }
}

/// Convert a serial date to `YYYY-MM-DD HH:MM:SS`.
pub(crate) fn excel_datetime(serial: f64, date1904: bool) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        // serials before the phantom 1900-02-29 are one day off
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let millis = (serial * 86_400_000.0).round() as i64;
    let datetime = epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_milliseconds(millis)?)?;
    Some(datetime.format(DATE_FORMAT).to_string())
}

/// A `<c>` element being read.
#[derive(Debug, Default)]
struct PendingCell {
    row: u32,
    column: u32,
    style: usize,
    kind: Option<String>,
    value: String,
    formula: String,
    inline: String,
}

struct SheetContext<'a> {
    part: &'a str,
    shared: &'a [String],
    styles: &'a StyleSheet,
    date1904: bool,
}

impl SheetContext<'_> {
    fn parse(&self, name: &str, xml: &str) -> Result<Sheet, WorkbookError> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        let mut buf = Vec::new();
        let mut sheet = Sheet::new(name);
        sheet.default_font = self.styles.default_font().cloned();

        let mut row = 0u32;
        let mut last_column = 0u32;
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline = false;
        let mut in_text = false;
        let mut in_phonetic = false;

        loop {
            buf.clear();
            let event = reader.read_event_into(&mut buf).map_err(xml_error(self.part))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.local_name().as_ref() {
                        b"row" => {
                            row = attr(e, b"r")
                                .and_then(|r| r.parse().ok())
                                .unwrap_or_else(|| row.saturating_add(1));
                            if row > MAX_ROWS {
                                return Err(WorkbookError::InvalidReference(format!("row {row}")));
                            }
                            last_column = 0;
                        }
                        b"c" => {
                            let (r, c) = attr(e, b"r")
                                .and_then(|r| parse_reference(&r))
                                .unwrap_or_else(|| (row.max(1), last_column.saturating_add(1)));
                            if c > MAX_COLUMNS {
                                return Err(WorkbookError::InvalidReference(coordinate(r, c)));
                            }
                            last_column = c;
                            let pending = PendingCell {
                                row: r,
                                column: c,
                                style: attr(e, b"s").and_then(|s| s.parse().ok()).unwrap_or(0),
                                kind: attr(e, b"t"),
                                ..PendingCell::default()
                            };
                            if is_empty {
                                let (r, c, value) = self.finish_cell(pending);
                                sheet.insert(r, c, value);
                            } else {
                                cell = Some(pending);
                            }
                        }
                        b"v" if !is_empty => in_value = true,
                        b"f" if !is_empty => in_formula = true,
                        b"is" if !is_empty => in_inline = true,
                        b"rPh" if !is_empty => in_phonetic = true,
                        b"t" if !is_empty && in_inline && !in_phonetic => in_text = true,
                        b"mergeCell" => {
                            if let Some(range) = attr(e, b"ref") {
                                sheet.add_merged(&range)?;
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(ref e) if in_value || in_formula || in_text => {
                    let text = e.unescape().map_err(xml_error(self.part))?;
                    if let Some(pending) = cell.as_mut() {
                        if in_value {
                            pending.value.push_str(&text);
                        } else if in_formula {
                            pending.formula.push_str(&text);
                        } else {
                            pending.inline.push_str(&text);
                        }
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_text = false,
                    b"rPh" => in_phonetic = false,
                    b"is" => in_inline = false,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            let (r, c, value) = self.finish_cell(pending);
                            sheet.insert(r, c, value);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        let dims = sheet.dimensions();
        debug!(
            "Sheet '{}': rows {}..={}, columns {}..={}, {} merged ranges",
            sheet.name,
            dims.min_row,
            dims.max_row,
            dims.min_column,
            dims.max_column,
            sheet.merged_ranges().len()
        );
        Ok(sheet)
    }

    /// Render the cell value and attach its resolved style.
    fn finish_cell(&self, pending: PendingCell) -> (u32, u32, SheetCell) {
        let style = self.styles.resolve(pending.style);
        let raw = pending.value.trim();
        let raw = (!raw.is_empty()).then_some(raw);

        let (value, data_type) = if !pending.formula.trim().is_empty() {
            (Some(format!("={}", pending.formula.trim())), DataType::Formula)
        } else {
            match (pending.kind.as_deref(), raw) {
                (Some("inlineStr"), _) => (Some(pending.inline.clone()), DataType::String),
                (_, None) => (None, DataType::Numeric),
                (Some("s"), Some(raw)) => (
                    raw.parse::<usize>()
                        .ok()
                        .and_then(|idx| self.shared.get(idx).cloned()),
                    DataType::String,
                ),
                (Some("str"), Some(raw)) => (Some(raw.to_string()), DataType::String),
                (Some("b"), Some(raw)) => {
                    let text = if raw == "1" || raw.eq_ignore_ascii_case("true") {
                        "True"
                    } else {
                        "False"
                    };
                    (Some(text.to_string()), DataType::Bool)
                }
                (Some("e"), Some(raw)) => (Some(raw.to_string()), DataType::Error),
                (Some("d"), Some(raw)) => (Some(raw.replacen('T', " ", 1)), DataType::Date),
                (_, Some(raw)) => {
                    let date = style
                        .is_date
                        .then(|| raw.parse::<f64>().ok())
                        .flatten()
                        .and_then(|serial| excel_datetime(serial, self.date1904));
                    match date {
                        Some(date) => (Some(date), DataType::Date),
                        None => (Some(render_number(raw)), DataType::Numeric),
                    }
                }
            }
        };

        trace!("Cell ({}, {}) = {:?}", pending.row, pending.column, value);
        let cell = SheetCell {
            value,
            data_type,
            font: style.font,
            fill: style.fill,
            alignment: style.alignment,
            border: style.border,
        };
        (pending.row, pending.column, cell)
    }
}
