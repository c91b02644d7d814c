//! Character and word inspection of PDF pages.
//!
//! Walks each page content stream with a reduced text-rendering state
//! machine and reports every shown character with its position, font and
//! fill color. Red characters are collected into `red_text`, which is how
//! the fillable slots of a contract template are located.
//!
//! Form XObjects painted with `Do` are walked with their own resources and
//! `Matrix`, so text stamped through forms is reported like page text.
//!
//! Glyph advances come from the font `Widths`/`W` arrays when present and
//! fall back to half an em, so boxes are approximate for fonts without
//! metrics.

use std::collections::{BTreeSet, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::extractor::{inherited_attribute, page_resources};
use super::fonts::FontDecoder;
use super::{PdfExtractor, PdfProcessor, Result};
use crate::color::{ColorValue, RedClassifier};
use crate::error::PdfError;
use crate::models::config::PdfConfig;
use crate::models::inspection::{CharInfo, DocumentInspection, PageInspection, WordInfo};

/// Letter-size fallback when no MediaBox is found.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Horizontal gap that separates two words.
const WORD_GAP: f32 = 3.0;

/// Vertical drift that starts a new word.
const LINE_TOLERANCE: f32 = 3.0;

/// Nesting limit for forms painted from forms.
const MAX_FORM_DEPTH: usize = 8;

/// Forms painted per page before further `Do` operators are ignored.
const MAX_FORM_CALLS: usize = 256;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(|o| o.as_float().ok()).collect()
}

fn number(operands: &[Object], idx: usize) -> Option<f32> {
    operands.get(idx).and_then(|o| o.as_float().ok())
}

fn matrix(values: &[f32]) -> Option<Matrix> {
    match *values {
        [a, b, c, d, e, f] => Some([a, b, c, d, e, f]),
        _ => None,
    }
}

/// Initial fill color for a color space name.
fn initial_color(space: &[u8]) -> Vec<f32> {
    match space {
        b"DeviceRGB" | b"CalRGB" | b"RGB" => vec![0.0, 0.0, 0.0],
        b"DeviceCMYK" | b"CMYK" => vec![0.0, 0.0, 0.0, 1.0],
        _ => vec![0.0],
    }
}

/// Color components as they appear in `unique_colors`.
fn color_label(components: &[f32]) -> String {
    format!("{components:?}")
}

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Vec<f32>,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horiz_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            fill: vec![0.0],
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

fn sub_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key)
        .ok()
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, obj)| obj.as_dict().ok())
}

/// Fonts and form XObjects of one resource dictionary.
#[derive(Default)]
struct Resources {
    fonts: HashMap<Vec<u8>, FontDecoder>,
    forms: HashMap<Vec<u8>, ObjectId>,
}

impl Resources {
    fn load(doc: &Document, dict: Option<&Dictionary>) -> Self {
        let mut resources = Self::default();
        let Some(dict) = dict else {
            return resources;
        };
        if let Some(fonts) = sub_dict(doc, dict, b"Font") {
            for (key, obj) in fonts.iter() {
                if let Ok((_, Object::Dictionary(font))) = doc.dereference(obj) {
                    resources
                        .fonts
                        .insert(key.clone(), FontDecoder::from_dict(doc, key, font));
                }
            }
        }

        if let Some(xobjects) = sub_dict(doc, dict, b"XObject") {
            for (key, obj) in xobjects.iter() {
                let Object::Reference(id) = obj else {
                    continue;
                };
                let is_form = doc
                    .get_object(*id)
                    .and_then(Object::as_stream)
                    .is_ok_and(|stream| {
                        matches!(stream.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Form"))
                    });
                if is_form {
                    resources.forms.insert(key.clone(), *id);
                }
            }
        }
        resources
    }
}

/// Per-page walk state.
struct PageWalk<'a> {
    doc: &'a Document,
    classifier: &'a RedClassifier,
    /// Top edge of the MediaBox; `top` is measured down from here.
    page_top: f32,
    page_left: f32,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    chars: Vec<CharInfo>,
    /// Forms currently being painted, innermost last.
    active_forms: Vec<ObjectId>,
    forms_drawn: usize,
}

impl<'a> PageWalk<'a> {
    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn run(&mut self, operations: &[Operation], resources: &Resources) {
        for op in operations {
            self.apply(op, resources);
        }
    }

    fn apply(&mut self, op: &Operation, resources: &Resources) {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => self.stack.push(self.gs.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.gs = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix(&numbers(operands)) {
                    self.gs.ctm = multiply(&m, &self.gs.ctm);
                }
            }
            "Do" => {
                if let Some(Ok(name)) = operands.first().map(Object::as_name) {
                    if let Some(&form_id) = resources.forms.get(name) {
                        self.draw_form(form_id, resources);
                    }
                }
            }

            // Fill color
            "g" | "rg" | "k" | "sc" | "scn" => {
                let components = numbers(operands);
                if !components.is_empty() {
                    self.gs.fill = components;
                }
            }
            "cs" => {
                if let Some(Ok(space)) = operands.first().map(Object::as_name) {
                    self.gs.fill = initial_color(space);
                }
            }

            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Ok(name)) = operands.first().map(Object::as_name) {
                    self.gs.font = Some(name.to_vec());
                }
                if let Some(size) = number(operands, 1) {
                    self.gs.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = matrix(&numbers(operands)) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    self.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    self.gs.leading = -ty;
                    self.translate_line(tx, ty);
                }
            }
            "T*" => self.translate_line(0.0, -self.gs.leading),
            "TL" => {
                if let Some(v) = number(operands, 0) {
                    self.gs.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = number(operands, 0) {
                    self.gs.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = number(operands, 0) {
                    self.gs.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = number(operands, 0) {
                    self.gs.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = number(operands, 0) {
                    self.gs.rise = v;
                }
            }

            "Tj" => {
                if let Some(operand) = operands.first() {
                    self.show(&resources.fonts, operand);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(..) => self.show(&resources.fonts, item),
                            other => {
                                if let Ok(adjust) = other.as_float() {
                                    let tx = -adjust / 1000.0
                                        * self.gs.font_size
                                        * self.gs.horiz_scale;
                                    self.text_matrix =
                                        multiply(&translation(tx, 0.0), &self.text_matrix);
                                }
                            }
                        }
                    }
                }
            }
            "'" => {
                self.translate_line(0.0, -self.gs.leading);
                if let Some(operand) = operands.first() {
                    self.show(&resources.fonts, operand);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (number(operands, 0), number(operands, 1)) {
                    self.gs.word_spacing = aw;
                    self.gs.char_spacing = ac;
                }
                self.translate_line(0.0, -self.gs.leading);
                if let Some(operand) = operands.get(2) {
                    self.show(&resources.fonts, operand);
                }
            }
            _ => {}
        }
    }

    /// Paint a form XObject inside a saved graphics state. The form's own
    /// resources are used when it has them, the caller's otherwise.
    fn draw_form(&mut self, form_id: ObjectId, parent: &Resources) {
        if self.active_forms.len() >= MAX_FORM_DEPTH
            || self.active_forms.contains(&form_id)
            || self.forms_drawn >= MAX_FORM_CALLS
        {
            trace!("Skipping form {:?}", form_id);
            return;
        }
        let doc = self.doc;
        let Ok(stream) = doc.get_object(form_id).and_then(Object::as_stream) else {
            return;
        };
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let Ok(content) = Content::decode(&data) else {
            trace!("Undecodable form {:?}", form_id);
            return;
        };

        let own = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| doc.dereference(obj).ok())
            .and_then(|(_, obj)| obj.as_dict().ok())
            .map(|dict| Resources::load(doc, Some(dict)));
        let resources = own.as_ref().unwrap_or(parent);

        let saved = (self.gs.clone(), self.stack.len(), self.text_matrix, self.line_matrix);
        let form_matrix = stream
            .dict
            .get(b"Matrix")
            .and_then(Object::as_array)
            .ok()
            .and_then(|values| matrix(&values.iter().filter_map(|o| o.as_float().ok()).collect::<Vec<_>>()));
        if let Some(m) = form_matrix {
            self.gs.ctm = multiply(&m, &self.gs.ctm);
        }

        self.forms_drawn += 1;
        self.active_forms.push(form_id);
        self.run(&content.operations, resources);
        self.active_forms.pop();

        let (gs, depth, text_matrix, line_matrix) = saved;
        self.gs = gs;
        self.stack.truncate(depth);
        self.text_matrix = text_matrix;
        self.line_matrix = line_matrix;
    }

    /// Emit one CharInfo per code of a string operand and advance the
    /// text matrix.
    fn show(&mut self, fonts: &HashMap<Vec<u8>, FontDecoder>, operand: &Object) {
        let Object::String(bytes, _) = operand else {
            return;
        };

        let fallback;
        let font = match self.gs.font.as_ref() {
            Some(key) => match fonts.get(key) {
                Some(font) => font,
                None => {
                    fallback = FontDecoder::fallback(key);
                    &fallback
                }
            },
            None => {
                fallback = FontDecoder::fallback(b"");
                &fallback
            }
        };

        let size = self.gs.font_size;
        let th = self.gs.horiz_scale;
        let color = ColorValue::from_components(&self.gs.fill);
        let is_red = self.classifier.is_red(color.as_ref());

        for glyph in font.decode(bytes) {
            let trm = multiply(
                &[size * th, 0.0, 0.0, size, 0.0, self.gs.rise],
                &multiply(&self.text_matrix, &self.gs.ctm),
            );
            let rendered_size = (trm[2] * trm[2] + trm[3] * trm[3]).sqrt();

            let mut tx = font.advance(glyph.code) * size + self.gs.char_spacing;
            if glyph.bytes == 1 && glyph.code == 32 {
                tx += self.gs.word_spacing;
            }
            self.text_matrix = multiply(&translation(tx * th, 0.0), &self.text_matrix);

            let end = multiply(
                &[size * th, 0.0, 0.0, size, 0.0, self.gs.rise],
                &multiply(&self.text_matrix, &self.gs.ctm),
            );

            let (x0, x1) = if end[4] >= trm[4] { (trm[4], end[4]) } else { (end[4], trm[4]) };
            let top = self.page_top - trm[5] - rendered_size;

            self.chars.push(CharInfo {
                text: glyph.text,
                x0: x0 - self.page_left,
                top,
                x1: x1 - self.page_left,
                bottom: top + rendered_size,
                fontname: font.name.clone(),
                size: rendered_size,
                non_stroking_color: self.gs.fill.clone(),
                is_red,
            });
        }
    }
}

/// Group characters into words on whitespace, gaps and line changes.
fn group_words(chars: &[CharInfo]) -> Vec<WordInfo> {
    let mut words = Vec::new();
    let mut current: Option<WordInfo> = None;

    for ch in chars {
        if ch.text.trim().is_empty() {
            words.extend(current.take());
            continue;
        }

        if let Some(word) = current.as_mut() {
            let same_line = (ch.top - word.top).abs() <= LINE_TOLERANCE;
            let adjacent = ch.x0 >= word.x0 && ch.x0 - word.x1 <= WORD_GAP;
            if same_line && adjacent {
                word.text.push_str(&ch.text);
                word.x1 = word.x1.max(ch.x1);
                word.top = word.top.min(ch.top);
                word.bottom = word.bottom.max(ch.bottom);
                continue;
            }
            words.extend(current.take());
        }

        current = Some(WordInfo {
            text: ch.text.clone(),
            x0: ch.x0,
            top: ch.top,
            x1: ch.x1,
            bottom: ch.bottom,
            fontname: ch.fontname.clone(),
            size: ch.size,
        });
    }

    words.extend(current);
    words
}

/// Diagnostic character/word inspector.
#[derive(Debug, Clone, Default)]
pub struct PdfInspector {
    classifier: RedClassifier,
    include_chars: bool,
}

impl PdfInspector {
    /// Create an inspector with the default red thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a configured red classifier.
    pub fn with_classifier(mut self, classifier: RedClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Include the per-character list in page reports.
    pub fn with_chars(mut self, include: bool) -> Self {
        self.include_chars = include;
        self
    }

    /// Inspect one page (1-indexed) of a loaded document.
    pub fn inspect_page(&self, doc: &Document, page: u32) -> Result<PageInspection> {
        let pages = doc.get_pages();
        let page_id = *pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let media_box = media_box(doc, page_id);
        let resources = Resources::load(doc, page_resources(doc, page_id));

        let content_err = |e: lopdf::Error| PdfError::Content {
            page,
            reason: e.to_string(),
        };
        let raw = doc.get_page_content(page_id).map_err(content_err)?;
        let content = Content::decode(&raw).map_err(content_err)?;

        let mut walk = PageWalk {
            doc,
            classifier: &self.classifier,
            page_top: media_box[3],
            page_left: media_box[0],
            gs: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            chars: Vec::new(),
            active_forms: Vec::new(),
            forms_drawn: 0,
        };
        walk.run(&content.operations, &resources);
        let chars = walk.chars;

        let words = group_words(&chars);
        let unique_fonts: BTreeSet<String> = chars.iter().map(|c| c.fontname.clone()).collect();
        let unique_colors: BTreeSet<String> = chars
            .iter()
            .map(|c| color_label(&c.non_stroking_color))
            .collect();
        let red_text: String = chars
            .iter()
            .filter(|c| c.is_red)
            .map(|c| c.text.as_str())
            .collect();

        debug!(
            "Page {}: {} chars, {} words, {} fonts, red text {:?}",
            page,
            chars.len(),
            words.len(),
            unique_fonts.len(),
            red_text
        );

        Ok(PageInspection {
            page,
            width: media_box[2] - media_box[0],
            height: media_box[3] - media_box[1],
            words,
            chars: if self.include_chars { chars } else { Vec::new() },
            unique_fonts,
            unique_colors,
            red_text,
        })
    }

    /// Inspect every page of a loaded document.
    pub fn inspect(&self, doc: &Document) -> Result<DocumentInspection> {
        let total_pages = doc.get_pages().len() as u32;
        let pages = (1..=total_pages)
            .map(|page| self.inspect_page(doc, page))
            .collect::<Result<Vec<_>>>()?;
        Ok(DocumentInspection { total_pages, pages })
    }

    /// Load PDF bytes and inspect every page.
    pub fn inspect_bytes(&self, data: &[u8], config: &PdfConfig) -> Result<DocumentInspection> {
        let mut extractor = PdfExtractor::with_config(config);
        extractor.load(data)?;
        let doc = extractor
            .document()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))?;
        self.inspect(doc)
    }
}

/// Page MediaBox normalized to `[x0, y0, x1, y1]`.
fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let values: Vec<f32> = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| {
            arr.iter()
                .filter_map(|o| doc.dereference(o).ok()?.1.as_float().ok())
                .collect()
        })
        .unwrap_or_default();

    match *values.as_slice() {
        [a, b, c, d] => [a.min(c), b.min(d), a.max(c), b.max(d)],
        _ => {
            trace!("No usable MediaBox, using letter size");
            DEFAULT_MEDIA_BOX
        }
    }
}
