//! Error types for the freightdoc-core library.

use thiserror::Error;

/// Main error type for the freightdoc library.
#[derive(Error, Debug)]
pub enum FreightError {
    /// Request input error.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Workbook processing error.
    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FreightError {
    /// Short type name reported next to the message in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FreightError::Input(InputError::Missing) => "InputMissing",
            FreightError::Input(InputError::Base64(_)) => "Base64DecodeError",
            FreightError::Pdf(e) => e.kind(),
            FreightError::Workbook(e) => e.kind(),
            FreightError::Io(_) => "IoError",
            FreightError::Config(_) => "ConfigError",
        }
    }
}

/// Errors about the request payload itself, raised before any parsing.
#[derive(Error, Debug)]
pub enum InputError {
    /// No document bytes were supplied.
    #[error("no document supplied")]
    Missing,

    /// The base64 payload could not be decoded.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to decode a page content stream.
    #[error("failed to decode content of page {page}: {reason}")]
    Content { page: u32, reason: String },

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

impl PdfError {
    fn kind(&self) -> &'static str {
        match self {
            PdfError::Parse(_) => "PdfParseError",
            PdfError::TextExtraction(_) => "PdfTextExtractionError",
            PdfError::Content { .. } => "PdfContentError",
            PdfError::Encrypted => "PdfEncryptedError",
            PdfError::NoPages => "PdfNoPagesError",
            PdfError::InvalidPage(_) => "PdfInvalidPageError",
        }
    }
}

/// Errors related to XLSX workbook loading.
#[derive(Error, Debug)]
pub enum WorkbookError {
    /// The bytes are not a readable zip package.
    #[error("failed to open workbook package: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A package part contains malformed XML.
    #[error("malformed XML in {part}: {reason}")]
    Xml { part: String, reason: String },

    /// A required package part is missing.
    #[error("missing workbook part: {0}")]
    MissingPart(String),

    /// The workbook declares no worksheets.
    #[error("workbook has no sheets")]
    NoSheets,

    /// A cell reference could not be parsed.
    #[error("invalid cell reference: {0}")]
    InvalidReference(String),

    /// The used range is too large to render as a dense grid.
    #[error("sheet area {rows}x{columns} is too large for a template grid")]
    GridTooLarge { rows: u32, columns: u32 },

    /// I/O error while reading a package part.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkbookError {
    fn kind(&self) -> &'static str {
        match self {
            WorkbookError::Archive(_) => "WorkbookArchiveError",
            WorkbookError::Xml { .. } => "WorkbookXmlError",
            WorkbookError::MissingPart(_) => "WorkbookMissingPartError",
            WorkbookError::NoSheets => "WorkbookNoSheetsError",
            WorkbookError::InvalidReference(_) => "WorkbookReferenceError",
            WorkbookError::GridTooLarge { .. } => "WorkbookGridTooLargeError",
            WorkbookError::Io(_) => "IoError",
        }
    }
}

/// Result type for the freightdoc library.
pub type Result<T> = std::result::Result<T, FreightError>;
