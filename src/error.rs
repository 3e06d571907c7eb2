//! Error types for the pdf2image-server library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`DomainError`]: the only failure a caller of [`crate::convert::Converter`]
//!   ever sees. It carries a closed [`ErrorKind`] with a stable
//!   machine-readable code plus a human-readable message. The HTTP surface is
//!   the single place that turns it into a status code.
//!
//! * [`EngineError`]: what a rasterisation backend reports. It never crosses
//!   the `convert`/`inspect` boundary as-is; [`EngineError::into_render_error`]
//!   and [`EngineError::into_inspect_error`] map it into the taxonomy.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable error codes surfaced to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Zero-length upload or download.
    EmptyFile,
    /// Byte length above the configured ceiling.
    FileTooLarge,
    /// Bytes do not start with `%PDF-`.
    InvalidPdfFormat,
    /// Upload rejected by name/extension before its bytes are looked at.
    InvalidFileFormat,
    /// Conversion parameters out of range or malformed request.
    InvalidParameters,

    // ── Engine errors ─────────────────────────────────────────────────────
    /// Rasterisation tools are missing or misconfigured on the host.
    PopplerNotInstalled,
    /// The engine could not parse the document.
    PdfCorrupted,
    /// Catch-all for engine, I/O and fetch failures.
    ConversionFailed,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Anything unclassified reaching the HTTP boundary.
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorKind {
    /// The machine-readable code, e.g. `"FILE_TOO_LARGE"`.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::EmptyFile => "EMPTY_FILE",
            ErrorKind::FileTooLarge => "FILE_TOO_LARGE",
            ErrorKind::InvalidPdfFormat => "INVALID_PDF_FORMAT",
            ErrorKind::InvalidFileFormat => "INVALID_FILE_FORMAT",
            ErrorKind::InvalidParameters => "INVALID_PARAMETERS",
            ErrorKind::PopplerNotInstalled => "POPPLER_NOT_INSTALLED",
            ErrorKind::PdfCorrupted => "PDF_CORRUPTED",
            ErrorKind::ConversionFailed => "CONVERSION_FAILED",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Message used when no more specific one is available.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::EmptyFile => "File is empty",
            ErrorKind::FileTooLarge => "File size exceeds the limit",
            ErrorKind::InvalidPdfFormat => "Not a valid PDF file",
            ErrorKind::InvalidFileFormat => "Unsupported file format",
            ErrorKind::InvalidParameters => "Invalid conversion parameters",
            ErrorKind::PopplerNotInstalled => {
                "Poppler tools are not installed or not configured correctly"
            }
            ErrorKind::PdfCorrupted => "PDF file is corrupted or cannot be read",
            ErrorKind::ConversionFailed => "PDF conversion failed",
            ErrorKind::Internal => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A typed, coded failure raised by any core component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DomainError {
    kind: ErrorKind,
    message: String,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    // ── Constructors ──────────────────────────────────────────────────────

    pub fn empty_file() -> Self {
        ErrorKind::EmptyFile.into()
    }

    /// `limit_bytes` is reported rounded down to whole MiB.
    pub fn file_too_large(limit_bytes: usize) -> Self {
        Self::new(
            ErrorKind::FileTooLarge,
            format!("File size exceeds the limit ({}MB)", limit_bytes / (1024 * 1024)),
        )
    }

    pub fn invalid_pdf_format() -> Self {
        ErrorKind::InvalidPdfFormat.into()
    }

    pub fn invalid_file_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFileFormat, message)
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameters, message)
    }

    pub fn poppler_not_installed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PopplerNotInstalled, message)
    }

    pub fn pdf_corrupted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PdfCorrupted, message)
    }

    pub fn conversion_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConversionFailed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<ErrorKind> for DomainError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }
}

/// Failures reported by a rasterisation backend.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required binary or shared library could not be found.
    #[error("{tool} is not installed or could not be started: {detail}")]
    NotInstalled { tool: String, detail: String },

    /// The engine could not determine how many pages the document has.
    #[error("Unable to get page count. {0}")]
    PageCount(String),

    /// Strict mode tripped over a structural problem in the document.
    #[error("{0}")]
    Syntax(String),

    /// Rendering exceeded its deadline and was aborted.
    #[error("rendering timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("{0}")]
    Other(String),
}

const POPPLER_HINT: &str = "Poppler tools are not installed correctly; install poppler-utils";

impl EngineError {
    /// Map a failure of `render` into the domain taxonomy.
    pub fn into_render_error(self) -> DomainError {
        match self {
            EngineError::NotInstalled { .. } => DomainError::poppler_not_installed(POPPLER_HINT),
            EngineError::PageCount(detail) => {
                DomainError::pdf_corrupted(format!("PDF page count error: {detail}"))
            }
            EngineError::Syntax(detail) => {
                DomainError::pdf_corrupted(format!("PDF syntax error: {detail}"))
            }
            EngineError::Timeout { .. } => DomainError::conversion_failed(
                "PDF conversion timed out; try fewer pages or a longer timeout",
            ),
            EngineError::Other(detail) => {
                DomainError::conversion_failed(format!("PDF conversion failed: {detail}"))
            }
        }
    }

    /// Map a failure of `inspect` into the domain taxonomy.
    ///
    /// Unlike rendering, a page-count failure here is not singled out.
    pub fn into_inspect_error(self) -> DomainError {
        match self {
            EngineError::NotInstalled { .. } => DomainError::poppler_not_installed(POPPLER_HINT),
            EngineError::Syntax(detail) => {
                DomainError::pdf_corrupted(format!("PDF syntax error: {detail}"))
            }
            other => DomainError::conversion_failed(format!("Failed to read PDF info: {other}")),
        }
    }
}
