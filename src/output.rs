//! Output types returned by the conversion and inspection entry points.

use crate::config::{ImageFormat, ImageMode, StorageType};
use crate::engine::RawMetadata;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of one conversion.
///
/// `inline_payloads` and `file_urls`, when present, are index-aligned with
/// page order and with each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Number of pages the engine rendered.
    pub pages_count: usize,

    /// Base64 image data or filesystem paths, depending on `image_mode`.
    pub inline_payloads: Option<Vec<String>>,

    /// Public URLs of persisted pages; present when storage includes files.
    pub file_urls: Option<Vec<String>>,

    /// Pages persisted by this call, in page order.
    #[serde(skip)]
    pub stored_files: Vec<StoredFile>,

    /// Requested format (ppm is reported as requested, delivered as png).
    pub format: ImageFormat,

    /// Effective storage type after defaults were applied.
    pub storage_type: StorageType,

    /// Effective image mode after defaults were applied.
    pub image_mode: ImageMode,

    /// Wall-clock time spent inside the engine.
    pub render_duration_ms: u64,

    /// Wall-clock time of the whole call.
    pub total_duration_ms: u64,
}

/// A rendered page persisted to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub path: PathBuf,
    pub public_url: String,
}

/// Document-level metadata. Fields the engine does not report are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub page_count: Option<u32>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

impl PdfMetadata {
    /// Reshape pdfinfo-style key/value pairs into the fixed field set.
    pub fn from_raw(raw: &RawMetadata) -> Self {
        let get = |key: &str| {
            raw.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            page_count: get("Pages").and_then(|p| p.parse().ok()),
            title: get("Title"),
            subject: get("Subject"),
            author: get("Author"),
            creator: get("Creator"),
            producer: get("Producer"),
            creation_date: get("CreationDate"),
            modification_date: get("ModDate"),
        }
    }
}
