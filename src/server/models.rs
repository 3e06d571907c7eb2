//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::config::{
    ConversionOptions, ImageFormat, ImageMode, JpegOptions, ServiceConfig, StorageType,
};
use crate::error::DomainError;
use crate::output::{ConversionResult, PdfMetadata};

// ============================================================================
// Requests
// ============================================================================

/// Conversion parameters as sent by clients, via query string, JSON body or
/// the `options` multipart part. Every field is optional; gaps are filled
/// from [`ServiceConfig`].
///
/// Legacy names are accepted as aliases: `fmt`, `use_pdftocairo`, `timeout`,
/// `size`, `jpegopt`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConversionParams {
    pub dpi: Option<u32>,
    pub first_page: Option<u32>,
    pub last_page: Option<u32>,
    #[serde(alias = "fmt")]
    pub format: Option<String>,
    pub grayscale: Option<bool>,
    pub transparent: Option<bool>,
    pub thread_count: Option<u32>,
    #[serde(alias = "use_pdftocairo")]
    pub use_alt_engine: Option<bool>,
    #[serde(alias = "timeout")]
    pub timeout_secs: Option<u64>,
    #[serde(alias = "size")]
    pub target_size: Option<u32>,
    #[serde(alias = "jpegopt")]
    pub jpeg_options: Option<JpegOptions>,
    pub storage_type: Option<String>,
    pub image_mode: Option<String>,
}

impl ConversionParams {
    /// Resolve against the service defaults and validate.
    ///
    /// `thread_count` is capped at `config.max_thread_count`.
    pub fn into_options(self, config: &ServiceConfig) -> Result<ConversionOptions, DomainError> {
        let format = match self.format.as_deref() {
            Some(f) => f.parse::<ImageFormat>().map_err(DomainError::invalid_parameters)?,
            None => config.default_format,
        };
        let storage_type = self
            .storage_type
            .as_deref()
            .map(str::parse::<StorageType>)
            .transpose()
            .map_err(DomainError::invalid_parameters)?;
        let image_mode = self
            .image_mode
            .as_deref()
            .map(str::parse::<ImageMode>)
            .transpose()
            .map_err(DomainError::invalid_parameters)?;

        let options = ConversionOptions {
            dpi: self.dpi.unwrap_or(config.default_dpi),
            format,
            grayscale: self.grayscale.unwrap_or(false),
            transparent: self.transparent.unwrap_or(false),
            thread_count: self.thread_count.unwrap_or(1).min(config.max_thread_count),
            use_alt_engine: self.use_alt_engine.unwrap_or(false),
            timeout_secs: self.timeout_secs.unwrap_or(config.default_timeout_secs),
            first_page: self.first_page,
            last_page: self.last_page,
            target_size: self.target_size,
            jpeg_options: self.jpeg_options,
            storage_type,
            image_mode,
        };
        options.validate()?;
        Ok(options)
    }
}

/// Body of `POST /convert-from-url`: the URL plus any [`ConversionParams`]
/// field at the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlConversionRequest {
    pub pdf_url: String,
    pub params: ConversionParams,
}

impl UrlConversionRequest {
    pub fn from_json(mut body: serde_json::Value) -> Result<Self, DomainError> {
        let object = body
            .as_object_mut()
            .ok_or_else(|| DomainError::invalid_parameters("Request body must be a JSON object"))?;

        let pdf_url = match object.remove("pdf_url") {
            Some(serde_json::Value::String(url)) => url,
            Some(_) => {
                return Err(DomainError::invalid_parameters("pdf_url must be a string"));
            }
            None => return Err(DomainError::invalid_parameters("Missing field 'pdf_url'")),
        };

        let params = serde_json::from_value(body)
            .map_err(|e| DomainError::invalid_parameters(format!("Invalid parameters: {e}")))?;
        Ok(Self { pdf_url, params })
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub success: bool,
    pub message: String,
    pub pages_count: usize,
    /// Base64 data or file paths, depending on `image_mode`.
    pub images: Option<Vec<String>>,
    pub file_urls: Option<Vec<String>>,
    pub format: ImageFormat,
    pub storage_type: StorageType,
    pub image_mode: ImageMode,
}

impl From<ConversionResult> for ConversionResponse {
    fn from(result: ConversionResult) -> Self {
        Self {
            success: true,
            message: "PDF converted successfully".to_string(),
            pages_count: result.pages_count,
            images: result.inline_payloads,
            file_urls: result.file_urls,
            format: result.format,
            storage_type: result.storage_type,
            image_mode: result.image_mode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInfoResponse {
    pub success: bool,
    pub message: String,
    pub pages: Option<u32>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

impl From<PdfMetadata> for PdfInfoResponse {
    fn from(meta: PdfMetadata) -> Self {
        Self {
            success: true,
            message: "PDF info retrieved successfully".to_string(),
            pages: meta.page_count,
            title: meta.title,
            subject: meta.subject,
            author: meta.author,
            creator: meta.creator,
            producer: meta.producer,
            creation_date: meta.creation_date,
            modification_date: meta.modification_date,
        }
    }
}
