//! Route handlers.
//!
//! Endpoints:
//! - GET  /                 - service name, version and status
//! - GET  /health           - liveness probe
//! - POST /convert          - multipart `file`, parameters in the query string
//! - POST /convert-advanced - multipart `file` + `options` JSON part
//! - POST /convert-from-url - JSON `{pdf_url, ...parameters}`
//! - POST /info             - multipart `file`, document metadata

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use std::path::Path;
use tracing::{debug, info};

use super::error::ApiError;
use super::models::{
    ConversionParams, ConversionResponse, HealthResponse, PdfInfoResponse, ServiceInfo,
    UrlConversionRequest,
};
use super::state::AppState;
use crate::error::DomainError;
use crate::pipeline::input::parse_http_url;

/// Prefix used when an upload has no usable file stem.
const DEFAULT_PREFIX: &str = "pdf";

// ============================================================================
// Service info
// ============================================================================

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "PDF2Image API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "pdf2image-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Conversion
// ============================================================================

/// POST /convert
pub async fn convert(
    State(state): State<AppState>,
    query: Result<Query<ConversionParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionResponse>, ApiError> {
    let Query(params) = query?;
    let options = params.into_options(state.config())?;
    let upload = read_upload(&state, multipart?).await?;

    info!(
        "Convert request: file={} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );
    let result = state
        .converter()
        .convert(&upload.bytes, &options, Some(&upload.prefix()))
        .await?;
    Ok(Json(result.into()))
}

/// POST /convert-advanced
pub async fn convert_advanced(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionResponse>, ApiError> {
    let upload = read_upload(&state, multipart?).await?;

    let params = match upload.options.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => serde_json::from_str::<ConversionParams>(text)
            .map_err(|e| DomainError::invalid_parameters(format!("Invalid options: {e}")))?,
        _ => ConversionParams::default(),
    };
    let options = params.into_options(state.config())?;

    info!(
        "Advanced convert request: file={} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );
    let result = state
        .converter()
        .convert(&upload.bytes, &options, Some(&upload.prefix()))
        .await?;
    Ok(Json(result.into()))
}

/// POST /convert-from-url
pub async fn convert_from_url(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ConversionResponse>, ApiError> {
    let Json(body) = body?;
    let request = UrlConversionRequest::from_json(body)?;
    parse_http_url(&request.pdf_url)?;
    let options = request.params.into_options(state.config())?;

    info!("Convert-from-URL request: {}", request.pdf_url);
    let result = state
        .converter()
        .convert_url(&request.pdf_url, &options)
        .await?;
    Ok(Json(result.into()))
}

// ============================================================================
// Metadata
// ============================================================================

/// POST /info
pub async fn pdf_info(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PdfInfoResponse>, ApiError> {
    let upload = read_upload(&state, multipart?).await?;
    info!("Info request: file={}", upload.filename);

    let metadata = state.converter().inspect(&upload.bytes).await?;
    Ok(Json(metadata.into()))
}

// ============================================================================
// Multipart
// ============================================================================

struct Upload {
    filename: String,
    bytes: Bytes,
    /// Raw `options` part, if sent.
    options: Option<String>,
}

impl Upload {
    fn prefix(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PREFIX)
            .to_string()
    }
}

/// Read the `file` part (and an optional `options` part). The filename is
/// checked before the body is read.
async fn read_upload(state: &AppState, mut multipart: Multipart) -> Result<Upload, ApiError> {
    let max = state.config().max_file_size;
    let mut file: Option<(String, Bytes)> = None;
    let mut options = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, max))?
    {
        let name = field.name().unwrap_or("").to_string();
        debug!(
            "Received field: name='{}', filename={:?}",
            name,
            field.file_name()
        );

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                if !filename.to_ascii_lowercase().ends_with(".pdf") {
                    return Err(DomainError::invalid_file_format("Only PDF files are supported").into());
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, max))?;
                file = Some((filename, bytes));
            }
            "options" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, max))?;
                options = Some(text);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| DomainError::invalid_parameters("Missing multipart field 'file'"))?;
    Ok(Upload {
        filename,
        bytes,
        options,
    })
}
