//! Remote input: download a PDF named by an HTTP(S) URL into memory.
//!
//! The downloaded bytes go through the same [`super::validate::validate_pdf`]
//! gate as uploads; this module only decides whether the remote side handed
//! back something that claims to be a PDF.

use crate::error::DomainError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info};

use super::validate::has_pdf_magic;

/// Stem used for generated filenames when the URL has no usable name.
pub const FALLBACK_STEM: &str = "url_pdf";

/// Check that `url` parses and uses `http` or `https`.
pub fn parse_http_url(url: &str) -> Result<Url, DomainError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| DomainError::invalid_parameters(format!("Invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(DomainError::invalid_parameters(format!(
            "Unsupported URL scheme '{other}' (http, https)"
        ))),
    }
}

/// Download `url` within `timeout_secs`.
///
/// The response is accepted when any of these hold: the `Content-Type`
/// contains `application/pdf`, the URL path ends in `.pdf`, or the body
/// starts with `%PDF-`. Size and signature checks are left to the caller.
pub async fn fetch_pdf(url: &str, timeout_secs: u64) -> Result<Vec<u8>, DomainError> {
    let parsed = parse_http_url(url)?;
    info!("Downloading PDF from: {}", parsed);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DomainError::conversion_failed(format!("Failed to download PDF: {e}")))?;

    let response = client.get(parsed.clone()).send().await.map_err(download_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DomainError::conversion_failed(format!(
            "Failed to download PDF: HTTP {}",
            status.as_u16()
        )));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let bytes = response.bytes().await.map_err(download_error)?;
    debug!(
        "Downloaded {} bytes (content-type: {:?})",
        bytes.len(),
        content_type
    );

    let looks_like_pdf = content_type.contains("application/pdf")
        || parsed.path().to_ascii_lowercase().ends_with(".pdf")
        || has_pdf_magic(&bytes);
    if !looks_like_pdf {
        return Err(DomainError::conversion_failed(
            "URL did not return a valid PDF file",
        ));
    }

    Ok(bytes.to_vec())
}

fn download_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::conversion_failed("Timed out downloading PDF")
    } else {
        DomainError::conversion_failed(format!("Failed to download PDF: {e}"))
    }
}

/// Filename stem derived from the last URL path segment, minus `.pdf`.
pub fn url_filename_stem(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|last| {
            let lower = last.to_ascii_lowercase();
            match lower.strip_suffix(".pdf") {
                Some(_) => last[..last.len() - 4].to_string(),
                None => last,
            }
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string())
}
