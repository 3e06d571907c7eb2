//! Persistence of rendered pages into the flat output directory.
//!
//! Filenames follow `[prefix_]page_{n}_{YYYYMMDD_HHMMSS}_{id8}.{ext}`, where
//! `n` is 1-based and `id8` is the first 8 hex digits of a fresh v4 UUID.
//! Files are never cleaned up by the service.

use crate::config::ImageFormat;
use crate::error::DomainError;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

static RE_UNSAFE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Replace anything outside `[A-Za-z0-9._-]` so a prefix cannot escape the
/// output directory or break URLs. Leading dots are dropped.
pub fn sanitize_prefix(prefix: &str) -> String {
    let cleaned = RE_UNSAFE_PREFIX.replace_all(prefix.trim(), "_");
    cleaned.trim_start_matches('.').to_string()
}

/// Unique filename for the page at 0-based `page_index`.
pub fn generate_filename(page_index: usize, format: ImageFormat, prefix: Option<&str>) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let id = Uuid::new_v4().simple().to_string();
    let id8 = &id[..8];
    let base = format!(
        "page_{}_{}_{}.{}",
        page_index + 1,
        timestamp,
        id8,
        format.extension()
    );

    match prefix.map(sanitize_prefix).filter(|p| !p.is_empty()) {
        Some(p) => format!("{p}_{base}"),
        None => base,
    }
}

/// Create the output directory if it does not exist yet.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), DomainError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| save_error(dir, e))
}

/// Write `bytes` as `filename` under `dir`; returns the full path.
pub async fn persist_page(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| save_error(&path, e))?;
    debug!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

fn save_error(path: &Path, e: std::io::Error) -> DomainError {
    DomainError::conversion_failed(format!(
        "Failed to save image file {}: {e}",
        path.display()
    ))
}
