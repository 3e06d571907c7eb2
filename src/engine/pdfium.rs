//! In-process backend built on `pdfium-render`.
//!
//! pdfium keeps thread-local state and blocks the calling thread, so every
//! call binds the library and does its work inside `spawn_blocking`. A
//! timed-out render cannot be interrupted; the caller stops waiting and the
//! blocking task finishes on its own.

use super::{RasterEngine, RawMetadata, RenderRequest};
use crate::error::EngineError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// PDF user space is 72 units per inch.
const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    /// Directory containing the pdfium shared library; `None` uses the
    /// system loader path.
    lib_dir: Option<PathBuf>,
}

impl PdfiumEngine {
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }
}

#[async_trait]
impl RasterEngine for PdfiumEngine {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    async fn render(
        &self,
        pdf: &[u8],
        request: &RenderRequest,
    ) -> Result<Vec<DynamicImage>, EngineError> {
        let lib_dir = self.lib_dir.clone();
        let bytes = pdf.to_vec();
        let req = request.clone();

        let task = tokio::task::spawn_blocking(move || {
            render_blocking(lib_dir.as_deref(), &bytes, &req)
        });

        match tokio::time::timeout(Duration::from_secs(request.timeout_secs), task).await {
            Ok(joined) => {
                joined.map_err(|e| EngineError::Other(format!("render task panicked: {e}")))?
            }
            Err(_) => Err(EngineError::Timeout {
                secs: request.timeout_secs,
            }),
        }
    }

    async fn inspect(&self, pdf: &[u8], _strict: bool) -> Result<RawMetadata, EngineError> {
        let lib_dir = self.lib_dir.clone();
        let bytes = pdf.to_vec();

        tokio::task::spawn_blocking(move || inspect_blocking(lib_dir.as_deref(), &bytes))
            .await
            .map_err(|e| EngineError::Other(format!("metadata task panicked: {e}")))?
    }

    async fn probe(&self) -> Result<String, EngineError> {
        let lib_dir = self.lib_dir.clone();
        tokio::task::spawn_blocking(move || bind(lib_dir.as_deref()).map(|_| "pdfium".to_string()))
            .await
            .map_err(|e| EngineError::Other(format!("probe task panicked: {e}")))?
    }
}

fn bind(lib_dir: Option<&Path>) -> Result<Pdfium, EngineError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| EngineError::NotInstalled {
        tool: "pdfium".to_string(),
        detail: format!("{e:?}"),
    })?;
    Ok(Pdfium::new(bindings))
}

fn render_blocking(
    lib_dir: Option<&Path>,
    bytes: &[u8],
    request: &RenderRequest,
) -> Result<Vec<DynamicImage>, EngineError> {
    let pdfium = bind(lib_dir)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| EngineError::Syntax(format!("{e:?}")))?;

    let pages = document.pages();
    let total = pages.len() as u32;
    if total == 0 {
        return Err(EngineError::PageCount("document has no pages".into()));
    }

    let first = request.first_page.unwrap_or(1).max(1);
    let last = request.last_page.unwrap_or(total).min(total);
    if first > last {
        return Ok(Vec::new());
    }
    info!("PDF loaded: {} pages, rendering {}–{}", total, first, last);

    let mut config = match request.target_size {
        Some(size) => PdfRenderConfig::new()
            .set_target_width(size as i32)
            .set_maximum_height(size as i32),
        None => PdfRenderConfig::new().scale_page_by_factor(request.dpi as f32 / POINTS_PER_INCH),
    };
    if request.grayscale {
        config = config.use_grayscale_rendering(true);
    }
    if request.transparent {
        config = config.set_clear_color(PdfColor::new(255, 255, 255, 0));
    }

    let mut images = Vec::with_capacity((last - first + 1) as usize);
    for number in first..=last {
        let page = pages
            .get((number - 1) as u16)
            .map_err(|e| EngineError::Other(format!("page {number}: {e:?}")))?;
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| EngineError::Other(format!("page {number}: {e:?}")))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            number,
            image.width(),
            image.height()
        );
        images.push(image);
    }
    Ok(images)
}

fn inspect_blocking(lib_dir: Option<&Path>, bytes: &[u8]) -> Result<RawMetadata, EngineError> {
    let pdfium = bind(lib_dir)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| EngineError::Syntax(format!("{e:?}")))?;

    let metadata = document.metadata();
    let mut raw = RawMetadata::new();
    raw.insert("Pages".to_string(), document.pages().len().to_string());

    let tags = [
        ("Title", PdfDocumentMetadataTagType::Title),
        ("Subject", PdfDocumentMetadataTagType::Subject),
        ("Author", PdfDocumentMetadataTagType::Author),
        ("Creator", PdfDocumentMetadataTagType::Creator),
        ("Producer", PdfDocumentMetadataTagType::Producer),
        ("CreationDate", PdfDocumentMetadataTagType::CreationDate),
        ("ModDate", PdfDocumentMetadataTagType::ModificationDate),
    ];
    for (key, tag) in tags {
        if let Some(value) = metadata.get(tag) {
            raw.insert(key.to_string(), value.value().to_string());
        }
    }
    Ok(raw)
}
