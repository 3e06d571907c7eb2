//! Rasterisation backends.
//!
//! The conversion pipeline never parses or renders PDF itself; it talks to a
//! [`RasterEngine`] through one `render` call per request and one `inspect`
//! call per metadata lookup.
//!
//! | Backend | Selected by | Notes |
//! |---------|-------------|-------|
//! | [`poppler::PopplerEngine`] | `EngineKind::Poppler` (default) | `pdfinfo`, `pdftoppm`, `pdftocairo` subprocesses |
//! | `pdfium::PdfiumEngine` | `EngineKind::Pdfium` | in-process, needs the `pdfium` feature |

pub mod poppler;

#[cfg(feature = "pdfium")]
pub mod pdfium;

use crate::config::{EngineKind, ImageFormat, JpegOptions, ServiceConfig};
use crate::error::{DomainError, EngineError};
use async_trait::async_trait;
use image::DynamicImage;
use std::collections::BTreeMap;
use std::sync::Arc;

/// pdfinfo-style key/value pairs (`Pages`, `Title`, `Author`, `ModDate`, …).
pub type RawMetadata = BTreeMap<String, String>;

/// Engine invocation parameters for one render call.
///
/// Optional fields left as `None` let the engine apply its own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub dpi: u32,
    pub format: ImageFormat,
    pub grayscale: bool,
    pub transparent: bool,
    pub thread_count: u32,
    pub use_alt_engine: bool,
    pub timeout_secs: u64,
    pub first_page: Option<u32>,
    pub last_page: Option<u32>,
    pub target_size: Option<u32>,
    pub jpeg_options: Option<JpegOptions>,
    /// Reject malformed documents instead of recovering.
    pub strict: bool,
}

/// A PDF rasterisation backend.
#[async_trait]
pub trait RasterEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Render the requested pages, one image per page in ascending page order.
    async fn render(
        &self,
        pdf: &[u8],
        request: &RenderRequest,
    ) -> Result<Vec<DynamicImage>, EngineError>;

    /// Read document metadata.
    async fn inspect(&self, pdf: &[u8], strict: bool) -> Result<RawMetadata, EngineError>;

    /// Check the backend can run at all; returns a version string.
    async fn probe(&self) -> Result<String, EngineError>;
}

/// Instantiate the backend named by `config.engine`.
pub fn engine_for(config: &ServiceConfig) -> Result<Arc<dyn RasterEngine>, DomainError> {
    match config.engine {
        EngineKind::Poppler => Ok(Arc::new(poppler::PopplerEngine::new(
            config.poppler_path.clone(),
        ))),
        #[cfg(feature = "pdfium")]
        EngineKind::Pdfium => Ok(Arc::new(pdfium::PdfiumEngine::new(
            config.poppler_path.clone(),
        ))),
        #[cfg(not(feature = "pdfium"))]
        EngineKind::Pdfium => Err(DomainError::invalid_parameters(
            "the pdfium engine requires building with `--features pdfium`",
        )),
    }
}
