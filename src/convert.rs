//! Conversion and inspection entry points.
//!
//! [`Converter`] is the orchestrator: it validates the input, makes exactly
//! one engine call per conversion and fans the rendered pages out into the
//! delivery channels selected by the `(storage_type, image_mode)` pair:
//!
//! | storage_type | image_mode | `inline_payloads` | `file_urls` |
//! |--------------|------------|-------------------|-------------|
//! | base64       | base64     | base64 data       | –           |
//! | base64       | path       | rejected (`INVALID_PARAMETERS`) | |
//! | file         | base64     | –                 | URLs        |
//! | file         | path       | file paths        | URLs        |
//! | both         | base64     | base64 data       | URLs        |
//! | both         | path       | file paths        | URLs        |
//!
//! The converter holds no mutable state; one instance is shared by every
//! request.

use crate::config::{ConversionOptions, ImageMode, ServiceConfig, StorageType};
use crate::engine::{engine_for, RasterEngine};
use crate::error::DomainError;
use crate::output::{ConversionResult, PdfMetadata, StoredFile};
use crate::pipeline::{encode, input, render, store, validate};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Orchestrates validation, rendering and delivery of PDF conversions.
#[derive(Clone)]
pub struct Converter {
    engine: Arc<dyn RasterEngine>,
    config: Arc<ServiceConfig>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Converter {
    pub fn new(engine: Arc<dyn RasterEngine>, config: Arc<ServiceConfig>) -> Self {
        Self { engine, config }
    }

    /// Build a converter around the backend named by `config.engine`.
    pub fn from_config(config: Arc<ServiceConfig>) -> Result<Self, DomainError> {
        let engine = engine_for(&config)?;
        Ok(Self::new(engine, config))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn engine(&self) -> &dyn RasterEngine {
        self.engine.as_ref()
    }

    /// Check `bytes` against the configured size ceiling and PDF signature.
    pub fn validate(&self, bytes: &[u8]) -> Result<(), DomainError> {
        validate::validate_pdf(bytes, self.config.max_file_size)
    }

    /// Download a PDF. The bytes are not validated here.
    pub async fn fetch(&self, url: &str, timeout_secs: u64) -> Result<Vec<u8>, DomainError> {
        input::fetch_pdf(url, timeout_secs).await
    }

    /// Effective `(storage_type, image_mode)` for `options`, falling back to
    /// the service defaults.
    ///
    /// `base64` storage with `path` mode is rejected: nothing is persisted, so
    /// there is no path to return.
    pub fn resolve_delivery(
        &self,
        options: &ConversionOptions,
    ) -> Result<(StorageType, ImageMode), DomainError> {
        let storage = options
            .storage_type
            .unwrap_or(self.config.default_storage_type);
        let mode = options.image_mode.unwrap_or(self.config.default_image_mode);

        if storage == StorageType::Base64 && mode == ImageMode::Path {
            return Err(DomainError::invalid_parameters(
                "image_mode 'path' requires storage_type 'file' or 'both'",
            ));
        }
        Ok((storage, mode))
    }

    /// Convert `pdf` into images.
    ///
    /// `filename_prefix` is sanitised and prepended to persisted filenames.
    /// Pages already written when a later page fails are left in place.
    pub async fn convert(
        &self,
        pdf: &[u8],
        options: &ConversionOptions,
        filename_prefix: Option<&str>,
    ) -> Result<ConversionResult, DomainError> {
        let total_start = Instant::now();

        // ── Step 1: Validate ─────────────────────────────────────────────
        self.validate(pdf)?;
        options.validate()?;
        let (storage_type, image_mode) = self.resolve_delivery(options)?;
        info!(
            "Converting {} bytes: format={} dpi={} storage={} mode={}",
            pdf.len(),
            options.format,
            options.dpi,
            storage_type,
            image_mode
        );

        // ── Step 2: Render (single engine call) ──────────────────────────
        let render_start = Instant::now();
        let pages = render::render_pages(self.engine.as_ref(), pdf, options).await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        let pages_count = pages.len();

        // ── Step 3: Encode every page once ───────────────────────────────
        let format = options.format;
        let jpeg = options.jpeg_options;
        let encoded = tokio::task::spawn_blocking(move || {
            pages
                .iter()
                .map(|page| {
                    encode::encode_page(&page.image, format, jpeg.as_ref()).map_err(|e| {
                        DomainError::conversion_failed(format!(
                            "Failed to encode page {}: {e}",
                            page.index + 1
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| DomainError::internal(format!("Encode task panicked: {e}")))??;

        // ── Step 4: Fan out into delivery channels ───────────────────────
        let inline_base64 = storage_type.includes_inline() && image_mode == ImageMode::Base64;
        let persist = storage_type.includes_files();

        let mut inline_payloads = Vec::new();
        let mut file_urls = Vec::new();
        let mut stored_files = Vec::new();

        if persist {
            store::ensure_output_dir(&self.config.output_dir).await?;
        }

        for (index, bytes) in encoded.iter().enumerate() {
            if inline_base64 {
                inline_payloads.push(encode::to_base64(bytes));
            }
            if persist {
                let filename = store::generate_filename(index, format, filename_prefix);
                let path = store::persist_page(&self.config.output_dir, &filename, bytes).await?;
                let public_url = self.config.file_url(&filename);

                if image_mode == ImageMode::Path {
                    inline_payloads.push(path.display().to_string());
                }
                file_urls.push(public_url.clone());
                stored_files.push(StoredFile { path, public_url });
            }
        }

        let result = ConversionResult {
            pages_count,
            inline_payloads: (inline_base64 || (persist && image_mode == ImageMode::Path))
                .then_some(inline_payloads),
            file_urls: persist.then_some(file_urls),
            stored_files,
            format,
            storage_type,
            image_mode,
            render_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Converted {} page(s) in {} ms (render {} ms)",
            result.pages_count, result.total_duration_ms, result.render_duration_ms
        );
        Ok(result)
    }

    /// Download `url` and convert it; persisted files are prefixed with the
    /// URL's filename stem.
    pub async fn convert_url(
        &self,
        url: &str,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, DomainError> {
        let pdf = self.fetch(url, options.timeout_secs).await?;
        let prefix = input::url_filename_stem(url);
        debug!("Fetched {} bytes, filename prefix {:?}", pdf.len(), prefix);
        self.convert(&pdf, options, Some(&prefix)).await
    }

    /// Read document metadata without rendering.
    pub async fn inspect(&self, pdf: &[u8]) -> Result<PdfMetadata, DomainError> {
        self.validate(pdf)?;

        let raw = self
            .engine
            .inspect(pdf, true)
            .await
            .map_err(|e| e.into_inspect_error())?;
        let metadata = PdfMetadata::from_raw(&raw);

        info!(
            "Inspected PDF: {} page(s), title {:?}",
            metadata
                .page_count
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
            metadata.title
        );
        Ok(metadata)
    }
}
