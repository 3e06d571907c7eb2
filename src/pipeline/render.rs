//! Rasterisation stage: one engine call per conversion.
//!
//! Turns validated [`ConversionOptions`] into a [`RenderRequest`], hands it to
//! the configured [`RasterEngine`] and tags each returned image with its
//! position in the output.

use crate::config::ConversionOptions;
use crate::engine::{RasterEngine, RenderRequest};
use crate::error::DomainError;
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, info};

/// A rendered page. `index` is 0-based in output order, not the PDF page
/// number.
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub index: usize,
    pub image: DynamicImage,
}

/// Engine parameters for `options`. Rendering is always strict.
pub fn build_request(options: &ConversionOptions) -> RenderRequest {
    RenderRequest {
        dpi: options.dpi,
        format: options.format,
        grayscale: options.grayscale,
        transparent: options.transparent,
        thread_count: options.thread_count,
        use_alt_engine: options.use_alt_engine,
        timeout_secs: options.timeout_secs,
        first_page: options.first_page,
        last_page: options.last_page,
        target_size: options.target_size,
        jpeg_options: options.jpeg_options,
        strict: true,
    }
}

/// Render the pages selected by `options`, in ascending page order.
pub async fn render_pages(
    engine: &dyn RasterEngine,
    pdf: &[u8],
    options: &ConversionOptions,
) -> Result<Vec<RasterPage>, DomainError> {
    let request = build_request(options);
    debug!("Render request for {}: {:?}", engine.name(), request);

    let started = Instant::now();
    let images = engine
        .render(pdf, &request)
        .await
        .map_err(|e| e.into_render_error())?;

    info!(
        "{} rendered {} page(s) in {} ms",
        engine.name(),
        images.len(),
        started.elapsed().as_millis()
    );

    Ok(images
        .into_iter()
        .enumerate()
        .map(|(index, image)| RasterPage { index, image })
        .collect())
}
