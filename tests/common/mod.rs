//! Shared fixtures: an in-memory engine and multipart helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use pdf2image_server::{
    Converter, EngineError, RasterEngine, RawMetadata, RenderRequest, ServiceConfig,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "http://test.local/files";

/// Smallest byte string the validator accepts.
pub fn fake_pdf() -> Vec<u8> {
    b"%PDF-1.4\n% fixture\n%%EOF\n".to_vec()
}

/// Failure an engine call should report.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotInstalled,
    PageCount,
    Syntax,
    Timeout,
    Other,
}

impl Failure {
    fn to_error(self) -> EngineError {
        match self {
            Failure::NotInstalled => EngineError::NotInstalled {
                tool: "pdfinfo".into(),
                detail: "No such file or directory (os error 2)".into(),
            },
            Failure::PageCount => EngineError::PageCount("Couldn't read xref table".into()),
            Failure::Syntax => EngineError::Syntax("Syntax Error: Illegal character".into()),
            Failure::Timeout => EngineError::Timeout { secs: 30 },
            Failure::Other => EngineError::Other("pdftoppm exited with status 99".into()),
        }
    }
}

/// Engine rendering a fixed number of solid-colour pages.
///
/// Page `n` (1-based) is filled with red channel `n * 10`, so ordering can be
/// checked after any encode/decode cycle that keeps colours.
pub struct FakeEngine {
    pages: u32,
    failure: Option<Failure>,
    metadata: RawMetadata,
    render_calls: AtomicUsize,
    inspect_calls: AtomicUsize,
    last_request: Mutex<Option<RenderRequest>>,
}

impl FakeEngine {
    pub fn with_pages(pages: u32) -> Self {
        Self {
            pages,
            failure: None,
            metadata: RawMetadata::new(),
            render_calls: AtomicUsize::new(0),
            inspect_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::with_pages(1)
        }
    }

    pub fn with_metadata(mut self, pairs: &[(&str, &str)]) -> Self {
        for (k, v) in pairs {
            self.metadata.insert(k.to_string(), v.to_string());
        }
        self
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn inspect_calls(&self) -> usize {
        self.inspect_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RenderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

pub fn page_shade(page: u32) -> u8 {
    (page * 10) as u8
}

#[async_trait]
impl RasterEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn render(
        &self,
        _pdf: &[u8],
        request: &RenderRequest,
    ) -> Result<Vec<DynamicImage>, EngineError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(failure) = self.failure {
            return Err(failure.to_error());
        }

        let first = request.first_page.unwrap_or(1).max(1);
        let last = request.last_page.unwrap_or(self.pages).min(self.pages);
        Ok((first..=last)
            .map(|n| {
                DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([page_shade(n), 100, 200])))
            })
            .collect())
    }

    async fn inspect(&self, _pdf: &[u8], _strict: bool) -> Result<RawMetadata, EngineError> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failure {
            return Err(failure.to_error());
        }
        let mut raw = self.metadata.clone();
        raw.entry("Pages".into())
            .or_insert_with(|| self.pages.to_string());
        Ok(raw)
    }

    async fn probe(&self) -> Result<String, EngineError> {
        Ok("fake 1.0".into())
    }
}

/// Config writing into `dir`, with a fixed public base URL.
pub fn config_in(dir: &Path) -> pdf2image_server::ServiceConfigBuilder {
    ServiceConfig::builder()
        .output_dir(dir)
        .output_base_url(BASE_URL)
}

pub fn converter(engine: &Arc<FakeEngine>, config: ServiceConfig) -> Converter {
    Converter::new(engine.clone(), Arc::new(config))
}

// ── Multipart ────────────────────────────────────────────────────────────

const BOUNDARY: &str = "pdf2image-test-boundary-7d1c";

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some(filename),
            data,
        }
    }

    pub fn text(name: &'a str, data: &'a str) -> Self {
        Self {
            name,
            filename: None,
            data: data.as_bytes(),
        }
    }
}

/// `(content-type header, body)` for a multipart/form-data request.
pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        part.name
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
