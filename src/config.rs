//! Configuration types: process-wide [`ServiceConfig`] and per-request
//! [`ConversionOptions`].
//!
//! Both are plain values built through a builder and validated once at
//! `build()`. `ServiceConfig` is loaded at process start and shared by
//! reference (`Arc`); nothing reads ambient global state.
//!
//! `ConversionOptions` is constructed per request, never mutated, and consumed
//! once by [`crate::convert::Converter::convert`].

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ── Ranges ───────────────────────────────────────────────────────────────

pub const DPI_RANGE: (u32, u32) = (50, 600);
pub const THREAD_COUNT_RANGE: (u32, u32) = (1, 8);
pub const TIMEOUT_RANGE_SECS: (u64, u64) = (30, 1800);
pub const TARGET_SIZE_RANGE: (u32, u32) = (100, 4000);

// ── Service configuration ────────────────────────────────────────────────

/// Process-wide settings for the conversion service.
///
/// Built via [`ServiceConfig::builder()`] or [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2image_server::{ServiceConfig, StorageType};
///
/// let config = ServiceConfig::builder()
///     .output_dir("/var/lib/pdf2image")
///     .output_base_url("https://cdn.example.com/files/")
///     .default_storage_type(StorageType::Both)
///     .build()
///     .unwrap();
/// assert_eq!(config.file_url("a.png"), "https://cdn.example.com/files/a.png");
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind address. Default: `0.0.0.0`.
    pub host: String,

    /// Bind port. Default: 8000.
    pub port: u16,

    /// Verbose logging. Default: false.
    pub debug: bool,

    /// Storage type used when a request does not name one. Default: [`StorageType::File`].
    pub default_storage_type: StorageType,

    /// Image mode used when a request does not name one. Default: [`ImageMode::Base64`].
    pub default_image_mode: ImageMode,

    /// Flat directory receiving persisted pages. Default: `/tmp/pdf2image_output`.
    pub output_dir: PathBuf,

    /// Public prefix under which `output_dir` is served. Default: `http://localhost:8000/files`.
    pub output_base_url: String,

    /// Upper bound on PDF size in bytes. Default: 50 MiB.
    pub max_file_size: usize,

    /// DPI used when a request does not name one. Default: 200.
    pub default_dpi: u32,

    /// Output format used when a request does not name one. Default: png.
    pub default_format: ImageFormat,

    /// Ceiling applied to per-request `thread_count`. Range 1–8. Default: 8.
    pub max_thread_count: u32,

    /// Engine timeout used when a request does not name one. Default: 600 s.
    pub default_timeout_secs: u64,

    /// Allowed CORS origins; `*` allows any. Default: `["*"]`.
    pub cors_origins: Vec<String>,

    /// Directory holding the engine binaries (or shared library for pdfium).
    /// `None` resolves tools through `PATH`.
    pub poppler_path: Option<PathBuf>,

    /// Rasterisation backend. Default: [`EngineKind::Poppler`].
    pub engine: EngineKind,

    /// Result caching flag. Accepted for compatibility; no cache exists.
    pub enable_cache: bool,

    /// TTL paired with `enable_cache`. Default: 3600 s.
    pub cache_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            default_storage_type: StorageType::File,
            default_image_mode: ImageMode::Base64,
            output_dir: PathBuf::from("/tmp/pdf2image_output"),
            output_base_url: "http://localhost:8000/files".to_string(),
            max_file_size: 50 * 1024 * 1024,
            default_dpi: 200,
            default_format: ImageFormat::Png,
            max_thread_count: THREAD_COUNT_RANGE.1,
            default_timeout_secs: 600,
            cors_origins: vec!["*".to_string()],
            poppler_path: None,
            engine: EngineKind::Poppler,
            enable_cache: false,
            cache_ttl_secs: 3600,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Public URL of a file persisted under `output_dir`.
    pub fn file_url(&self, filename: &str) -> String {
        format!("{}/{}", self.output_base_url.trim_end_matches('/'), filename)
    }

    pub fn max_file_size_mb(&self) -> usize {
        self.max_file_size / (1024 * 1024)
    }

    /// Whether the output directory should be exposed as static files.
    pub fn serves_files(&self) -> bool {
        self.default_storage_type.includes_files()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.config.debug = v;
        self
    }

    pub fn default_storage_type(mut self, storage: StorageType) -> Self {
        self.config.default_storage_type = storage;
        self
    }

    pub fn default_image_mode(mut self, mode: ImageMode) -> Self {
        self.config.default_image_mode = mode;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn output_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.output_base_url = url.into();
        self
    }

    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn default_dpi(mut self, dpi: u32) -> Self {
        self.config.default_dpi = dpi;
        self
    }

    pub fn default_format(mut self, format: ImageFormat) -> Self {
        self.config.default_format = format;
        self
    }

    pub fn max_thread_count(mut self, n: u32) -> Self {
        self.config.max_thread_count = n;
        self
    }

    pub fn default_timeout_secs(mut self, secs: u64) -> Self {
        self.config.default_timeout_secs = secs;
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors_origins = origins;
        self
    }

    pub fn poppler_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.poppler_path = path;
        self
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn enable_cache(mut self, v: bool) -> Self {
        self.config.enable_cache = v;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, DomainError> {
        let c = &self.config;
        check_range("DEFAULT_DPI", c.default_dpi, DPI_RANGE)?;
        check_range("MAX_THREAD_COUNT", c.max_thread_count, THREAD_COUNT_RANGE)?;
        check_range("DEFAULT_TIMEOUT", c.default_timeout_secs, TIMEOUT_RANGE_SECS)?;
        if c.max_file_size == 0 {
            return Err(DomainError::invalid_parameters(
                "MAX_FILE_SIZE must be greater than 0",
            ));
        }
        if c.output_base_url.is_empty() {
            return Err(DomainError::invalid_parameters(
                "OUTPUT_BASE_URL must not be empty",
            ));
        }
        Ok(self.config)
    }
}

// ── Conversion options ───────────────────────────────────────────────────

/// Everything one conversion request asks of the engine and the delivery
/// stage.
///
/// Build via [`ConversionOptions::builder()`]; `build()` enforces the ranges.
///
/// # Example
/// ```rust
/// use pdf2image_server::{ConversionOptions, ImageFormat, StorageType};
///
/// let options = ConversionOptions::builder()
///     .dpi(150)
///     .format(ImageFormat::Jpeg)
///     .pages(Some(2), Some(4))
///     .storage_type(StorageType::Base64)
///     .build()
///     .unwrap();
/// assert_eq!(options.first_page, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Rendering resolution. Range: 50–600. Default: 200.
    pub dpi: u32,

    /// Output format. Default: png.
    pub format: ImageFormat,

    /// Render in grayscale.
    pub grayscale: bool,

    /// Keep a transparent background; only meaningful for png.
    pub transparent: bool,

    /// Parallelism hint passed to the engine. Range: 1–8. Default: 1.
    pub thread_count: u32,

    /// Use the engine's alternative renderer (`pdftocairo` for poppler).
    pub use_alt_engine: bool,

    /// Engine deadline in seconds. Range: 30–1800. Default: 600.
    pub timeout_secs: u64,

    /// First page to render (1-based). `None` means the first page.
    pub first_page: Option<u32>,

    /// Last page to render (1-based, inclusive). `None` means the last page.
    pub last_page: Option<u32>,

    /// Longest edge of the output in pixels, aspect ratio kept. Range: 100–4000.
    pub target_size: Option<u32>,

    /// JPEG encoder knobs; ignored for other formats.
    pub jpeg_options: Option<JpegOptions>,

    /// `None` falls back to [`ServiceConfig::default_storage_type`].
    pub storage_type: Option<StorageType>,

    /// `None` falls back to [`ServiceConfig::default_image_mode`].
    pub image_mode: Option<ImageMode>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            dpi: 200,
            format: ImageFormat::Png,
            grayscale: false,
            transparent: false,
            thread_count: 1,
            use_alt_engine: false,
            timeout_secs: 600,
            first_page: None,
            last_page: None,
            target_size: None,
            jpeg_options: None,
            storage_type: None,
            image_mode: None,
        }
    }
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Check every range constraint.
    pub fn validate(&self) -> Result<(), DomainError> {
        check_range("dpi", self.dpi, DPI_RANGE)?;
        check_range("thread_count", self.thread_count, THREAD_COUNT_RANGE)?;
        check_range("timeout", self.timeout_secs, TIMEOUT_RANGE_SECS)?;

        if self.first_page == Some(0) {
            return Err(DomainError::invalid_parameters(
                "first_page must be >= 1 (pages are 1-indexed)",
            ));
        }
        if self.last_page == Some(0) {
            return Err(DomainError::invalid_parameters(
                "last_page must be >= 1 (pages are 1-indexed)",
            ));
        }
        if let (Some(first), Some(last)) = (self.first_page, self.last_page) {
            if first > last {
                return Err(DomainError::invalid_parameters(format!(
                    "first_page ({first}) must not be greater than last_page ({last})"
                )));
            }
        }
        if let Some(size) = self.target_size {
            check_range("size", size, TARGET_SIZE_RANGE)?;
        }
        if let Some(quality) = self.jpeg_options.as_ref().and_then(|j| j.quality) {
            if quality > 100 {
                return Err(DomainError::invalid_parameters(format!(
                    "jpeg quality must be 0–100, got {quality}"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.options.dpi = dpi;
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.options.format = format;
        self
    }

    pub fn grayscale(mut self, v: bool) -> Self {
        self.options.grayscale = v;
        self
    }

    pub fn transparent(mut self, v: bool) -> Self {
        self.options.transparent = v;
        self
    }

    pub fn thread_count(mut self, n: u32) -> Self {
        self.options.thread_count = n;
        self
    }

    pub fn use_alt_engine(mut self, v: bool) -> Self {
        self.options.use_alt_engine = v;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.options.timeout_secs = secs;
        self
    }

    /// Page range, 1-indexed and inclusive; either bound may be open.
    pub fn pages(mut self, first: Option<u32>, last: Option<u32>) -> Self {
        self.options.first_page = first;
        self.options.last_page = last;
        self
    }

    pub fn target_size(mut self, size: Option<u32>) -> Self {
        self.options.target_size = size;
        self
    }

    pub fn jpeg_options(mut self, jpeg: Option<JpegOptions>) -> Self {
        self.options.jpeg_options = jpeg;
        self
    }

    pub fn storage_type(mut self, storage: StorageType) -> Self {
        self.options.storage_type = Some(storage);
        self
    }

    pub fn image_mode(mut self, mode: ImageMode) -> Self {
        self.options.image_mode = Some(mode);
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<ConversionOptions, DomainError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

fn check_range<T>(name: &str, value: T, (min, max): (T, T)) -> Result<(), DomainError>
where
    T: PartialOrd + fmt::Display,
{
    if value < min || value > max {
        return Err(DomainError::invalid_parameters(format!(
            "{name} must be {min}–{max}, got {value}"
        )));
    }
    Ok(())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output image format requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    #[default]
    Png,
    /// Accepted on input; surfaced to clients as png.
    Ppm,
    Tiff,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Ppm => "ppm",
            ImageFormat::Tiff => "tiff",
        }
    }

    /// The format actually encoded and persisted (ppm becomes png).
    pub fn delivered(self) -> ImageFormat {
        match self {
            ImageFormat::Ppm => ImageFormat::Png,
            other => other,
        }
    }

    /// File extension used for persisted pages.
    pub fn extension(self) -> &'static str {
        self.delivered().as_str()
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "ppm" => Ok(ImageFormat::Ppm),
            "tiff" | "tif" => Ok(ImageFormat::Tiff),
            other => Err(format!("unsupported format '{other}' (jpeg, png, ppm, tiff)")),
        }
    }
}

/// Where rendered pages are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Inline in the response only.
    Base64,
    /// Persisted to the output directory, returned as URLs.
    File,
    /// Both of the above.
    Both,
}

impl StorageType {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageType::Base64 => "base64",
            StorageType::File => "file",
            StorageType::Both => "both",
        }
    }

    pub fn includes_inline(self) -> bool {
        matches!(self, StorageType::Base64 | StorageType::Both)
    }

    pub fn includes_files(self) -> bool {
        matches!(self, StorageType::File | StorageType::Both)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(StorageType::Base64),
            "file" => Ok(StorageType::File),
            "both" => Ok(StorageType::Both),
            other => Err(format!("unsupported storage type '{other}' (base64, file, both)")),
        }
    }
}

/// What the inline payload field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Base64-encoded image bytes.
    Base64,
    /// Filesystem path of the persisted page.
    Path,
}

impl ImageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageMode::Base64 => "base64",
            ImageMode::Path => "path",
        }
    }
}

impl fmt::Display for ImageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(ImageMode::Base64),
            "path" => Ok(ImageMode::Path),
            other => Err(format!("unsupported image mode '{other}' (base64, path)")),
        }
    }
}

/// Rasterisation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// `pdfinfo` / `pdftoppm` / `pdftocairo` subprocesses.
    #[default]
    Poppler,
    /// In-process pdfium (requires the `pdfium` feature).
    Pdfium,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poppler" => Ok(EngineKind::Poppler),
            "pdfium" => Ok(EngineKind::Pdfium),
            other => Err(format!("unsupported engine '{other}' (poppler, pdfium)")),
        }
    }
}

/// JPEG encoder knobs, mirroring poppler's `-jpegopt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JpegOptions {
    /// 0–100.
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub progressive: Option<bool>,
    #[serde(default)]
    pub optimize: Option<bool>,
}

impl JpegOptions {
    /// Render as a `-jpegopt` argument, e.g. `quality=90,progressive=y`.
    /// `None` when no knob is set.
    pub fn to_poppler_arg(&self) -> Option<String> {
        let yn = |v: bool| if v { "y" } else { "n" };
        let mut parts = Vec::new();
        if let Some(q) = self.quality {
            parts.push(format!("quality={q}"));
        }
        if let Some(p) = self.progressive {
            parts.push(format!("progressive={}", yn(p)));
        }
        if let Some(o) = self.optimize {
            parts.push(format!("optimize={}", yn(o)));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}
