//! # pdf2image-server
//!
//! Rasterise PDF documents into page images over HTTP.
//!
//! Clients upload a PDF (or name one by URL); every requested page is
//! rendered by an external engine and returned inline as base64, persisted
//! to an output directory and returned as URLs, or both. A metadata endpoint
//! reports page count, author, dates and friends.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes / URL
//!  │
//!  ├─ 1. Input     download from URL (uploads skip this)
//!  ├─ 2. Validate  empty / size / %PDF- signature
//!  ├─ 3. Render    one engine call (pdftoppm / pdftocairo, or pdfium)
//!  ├─ 4. Encode    each page once, ppm delivered as png
//!  └─ 5. Deliver   base64 payloads and/or files + public URLs
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2image_server::{ConversionOptions, Converter, ServiceConfig, StorageType};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::from_config(Arc::new(ServiceConfig::default()))?;
//!     let pdf = std::fs::read("document.pdf")?;
//!     let options = ConversionOptions::builder()
//!         .dpi(150)
//!         .storage_type(StorageType::Base64)
//!         .build()?;
//!     let result = converter.convert(&pdf, &options, Some("document")).await?;
//!     println!("{} pages", result.pages_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2image-server` binary (clap + anyhow + dotenvy + tracing-subscriber) |
//! | `pdfium` | off     | In-process pdfium backend (`PDF_ENGINE=pdfium`) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionOptions, ConversionOptionsBuilder, EngineKind, ImageFormat, ImageMode, JpegOptions,
    ServiceConfig, ServiceConfigBuilder, StorageType,
};
pub use convert::Converter;
pub use engine::{RasterEngine, RawMetadata, RenderRequest};
pub use error::{DomainError, EngineError, ErrorKind};
pub use output::{ConversionResult, PdfMetadata, StoredFile};
pub use server::{router, AppState};
