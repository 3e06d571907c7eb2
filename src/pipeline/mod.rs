//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step; [`crate::convert::Converter`]
//! strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ render ──▶ encode ──▶ store
//! (URL)     (bytes)      (engine)   (format)   (output dir)
//! ```
//!
//! 1. [`input`]: download a PDF given by URL (uploads skip this step)
//! 2. [`validate`]: empty / size / `%PDF-` signature checks
//! 3. [`render`]: one engine call producing page images in order
//! 4. [`encode`]: encode each page once in the delivered format
//! 5. [`store`]: name and write pages into the output directory

pub mod encode;
pub mod input;
pub mod render;
pub mod store;
pub mod validate;
