//! Image encoding: `DynamicImage` → bytes in the delivered format, and
//! bytes → base64 for inline delivery.
//!
//! Each page is encoded exactly once; the inline payload and the persisted
//! file are built from the same buffer.

use crate::config::{ImageFormat, JpegOptions};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::error::{EncodingError, ImageFormatHint};
use image::{DynamicImage, ImageError};
use jpeg_encoder::{ColorType, Encoder};
use std::io::Cursor;
use tracing::debug;

/// Quality used when the request does not name one.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Encode `img` as `format.delivered()`.
///
/// JPEG honours every [`JpegOptions`] field. It has no alpha channel, so
/// anything other than 8-bit gray is flattened to RGB first.
pub fn encode_page(
    img: &DynamicImage,
    format: ImageFormat,
    jpeg: Option<&JpegOptions>,
) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();

    match format.delivered() {
        ImageFormat::Jpeg => encode_jpeg(img, jpeg, &mut buf)?,
        ImageFormat::Tiff => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Tiff)?;
        }
        _ => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }

    debug!(
        "Encoded {}x{} page → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format.delivered()
    );
    Ok(buf)
}

fn encode_jpeg(
    img: &DynamicImage,
    opts: Option<&JpegOptions>,
    buf: &mut Vec<u8>,
) -> Result<(), ImageError> {
    let width = u16::try_from(img.width()).map_err(|_| jpeg_error("width exceeds 65535"))?;
    let height = u16::try_from(img.height()).map_err(|_| jpeg_error("height exceeds 65535"))?;
    let quality = opts
        .and_then(|j| j.quality)
        .unwrap_or(DEFAULT_JPEG_QUALITY)
        .clamp(1, 100);

    let mut encoder = Encoder::new(buf, quality);
    encoder.set_progressive(opts.and_then(|j| j.progressive).unwrap_or(false));
    encoder.set_optimized_huffman_tables(opts.and_then(|j| j.optimize).unwrap_or(false));

    let result = match img {
        DynamicImage::ImageLuma8(gray) => {
            encoder.encode(gray.as_raw(), width, height, ColorType::Luma)
        }
        other => {
            let rgb = other.to_rgb8();
            encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb)
        }
    };
    result.map_err(jpeg_error)
}

fn jpeg_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> ImageError {
    ImageError::Encoding(EncodingError::new(
        ImageFormatHint::Exact(image::ImageFormat::Jpeg),
        e,
    ))
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
