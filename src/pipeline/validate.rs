//! Byte-level acceptance check applied to every PDF before it reaches an
//! engine, whether uploaded or fetched.

use crate::error::DomainError;

/// Every PDF starts with this header.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Accept `bytes` as a plausible PDF no larger than `max_size` bytes.
///
/// Checks run in a fixed order (empty, size, signature) so a caller always
/// sees the first failing condition.
pub fn validate_pdf(bytes: &[u8], max_size: usize) -> Result<(), DomainError> {
    if bytes.is_empty() {
        return Err(DomainError::empty_file());
    }
    if bytes.len() > max_size {
        return Err(DomainError::file_too_large(max_size));
    }
    if !has_pdf_magic(bytes) {
        return Err(DomainError::invalid_pdf_format());
    }
    Ok(())
}

pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}
