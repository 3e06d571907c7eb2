//! Translation of [`DomainError`] into HTTP responses.
//!
//! This is the only place an error kind becomes a status code: every domain
//! kind maps to 400 with its message verbatim, `INTERNAL_ERROR` maps to 500
//! with a generic prefix.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, ErrorKind};

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error_code: String,
}

/// Handler error; wraps the domain error it will be rendered from.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Map a multipart read failure; an exceeded body limit becomes
    /// `FILE_TOO_LARGE` against `max_file_size`.
    pub fn from_multipart(e: MultipartError, max_file_size: usize) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            DomainError::file_too_large(max_file_size).into()
        } else {
            DomainError::invalid_parameters(format!("Failed to read upload: {}", e.body_text()))
                .into()
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        DomainError::invalid_parameters(e.body_text()).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        DomainError::invalid_parameters(e.body_text()).into()
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(e: MultipartRejection) -> Self {
        DomainError::invalid_parameters(e.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self.0.kind() {
            ErrorKind::Internal => {
                tracing::error!("Internal error: {}", self.0);
                format!("Internal server error: {}", self.0.message())
            }
            kind => {
                tracing::warn!("Request failed with {}: {}", kind, self.0);
                self.0.message().to_string()
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error_code: self.0.code().to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_kinds_are_client_errors() {
        for err in [
            DomainError::empty_file(),
            DomainError::file_too_large(1024 * 1024),
            DomainError::invalid_pdf_format(),
            DomainError::poppler_not_installed("missing"),
            DomainError::pdf_corrupted("bad xref"),
            DomainError::conversion_failed("boom"),
        ] {
            assert_eq!(ApiError(err).status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn internal_is_server_error() {
        let response = ApiError(DomainError::internal("panic")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
