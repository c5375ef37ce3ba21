//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<Response, AppError>`; `?` on any
//! [`marquee_common::Error`] converts it.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use marquee_common::Error;
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Error {
        &self.inner
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                code = self.inner.code(),
                error = %self.inner,
                "Server error in handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let Error::RangeNotSatisfiable { size } = self.inner {
            if let Ok(value) = format!("bytes */{size}").parse() {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}
