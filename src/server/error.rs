//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, ApiError>`; any
//! [`imageforged_common::Error`] converts into one with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use imageforged_common::Error;
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct ApiError {
    inner: Error,
}

impl ApiError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.inner.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in request handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let response = ApiError::new(Error::not_found("artifact")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn no_session_produces_404() {
        let response = ApiError::from(Error::NoSession).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unsupported_format_produces_400() {
        let response = ApiError::from(Error::unsupported_format("GIF")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn oversize_produces_413() {
        let response = ApiError::from(Error::PayloadTooLarge { limit: 10 }).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn internal_produces_500() {
        let response = ApiError::from(Error::internal("zip")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
