//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`moviehub_common::Error`]
//! converts with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moviehub_common::Error;
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let response = AppError(Error::not_found("movie", "tmdb-1")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_produces_409() {
        let response = AppError(Error::Conflict("duplicate".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unconfigured_llm_produces_503() {
        let err = AppError(Error::NotConfigured("llm".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn upstream_failure_produces_502() {
        let err = AppError(Error::upstream("tmdb", "timeout"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
