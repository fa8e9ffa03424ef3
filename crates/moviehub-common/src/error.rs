//! Unified error type for moviehub.
//!
//! Aggregation, provider, and watchlist failures all funnel into [`Error`],
//! which carries enough context for API handlers to derive an HTTP status code
//! via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in moviehub.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "movie", "watchlist item").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An aggregation function received no records to work on.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A uniqueness invariant was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An upstream provider or LLM call failed or timed out.
    #[error("Upstream unavailable [{provider}]: {message}")]
    UpstreamUnavailable {
        /// Name of the upstream that failed (e.g. "tmdb").
        provider: String,
        /// Human-readable error description.
        message: String,
    },

    /// An upstream answered with output that could not be interpreted.
    #[error("Malformed response from {provider}: {message}")]
    MalformedUpstreamResponse {
        /// Name of the upstream that answered.
        provider: String,
        /// What was wrong with the response.
        message: String,
    },

    /// An optional collaborator (such as the LLM) is not configured.
    #[error("Service not configured: {0}")]
    NotConfigured(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::EmptyInput(_) => 400,
            Error::Conflict(_) => 409,
            Error::UpstreamUnavailable { .. } => 502,
            Error::MalformedUpstreamResponse { .. } => 502,
            Error::NotConfigured(_) => 503,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::EmptyInput(_) => "empty_input",
            Error::Conflict(_) => "conflict",
            Error::UpstreamUnavailable { .. } => "upstream_unavailable",
            Error::MalformedUpstreamResponse { .. } => "malformed_upstream_response",
            Error::NotConfigured(_) => "not_configured",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::UpstreamUnavailable`].
    pub fn upstream(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::UpstreamUnavailable {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::MalformedUpstreamResponse`].
    pub fn malformed(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::MalformedUpstreamResponse {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Whether this failure originated outside the process and should be
    /// tolerated by multi-source aggregation.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable { .. } | Error::MalformedUpstreamResponse { .. }
        )
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("movie", "tmdb-603");
        assert_eq!(err.to_string(), "movie not found: tmdb-603");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn upstream_display() {
        let err = Error::upstream("omdb", "timed out");
        assert_eq!(err.to_string(), "Upstream unavailable [omdb]: timed out");
        assert_eq!(err.http_status(), 502);
        assert!(err.is_upstream());
    }

    #[test]
    fn malformed_is_upstream() {
        let err = Error::malformed("llm", "expected JSON object");
        assert!(err.is_upstream());
        assert_eq!(err.code(), "malformed_upstream_response");
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(Error::Validation("bad".into()).http_status(), 400);
        assert_eq!(Error::EmptyInput("no movies".into()).http_status(), 400);
        assert_eq!(Error::Conflict("dup".into()).http_status(), 409);
    }

    #[test]
    fn server_errors_map_to_5xx() {
        assert_eq!(Error::Internal("oops".into()).http_status(), 500);
        assert_eq!(Error::NotConfigured("llm".into()).http_status(), 503);
        assert!(!Error::Internal("oops".into()).is_upstream());
    }
}
