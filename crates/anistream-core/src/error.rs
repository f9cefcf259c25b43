//! Unified error type for the anistream application.
//!
//! All modules funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in anistream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "episode sources", "skip times").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The upstream answered with a non-success status.
    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus {
        /// Status code reported by the upstream.
        status: u16,
        /// The URL that was fetched.
        url: String,
    },

    /// The upstream did not answer within the allotted time.
    #[error("Upstream timed out: {url}")]
    UpstreamTimeout {
        /// The URL that was fetched.
        url: String,
    },

    /// The upstream could not be reached at all.
    #[error("Upstream unavailable [{url}]: {message}")]
    UpstreamUnavailable {
        /// The URL that was fetched.
        url: String,
        /// Human-readable error description.
        message: String,
    },

    /// An upstream document could not be interpreted.
    #[error("Manifest parse error: {0}")]
    ManifestParse(String),

    /// The caller went away before the work finished.
    #[error("Request cancelled")]
    Cancelled,

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    ///
    /// Upstream statuses pass through unchanged when they are valid error
    /// codes; anything else collapses to a gateway error.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::UpstreamStatus { status, .. } if (400..600).contains(status) => *status,
            Error::UpstreamStatus { .. } => 502,
            Error::UpstreamTimeout { .. } => 504,
            Error::UpstreamUnavailable { .. } => 502,
            Error::ManifestParse(_) => 502,
            // Client closed request.
            Error::Cancelled => 499,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::UpstreamStatus { .. } => "upstream_status",
            Error::UpstreamTimeout { .. } => "upstream_timeout",
            Error::UpstreamUnavailable { .. } => "upstream_unavailable",
            Error::ManifestParse(_) => "manifest_parse_error",
            Error::Cancelled => "cancelled",
            Error::Io { .. } => "io_error",
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
    pub fn upstream(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::UpstreamUnavailable {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Returns `true` for failures caused by the upstream rather than the
    /// request itself.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamStatus { .. }
                | Error::UpstreamTimeout { .. }
                | Error::UpstreamUnavailable { .. }
                | Error::ManifestParse(_)
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
        let err = Error::not_found("episode sources", "abc/1/sub");
        assert_eq!(err.to_string(), "episode sources not found: abc/1/sub");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("mode must be sub or dub".into());
        assert_eq!(err.to_string(), "Validation error: mode must be sub or dub");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn upstream_status_passes_through() {
        let err = Error::UpstreamStatus {
            status: 403,
            url: "https://cdn.example/x.m3u8".into(),
        };
        assert_eq!(err.http_status(), 403);
        assert!(err.is_upstream());
    }

    #[test]
    fn upstream_status_out_of_range_is_bad_gateway() {
        let err = Error::UpstreamStatus {
            status: 304,
            url: "https://cdn.example/x".into(),
        };
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn upstream_timeout_is_gateway_timeout() {
        let err = Error::UpstreamTimeout {
            url: "https://cdn.example/x".into(),
        };
        assert_eq!(err.http_status(), 504);
        assert_eq!(err.to_string(), "Upstream timed out: https://cdn.example/x");
    }

    #[test]
    fn upstream_unavailable_display() {
        let err = Error::upstream("https://cdn.example/x", "connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
        assert!(!err.is_upstream());
    }

    #[test]
    fn cancelled_is_not_a_server_error() {
        let err = Error::Cancelled;
        assert_eq!(err.http_status(), 499);
        assert_eq!(err.code(), "cancelled");
        assert!(!err.is_upstream());
    }

    #[test]
    fn internal_display() {
        let err = Error::Internal("unexpected state".into());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
        assert_eq!(err.http_status(), 500);
    }
}
