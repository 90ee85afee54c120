//! Error types and handling for metafetch-core operations.
//!
//! Unknown input is never an error: discovery, routing and the identifier
//! codec report "no match" with `Option`. The [`Error`] type covers what can
//! actually fail while fetching and caching platform metadata.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: persistent cache reads and writes
//! - **Network Errors**: transport failures and unexpected upstream statuses
//! - **Upstream Errors**: a platform API answered but reported a failure
//! - **Parse/Serialization Errors**: payloads that do not have the expected shape
//! - **Registration Errors**: route prefix collisions, records of unknown origin
//! - **Redirect Errors**: loops and hop budget exhaustion while chasing meta ids
//!
//! Failures observed through a shared future (single-flight cache population,
//! pipeline stages) arrive wrapped in [`Error::Shared`]; `category()` and
//! `is_recoverable()` look through the wrapper.
//!
//! ```rust
//! use metafetch_core::Error;
//!
//! let err = Error::Status { status: 503, url: "https://example.com".into() };
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "network");
//! ```

use std::sync::Arc;
use thiserror::Error;

/// The main error type for metafetch-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers the filesystem-backed cache store: creating the prefix
    /// directory and reading or writing entries.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// The underlying `reqwest::Error` is preserved for connection details.
    /// Connection and timeout errors are recoverable.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a status the caller cannot use.
    #[error("Request failed with status code {status}: {url}")]
    Status {
        /// HTTP status code returned by the server.
        status: u16,
        /// URL that was requested.
        url: String,
    },

    /// A platform API answered but reported a failure in its payload.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A payload could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL is malformed or cannot be joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A route registration would shadow or be shadowed by another one.
    ///
    /// Raised while building a registry, never at resolution time.
    #[error("Route conflict: {0}")]
    RouteConflict(String),

    /// A resolved record was not produced by this registry's resolvers.
    ///
    /// This is a programming error: records must come from
    /// `Registry::resolve` (or the pipeline built on it).
    #[error("Resolved record '{0}' was not produced by this registry")]
    UnknownOrigin(String),

    /// Redirect chase revisited an identifier.
    #[error("Redirect loop detected at '{0}'")]
    RedirectLoop(String),

    /// Redirect chase ran out of hops.
    #[error("Too many redirects resolving '{id}' ({hops} hops)")]
    TooManyRedirects {
        /// Identifier the chase started from.
        id: String,
        /// Hop budget that was exhausted.
        hops: usize,
    },

    /// Failure observed through a shared future.
    ///
    /// Every caller joined to the same in-flight work receives the same
    /// underlying error.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<Arc<Self>> for Error {
    fn from(err: Arc<Self>) -> Self {
        Self::Shared(err)
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// The core never retries by itself; this is a hint for callers that
    /// want to. Transport timeouts, connection failures, 5xx and 429 statuses
    /// and interrupted I/O are considered recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Self::Shared(inner) => inner.is_recoverable(),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Useful for grouping failures in logs:
    ///
    /// - `"io"`, `"network"`, `"upstream"`, `"parse"`, `"serialization"`,
    ///   `"config"`, `"invalid_url"`, `"registration"`, `"redirect"`
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) | Self::Status { .. } => "network",
            Self::Upstream(_) => "upstream",
            Self::Parse(_) => "parse",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::InvalidUrl(_) => "invalid_url",
            Self::RouteConflict(_) | Self::UnknownOrigin(_) => "registration",
            Self::RedirectLoop(_) | Self::TooManyRedirects { .. } => "redirect",
            Self::Shared(inner) => inner.category(),
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display_formatting() {
        // Given: Variants carrying context
        let status = Error::Status {
            status: 404,
            url: "https://example.com/x".to_string(),
        };
        let hops = Error::TooManyRedirects {
            id: "@b23!abc".to_string(),
            hops: 5,
        };

        // When/Then: Messages include the context
        assert!(status.to_string().contains("404"));
        assert!(status.to_string().contains("https://example.com/x"));
        assert!(hops.to_string().contains("@b23!abc"));
        assert!(hops.to_string().contains('5'));
        assert!(
            Error::RouteConflict("a/b".into())
                .to_string()
                .contains("a/b")
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();

        match error {
            Error::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("Expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let error: Error = err.into();
        assert_eq!(error.category(), "serialization");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(
            Error::Status {
                status: 502,
                url: String::new()
            }
            .is_recoverable()
        );
        assert!(
            Error::Status {
                status: 429,
                url: String::new()
            }
            .is_recoverable()
        );
        assert!(
            !Error::Status {
                status: 404,
                url: String::new()
            }
            .is_recoverable()
        );
        assert!(Error::Io(io::Error::new(io::ErrorKind::Interrupted, "x")).is_recoverable());
        assert!(!Error::Parse("bad".into()).is_recoverable());
        assert!(!Error::RedirectLoop("@x".into()).is_recoverable());
    }

    #[test]
    fn test_shared_error_delegates() {
        // Given: A shared wrapper around a recoverable error
        let inner = Arc::new(Error::Status {
            status: 503,
            url: "https://example.com".into(),
        });
        let shared = Error::Shared(Arc::clone(&inner));

        // Then: Category, recoverability and display come from the inner error
        assert_eq!(shared.category(), "network");
        assert!(shared.is_recoverable());
        assert_eq!(shared.to_string(), inner.to_string());
    }
}
