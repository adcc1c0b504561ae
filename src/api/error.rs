//! Error types for the fetch client.
//!
//! Variants carry the context (url, path) the underlying errors lack, so
//! failures surface with enough information to act on. Helper constructors
//! are used instead of blanket `From` impls for the same reason.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by [`ApiClient`](super::ApiClient) operations.
///
/// Note that 4xx responses are *not* errors here: the client hands them back
/// as regular responses because the classifier treats them as signals. Only
/// 5xx responses that survive the whole retry budget become [`FetchError::Status`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, resets).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// TLS certificate verification failed.
    #[error(
        "TLS verification failed for {url}\n  Suggestion: if you trust this site, rerun with --no-verify-tls (not recommended)"
    )]
    SslVerification {
        /// The URL whose certificate could not be verified.
        url: String,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Server kept returning 5xx until the retry budget ran out.
    #[error("HTTP {status} fetching {url} after {attempts} attempts")]
    Status {
        /// The URL that returned an error status.
        url: String,
        /// The final HTTP status code.
        status: u16,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The provided URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// File system error while streaming a body to disk.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Cancellation was requested; the operation stopped without retrying.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Creates a network error, promoting TLS failures to their own variant.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if is_tls_error(&source) {
            Self::SslVerification { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a retry-exhaustion status error.
    pub fn status(url: impl Into<String>, status: u16, attempts: u32) -> Self {
        Self::Status {
            url: url.into(),
            status,
            attempts,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Checks whether a reqwest error is a TLS/certificate failure.
///
/// reqwest does not expose a dedicated predicate, so this inspects the error
/// chain text the same way certificate failures render across backends.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let text = error.to_string().to_lowercase();
    text.contains("certificate")
        || text.contains("tls")
        || text.contains("ssl")
        || text.contains("handshake")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_includes_url() {
        let error = FetchError::timeout("https://example.com/wp-json/");
        let msg = error.to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("https://example.com/wp-json/"));
    }

    #[test]
    fn test_status_display_includes_status_and_attempts() {
        let error = FetchError::status("https://example.com/wp-json/", 503, 5);
        let msg = error.to_string();
        assert!(msg.contains("503"), "expected status in: {msg}");
        assert!(msg.contains("5 attempts"), "expected attempts in: {msg}");
    }

    #[test]
    fn test_invalid_url_display() {
        let error = FetchError::invalid_url("not-a-url");
        assert!(error.to_string().contains("not-a-url"));
    }

    #[test]
    fn test_ssl_verification_display_suggests_flag() {
        let error = FetchError::SslVerification {
            url: "https://example.com".to_string(),
        };
        assert!(error.to_string().contains("--no-verify-tls"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = FetchError::io(PathBuf::from("/tmp/asset.jpg"), io_err);
        assert!(error.to_string().contains("/tmp/asset.jpg"));
    }
}
