//! Error types for inoliblist
//!
//! This module defines the error taxonomy used by the remote access layer and
//! everything built on top of it. [`CatalogError::failure_kind`] decides
//! whether a failed request is worth another attempt.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// Error type for catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Transport-level failure (connection, TLS, body read)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server asked us to slow down (HTTP 403, 429 or 503)
    #[error("Rate limited by {url}: HTTP {status}")]
    Throttled { url: String, status: u16 },

    /// Temporary upstream failure such as a bad gateway
    #[error("Temporary remote failure at {url}: HTTP {status}")]
    TransientRemote { url: String, status: u16 },

    /// Credentials were rejected (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Requested resource was not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Request to {url} failed: HTTP {status}")]
    PermanentRemote { url: String, status: u16 },

    /// The payload could not be decoded
    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// All retry attempts were used up
    #[error("Maximum retries exceeded: {0}")]
    Timeout(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failure writing a side log or output file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How a failed request should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retry after re-checking the rate budget of both API classes.
    Throttled,
    /// Retry after a fixed delay.
    Transient,
    /// Give up immediately.
    Permanent,
}

impl CatalogError {
    /// Classify this error for the retry loop.
    ///
    /// The arms are evaluated in order; the first match wins.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CatalogError::Throttled { .. } => FailureKind::Throttled,
            CatalogError::TransientRemote { .. } => FailureKind::Transient,
            CatalogError::HttpError(e) if is_transient_transport(e) => FailureKind::Transient,
            _ => FailureKind::Permanent,
        }
    }

    /// Build the error matching a non-success HTTP status.
    pub fn from_status(url: &str, status: u16) -> Self {
        let url = url.to_string();
        match status {
            401 => CatalogError::Unauthorized(url),
            404 => CatalogError::NotFound(url),
            403 | 429 | 503 => CatalogError::Throttled { url, status },
            502 | 504 => CatalogError::TransientRemote { url, status },
            _ => CatalogError::PermanentRemote { url, status },
        }
    }
}

/// Connection resets, refusals and premature disconnects are worth retrying.
fn is_transient_transport(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() {
        return true;
    }

    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        // hyper reports a peer hanging up mid-response without an io::Error
        if cause.to_string().contains("connection closed before message completed") {
            return true;
        }
        source = cause.source();
    }

    false
}

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
