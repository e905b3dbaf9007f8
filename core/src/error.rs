use std::fmt;
use thiserror::Error;

/// The error type for blobsign operations.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred.
///
/// Every kind describes a local, deterministic validation failure: retrying
/// with the same input reproduces the same error, so none of them is
/// retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A resource URL could not be parsed, or violates a locator invariant
    /// (a blob without a container, a snapshot without a blob).
    UrlMalformed,

    /// The signing key is not valid base64.
    KeyInvalid,

    /// A shared access signature descriptor is missing required fields or
    /// holds contradictory ones (empty permission set, start after expiry).
    DescriptorInvalid,

    /// A paginated listing returned the same non-empty continuation marker
    /// repeatedly without making progress.
    PaginationStalled,

    /// The request cannot be canonicalized for signing (missing authority,
    /// malformed header values).
    RequestInvalid,

    /// Configuration is missing fields or holds invalid values.
    ConfigInvalid,

    /// Unexpected errors (serialization, formatting, etc.).
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

// Convenience constructors
impl Error {
    /// Create a malformed URL error.
    pub fn url_malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UrlMalformed, message)
    }

    /// Create an invalid signing key error.
    pub fn key_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeyInvalid, message)
    }

    /// Create an invalid SAS descriptor error.
    pub fn descriptor_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DescriptorInvalid, message)
    }

    /// Create a stalled pagination error.
    pub fn pagination_stalled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PaginationStalled, message)
    }

    /// Create an invalid request error.
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create an invalid configuration error.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UrlMalformed => write!(f, "malformed url"),
            ErrorKind::KeyInvalid => write!(f, "invalid signing key"),
            ErrorKind::DescriptorInvalid => write!(f, "invalid sas descriptor"),
            ErrorKind::PaginationStalled => write!(f, "pagination stalled"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_preserved() {
        let err = Error::key_invalid("account key is not valid base64");
        assert_eq!(err.kind(), ErrorKind::KeyInvalid);
        assert_eq!(err.to_string(), "account key is not valid base64");
    }

    #[test]
    fn test_source_chain() {
        let parse_err = "not a uri \\".parse::<http::Uri>().unwrap_err();
        let err = Error::url_malformed("failed to parse url").with_source(parse_err);
        assert_eq!(err.kind(), ErrorKind::UrlMalformed);
        assert!(std::error::Error::source(&err).is_some());
    }
}
