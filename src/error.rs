//! Error handling for airtext.
//!
//! Provides a unified error handling system based on gRPC status codes,
//! with mapping from various underlying errors to appropriate categories.
//!
//! Configuration problems (duplicate names, unknown types, missing fields)
//! are fatal at startup; everything else is either logged and continued or
//! surfaced to the immediate caller of the publish API.

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Standard result type for airtext operations.
///
/// Wraps the standard `Result` type with our custom [`struct@Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// Each variant:
/// * Maps to a specific HTTP status code
/// * Represents a distinct failure category
/// * Carries a standard error message
///
/// See [gRPC status codes](https://github.com/googleapis/googleapis/blob/master/google/rpc/code.proto)
/// for the original definitions.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// HTTP Mapping: 499 Client Closed Request
    #[error("Operation was cancelled")]
    Cancelled = 1,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("Unknown error")]
    Unknown = 2,

    /// HTTP Mapping: 400 Bad Request
    #[error("Invalid argument specified")]
    InvalidArgument = 3,

    /// HTTP Mapping: 504 Gateway Timeout
    #[error("Operation timed out")]
    DeadlineExceeded = 4,

    /// HTTP Mapping: 404 Not Found
    #[error("Not found")]
    NotFound = 5,

    /// HTTP Mapping: 409 Conflict
    #[error("Attempt to create what already exists")]
    AlreadyExists = 6,

    /// HTTP Mapping: 403 Forbidden
    #[error("Permission denied")]
    PermissionDenied = 7,

    /// HTTP Mapping: 401 Unauthorized
    #[error("No valid authentication credentials")]
    Unauthenticated = 16,

    /// HTTP Mapping: 429 Too Many Requests
    #[error("Resource has been exhausted")]
    ResourceExhausted = 8,

    /// HTTP Mapping: 400 Bad Request
    #[error("Invalid state")]
    FailedPrecondition = 9,

    /// HTTP Mapping: 409 Conflict
    #[error("Operation aborted")]
    Aborted = 10,

    /// HTTP Mapping: 400 Bad Request
    #[error("Out of range")]
    OutOfRange = 11,

    /// HTTP Mapping: 501 Not Implemented
    #[error("Not implemented")]
    Unimplemented = 12,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("Internal error")]
    Internal = 13,

    /// HTTP Mapping: 503 Service Unavailable
    #[error("Service unavailable")]
    Unavailable = 14,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("Unrecoverable data loss or corruption")]
    DataLoss = 15,
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Creates an error for operations that were interrupted mid-execution.
    ///
    /// Maps to HTTP 409 Conflict.
    pub fn aborted<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Aborted,
            error: error.into(),
        }
    }

    /// Creates an error for duplicate resource creation attempts, like
    /// registering two inputs under the same name.
    ///
    /// Maps to HTTP 409 Conflict.
    pub fn already_exists<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::AlreadyExists,
            error: error.into(),
        }
    }

    /// Creates an error for cancelled operations.
    ///
    /// Maps to HTTP 499 Client Closed Request.
    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Cancelled,
            error: error.into(),
        }
    }

    /// Creates an error for data corruption or loss.
    ///
    /// Maps to HTTP 500 Internal Server Error.
    pub fn data_loss<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::DataLoss,
            error: error.into(),
        }
    }

    /// Creates an error for operations that exceeded their deadline.
    ///
    /// Maps to HTTP 504 Gateway Timeout.
    pub fn deadline_exceeded<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::DeadlineExceeded,
            error: error.into(),
        }
    }

    /// Creates an error for operations that failed due to current state,
    /// like starting a router without any registered input.
    ///
    /// Maps to HTTP 400 Bad Request.
    pub fn failed_precondition<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::FailedPrecondition,
            error: error.into(),
        }
    }

    /// Creates an error for unexpected internal errors.
    ///
    /// Maps to HTTP 500 Internal Server Error.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Internal,
            error: error.into(),
        }
    }

    /// Creates an error for arguments that don't meet validation
    /// requirements, like a metadata push without a title.
    ///
    /// Maps to HTTP 400 Bad Request.
    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::InvalidArgument,
            error: error.into(),
        }
    }

    /// Creates an error for missing resources.
    ///
    /// Maps to HTTP 404 Not Found.
    pub fn not_found<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::NotFound,
            error: error.into(),
        }
    }

    /// Creates an error for values outside valid range.
    ///
    /// Maps to HTTP 400 Bad Request.
    pub fn out_of_range<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::OutOfRange,
            error: error.into(),
        }
    }

    /// Creates an error for permission denied conditions, like a push
    /// carrying the wrong shared secret.
    ///
    /// Maps to HTTP 403 Forbidden.
    pub fn permission_denied<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::PermissionDenied,
            error: error.into(),
        }
    }

    /// Creates an error for exhausted resources.
    ///
    /// Maps to HTTP 429 Too Many Requests.
    pub fn resource_exhausted<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::ResourceExhausted,
            error: error.into(),
        }
    }

    /// Creates an error for authentication failures.
    ///
    /// Maps to HTTP 401 Unauthorized.
    pub fn unauthenticated<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Unauthenticated,
            error: error.into(),
        }
    }

    /// Creates an error for temporarily unavailable services.
    ///
    /// Maps to HTTP 503 Service Unavailable.
    pub fn unavailable<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Unavailable,
            error: error.into(),
        }
    }

    /// Creates an error for unimplemented features.
    ///
    /// Maps to HTTP 501 Not Implemented.
    pub fn unimplemented<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Unimplemented,
            error: error.into(),
        }
    }

    /// Creates an error that doesn't fit any other category.
    ///
    /// Maps to HTTP 500 Internal Server Error.
    pub fn unknown<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Unknown,
            error: error.into(),
        }
    }
}

impl std::error::Error for Error {
    /// Returns the underlying error source.
    ///
    /// This allows error chains to be examined for root causes.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

impl fmt::Display for Error {
    /// Formats the error for display, showing both kind and details.
    ///
    /// Format: "{kind}: {details}"
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

impl From<std::io::Error> for Error {
    /// Converts IO errors into appropriate error kinds.
    ///
    /// Maps standard IO errors to their logical equivalents:
    /// * `NotFound` -> `NotFound`
    /// * `PermissionDenied` -> `PermissionDenied`
    /// * `ConnectionReset` -> `Aborted`
    /// * etc.
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AddrInUse | AlreadyExists => Self::already_exists(err),
            AddrNotAvailable | ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted => Self::aborted(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            WriteZero => Self::resource_exhausted(err),
            _ => Self::unknown(err),
        }
    }
}

impl From<reqwest::Error> for Error {
    /// Converts HTTP client errors into appropriate error kinds.
    ///
    /// Maps HTTP errors based on their nature:
    /// * Body errors -> `DataLoss`
    /// * Decode errors -> `InvalidArgument`
    /// * Connect errors -> `Unavailable`
    /// * Timeout errors -> `DeadlineExceeded`
    /// * etc.
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() {
            return Self::data_loss(err);
        }

        if err.is_decode() {
            return Self::invalid_argument(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if err.is_connect() || err.is_redirect() {
            return Self::unavailable(err);
        }

        if err.is_status() {
            return Self::failed_precondition(err);
        }

        if err.is_timeout() {
            return Self::deadline_exceeded(err);
        }

        Self::unknown(err)
    }
}

impl From<serde_json::Error> for Error {
    /// Converts JSON errors through IO error mapping.
    ///
    /// JSON errors are first converted to IO errors, then mapped
    /// using the IO error conversion rules.
    fn from(err: serde_json::Error) -> Self {
        std::io::Error::from(err).into()
    }
}

impl From<toml::de::Error> for Error {
    /// Converts configuration file parse errors to `InvalidArgument`.
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    /// Converts URL parsing errors to `InvalidArgument`.
    fn from(e: url::ParseError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<std::net::AddrParseError> for Error {
    /// Converts bind address parsing errors to `InvalidArgument`.
    fn from(e: std::net::AddrParseError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<std::num::ParseIntError> for Error {
    /// Converts integer parsing errors to `InvalidArgument`.
    fn from(e: std::num::ParseIntError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<std::num::ParseFloatError> for Error {
    /// Converts decimal parsing errors to `InvalidArgument`.
    fn from(e: std::num::ParseFloatError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<std::time::SystemTimeError> for Error {
    /// Converts clock skew errors to `Internal`.
    fn from(e: std::time::SystemTimeError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    /// Converts timeout errors to `DeadlineExceeded`.
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Self::deadline_exceeded(e.to_string())
    }
}

impl<G> From<std::sync::PoisonError<G>> for Error {
    /// Converts lock poisoning errors to `Internal`.
    fn from(e: std::sync::PoisonError<G>) -> Self {
        Self::internal(e.to_string())
    }
}
