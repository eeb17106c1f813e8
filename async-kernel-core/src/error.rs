//! Error types for the kernel.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`KernelError`] - Top-level error carried by every rejected [`Deferred`]
//! - [`HttpError`] - An error that knows which HTTP status it maps to
//!
//! User code (controllers, listeners) reports failures as [`BoxError`]. When
//! such an error is really a boxed [`KernelError`] or [`HttpError`], the kernel
//! recovers it with [`KernelError::from_boxed`] so status codes survive the
//! round trip.
//!
//! [`Deferred`]: crate::Deferred

use crate::event::Topic;
use http::{HeaderMap, StatusCode};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all kernel operations.
#[derive(Error, Debug)]
pub enum KernelError {
    /// The configured event dispatcher cannot dispatch asynchronously.
    #[error(
        "in order to use the async kernel, the event dispatcher must support asynchronous dispatch"
    )]
    AsyncDispatcherNeeded,

    /// No controller could be resolved for the request.
    #[error("unable to find the controller for path \"{path}\". The route is wrongly configured.")]
    ControllerNotFound {
        /// Path of the unmatched request.
        path: String,
    },

    /// The controller (and the view stage) did not produce a response.
    #[error("{message}")]
    ControllerDoesNotReturnResponse {
        /// Name of the offending controller.
        controller: String,
        /// Full human-readable description.
        message: String,
    },

    /// The request itself is malformed.
    ///
    /// Translated into a `400 Bad Request` [`HttpError`] before the exception
    /// stage runs.
    #[error("{0}")]
    RequestValidation(String),

    /// An error carrying an HTTP status code and headers.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// An asynchronous listener was met by a synchronous dispatch.
    #[error("asynchronous listener registered on `{0}` cannot run in a synchronous dispatch")]
    AsyncListenerInSyncDispatch(Topic),

    /// Any other error raised by a controller or a listener.
    #[error(transparent)]
    Uncaught(BoxError),
}

impl KernelError {
    /// Wrap an arbitrary error, unwrapping it first if it already is a kernel error.
    pub fn from_boxed(err: BoxError) -> Self {
        let err = match err.downcast::<KernelError>() {
            Ok(kernel) => return *kernel,
            Err(other) => other,
        };
        match err.downcast::<HttpError>() {
            Ok(http) => KernelError::Http(*http),
            Err(other) => KernelError::Uncaught(other),
        }
    }

    /// Build an uncaught error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        KernelError::Uncaught(message.into().into())
    }

    /// The HTTP status this error maps to, if it has one.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            KernelError::Http(http) => Some(http.status()),
            KernelError::ControllerNotFound { .. } => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }

    /// Headers to merge into a rescued response, if any.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            KernelError::Http(http) => Some(http.headers()),
            _ => None,
        }
    }

    /// Whether this error was raised because the request was malformed.
    pub fn is_request_validation(&self) -> bool {
        matches!(self, KernelError::RequestValidation(_))
    }
}

impl From<BoxError> for KernelError {
    fn from(err: BoxError) -> Self {
        KernelError::from_boxed(err)
    }
}

/// An error that maps onto an HTTP status code.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    headers: HeaderMap,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HttpError {
    /// Create a new HTTP error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            message: message.into(),
            source: None,
        }
    }

    /// `400 Bad Request`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// `404 Not Found`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Attach headers that must be added to the rescued response.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_from_boxed_recovers_kernel_error() {
        let boxed: BoxError = Box::new(KernelError::ControllerNotFound {
            path: "/missing".into(),
        });
        let err = KernelError::from_boxed(boxed);
        assert!(matches!(err, KernelError::ControllerNotFound { .. }));
        assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_from_boxed_recovers_http_error() {
        let boxed: BoxError = Box::new(HttpError::new(StatusCode::CONFLICT, "taken"));
        let err = KernelError::from_boxed(boxed);
        assert_eq!(err.status_code(), Some(StatusCode::CONFLICT));
        assert_eq!(err.to_string(), "taken");
    }

    #[test]
    fn test_uncaught_is_transparent() {
        let err = KernelError::from_boxed("E1".into());
        assert!(matches!(err, KernelError::Uncaught(_)));
        assert_eq!(err.to_string(), "E1");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_http_error_keeps_source() {
        let err = HttpError::bad_request("bad host").with_source(KernelError::RequestValidation(
            "bad host".into(),
        ));
        assert!(err.source().is_some());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
