/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by this library
///
/// NOTE: `Display` renders the error category only; walk the
/// [`source`](std::error::Error::source) chain for the underlying cause.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of transfer errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed URI, unsupported scheme, or a missing/unparsable transfer option
    Config,

    /// Source object does not exist
    NotFound,

    /// Network or disk failure
    Io,

    /// Byte count read for a range does not match the reported content length
    Integrity,

    /// The shared cancellation scope was cancelled, either by the caller or by
    /// the first error on the other side of the transfer
    Cancelled,

    /// Invariant violation (e.g. task failure, poisoned mutex, part index out of range)
    Internal,
}

impl Error {
    /// Creates a new transfer [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn cancelled() -> Error {
        Error::new(ErrorKind::Cancelled, "operation cancelled")
    }

    /// Append a cleanup failure to this error without replacing it.
    ///
    /// The primary error keeps its kind and stays the head of the source
    /// chain; the cleanup failure becomes part of the chain.
    pub(crate) fn with_cleanup(self, cleanup: Error) -> Error {
        let kind = self.kind.clone();
        Error::new(
            kind,
            CleanupFailed {
                primary: self,
                cleanup,
            },
        )
    }
}

/// Create a closure that maps an arbitrary error into an [`Error`] of the given kind.
pub(crate) fn from_kind<E>(kind: ErrorKind) -> impl FnOnce(E) -> Error
where
    E: Into<BoxError>,
{
    move |err| Error::new(kind, err)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Config => write!(f, "invalid configuration"),
            ErrorKind::NotFound => write!(f, "source not found"),
            ErrorKind::Io => write!(f, "I/O error"),
            ErrorKind::Integrity => write!(f, "integrity check failed"),
            ErrorKind::Cancelled => write!(f, "operation cancelled"),
            ErrorKind::Internal => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::Internal, value)
    }
}

impl From<url::ParseError> for Error {
    fn from(value: url::ParseError) -> Self {
        Self::new(ErrorKind::Config, value)
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error
where
    T: Send + Sync + 'static,
{
    fn from(value: std::sync::PoisonError<T>) -> Self {
        Self::new(ErrorKind::Internal, value.to_string())
    }
}

#[derive(Debug)]
struct CleanupFailed {
    primary: Error,
    cleanup: Error,
}

impl fmt::Display for CleanupFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; cleanup also failed: {}", self.primary, self.cleanup)
    }
}

impl std::error::Error for CleanupFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.primary)
    }
}
