//! Error types shared by the ownership primitives and the resource cache.
//!
//! Two kinds of failure exist:
//!
//! - [`LoadError`]: a loader could not produce its resource. This is an ordinary,
//!   recoverable error and is always handed back to the caller of
//!   [`ResourceManager::acquire`](crate::resource::ResourceManager::acquire).
//! - Contract violations: dereferencing an empty handle, or a handle whose cache
//!   was cleared. These are bugs in the calling code and panic through
//!   [`contract_violation`] instead of being reported as values.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error returned when a loader fails to produce its resource.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading the source file failed.
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The source data was available but could not be decoded into a resource.
    #[error("failed to decode resource: {cause}")]
    Decode {
        /// Human-readable description of what was wrong with the data.
        cause: String,
    },

    /// Any other loader failure.
    #[error("failed to load resource: {cause}")]
    Custom {
        /// Human-readable description of the failure.
        cause: String,
    },
}

impl LoadError {
    /// Creates a [`LoadError::Custom`] with the given cause.
    pub fn new(cause: impl Into<String>) -> Self {
        Self::Custom { cause: cause.into() }
    }

    /// Creates a [`LoadError::Decode`] with the given cause.
    pub fn decode(cause: impl Into<String>) -> Self {
        Self::Decode { cause: cause.into() }
    }

    /// Creates a [`LoadError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the human-readable cause of the failure.
    pub fn cause(&self) -> String {
        match self {
            Self::Io { source, .. } => source.to_string(),
            Self::Decode { cause } | Self::Custom { cause } => cause.clone(),
        }
    }
}

/// Aborts the current operation because the caller broke a documented precondition.
///
/// Every contract check in the crate funnels through here so the panic message is
/// uniform and the reported location is the offending call site.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn contract_violation(what: &str) -> ! {
    panic!("contract violation: {what}")
}
