// src/readers/error.rs

//! Errors of a [`Session`].
//!
//! Malformed record fields and truncated fragments are not errors; the
//! readers absorb them.
//!
//! [`Session`]: crate::readers::session::Session

use std::fmt;
use std::io;

/// An error that ends a scan.
#[derive(Debug)]
pub enum ScanError {
    /// A backend could not be opened, mapped, or read.
    Acquire {
        backend: &'static str,
        source: io::Error,
    },
    /// Printing a record failed for a reason other than a closed pipe.
    Write(io::Error),
    /// The session configuration is invalid.
    Config(String),
}

impl ScanError {
    pub fn acquire(backend: &'static str, source: io::Error) -> ScanError {
        ScanError::Acquire { backend, source }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Acquire { backend, source } => {
                write!(f, "read kernel buffer failed ({}): {}", backend, source)
            }
            ScanError::Write(err) => write!(f, "write failed: {}", err),
            ScanError::Config(s) => write!(f, "configuration error: {}", s),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::Acquire { source, .. } => Some(source),
            ScanError::Write(err) => Some(err),
            ScanError::Config(_) => None,
        }
    }
}

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        ScanError::Write(err)
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
