//! Error handling stuff
use displaydoc::Display;
use std::io;
use thiserror::Error;

/// Error type for [`crate::identity`]
#[derive(Debug, Display, Error)]
pub enum IdentityError {
    /// Identity record was {0} bytes, expected exactly 512
    InvalidBufferSize(usize),

    /// Identity query failed: {0}
    Io(#[from] io::Error),
}

/// Error type for per-device queries.
///
/// These are recoverable. A failed device does not stop a scan of the others.
#[derive(Debug, Display, Error)]
pub enum DeviceError {
    /// Device or attribute not found: `{0}`
    NotFound(String),

    /// Permission denied: `{0}`
    PermissionDenied(String),

    /// IO Failed: {0}
    Io(#[source] io::Error),

    /// The device or attribute was invalid: `{0}`
    Invalid(String),

    /// Couldn't query identity: {0}
    Identity(#[from] IdentityError),
}

impl DeviceError {
    /// Classify an [`io::Error`] raised while accessing `what`.
    pub(crate) fn from_io(what: impl Into<String>, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(what.into()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(what.into()),
            _ => Self::Io(err),
        }
    }
}
