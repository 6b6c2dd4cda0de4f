//! Error types for the WMF player
//!
//! Every failure the player can hit maps onto one of these variants. The
//! player stores the first error it raises and returns it again from every
//! later call, so callers only need to inspect the result once per pass.

use thiserror::Error;

/// Error raised while reading or interpreting a metafile
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WmfError {
    /// An allocation the player needed could not be made.
    #[error("Insufficient memory")]
    InsufficientMemory,

    /// The byte source failed to open, read, seek or tell.
    #[error("Bad file: {0}")]
    BadFile(String),

    /// The header, a record or an embedded structure is malformed.
    #[error("Bad format: {0}")]
    BadFormat(String),

    /// The source ended in the middle of a header or record.
    #[error("Unexpected end of file")]
    UnexpectedEof,

    /// The backend could not be initialised or failed while drawing.
    #[error("Device error: {0}")]
    DeviceError(String),

    /// An internal invariant was violated (or the API was misused).
    #[error("Glitch: {0}")]
    Glitch(String),

    /// The progress callback asked to stop.
    #[error("Interrupted by user")]
    UserExit,
}

/// Result type alias for player operations
pub type WmfResult<T> = Result<T, WmfError>;

impl WmfError {
    pub fn bad_format(msg: impl Into<String>) -> Self {
        WmfError::BadFormat(msg.into())
    }

    pub fn glitch(msg: impl Into<String>) -> Self {
        WmfError::Glitch(msg.into())
    }
}

impl From<std::io::Error> for WmfError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => WmfError::UnexpectedEof,
            std::io::ErrorKind::OutOfMemory => WmfError::InsufficientMemory,
            _ => WmfError::BadFile(err.to_string()),
        }
    }
}

/// Conversion from WmfError to PyErr
#[cfg(feature = "python")]
impl From<WmfError> for pyo3::PyErr {
    fn from(err: WmfError) -> Self {
        pyo3::PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_eof_maps_to_unexpected_eof() {
        let err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        assert_eq!(WmfError::from(err), WmfError::UnexpectedEof);
    }

    #[test]
    fn test_io_other_maps_to_bad_file() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(WmfError::from(err), WmfError::BadFile(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            WmfError::bad_format("record too small").to_string(),
            "Bad format: record too small"
        );
        assert_eq!(WmfError::UserExit.to_string(), "Interrupted by user");
    }
}
