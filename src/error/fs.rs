//! File system errors

use std::path::Path;

use super::PinError;

/// Creates a file read error
pub fn read_failed(path: impl Into<String>, reason: impl Into<String>) -> PinError {
    PinError::FileReadFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates a file write error
pub fn write_failed(path: impl Into<String>, reason: impl Into<String>) -> PinError {
    PinError::FileWriteFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an IO error
pub fn io_error(message: impl Into<String>) -> PinError {
    PinError::IoError {
        message: message.into(),
    }
}

/// Reads a file to a string, mapping failures to [`PinError::FileReadFailed`]
pub fn read_to_string(path: &Path) -> Result<String, PinError> {
    std::fs::read_to_string(path).map_err(|e| read_failed(path.display().to_string(), e.to_string()))
}
