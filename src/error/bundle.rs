//! Manifest directory and document shape errors

use super::PinError;

/// Creates an error for a missing manifest directory or input file
pub fn input_not_found(path: impl Into<String>) -> PinError {
    PinError::InputNotFound { path: path.into() }
}

/// Creates an error for a directory without any ClusterServiceVersion
pub fn missing_csv(dir: impl Into<String>) -> PinError {
    PinError::MissingCsv { dir: dir.into() }
}

/// Creates an error for a directory holding more than one ClusterServiceVersion
pub fn multiple_csv(files: &[String]) -> PinError {
    PinError::MultipleCsv {
        files: files.join(", "),
    }
}

/// Creates an error for a CSV that shares its file with other documents
pub fn multi_document(path: impl Into<String>) -> PinError {
    PinError::MultiDocumentCsv { path: path.into() }
}

/// Creates a manifest parse error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> PinError {
    PinError::ManifestParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates a schema violation error for the node at `path`
pub fn schema_violation(path: impl Into<String>, message: impl Into<String>) -> PinError {
    PinError::SchemaViolation {
        path: path.into(),
        message: message.into(),
    }
}

/// Creates an error for a manifest the text editor cannot safely rewrite
pub fn unsupported_layout(path: impl Into<String>, reason: impl Into<String>) -> PinError {
    PinError::UnsupportedLayout {
        path: path.into(),
        reason: reason.into(),
    }
}
