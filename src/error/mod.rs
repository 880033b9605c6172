//! Error types and handling for bundlepin
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`bundle`]: Manifest directory and document shape errors
//! - [`reference`]: Image reference grammar errors
//! - [`registry`]: Registry inspection and resolver configuration errors
//! - [`fs`]: File system errors

pub mod bundle;
pub mod fs;
pub mod reference;
pub mod registry;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for pinning operations
#[derive(Error, Diagnostic, Debug)]
pub enum PinError {
    // Input errors
    #[error("{path} is not a directory or does not exist")]
    #[diagnostic(code(bundlepin::input::not_found))]
    InputNotFound { path: String },

    // Bundle shape errors
    #[error("Missing ClusterServiceVersion in operator manifests")]
    #[diagnostic(
        code(bundlepin::bundle::missing_csv),
        help("Searched {dir} for *.yaml / *.yml files with kind: ClusterServiceVersion")
    )]
    MissingCsv { dir: String },

    #[error("Operator bundle may contain only 1 CSV file, but contains more")]
    #[diagnostic(code(bundlepin::bundle::multiple_csv), help("Found: {files}"))]
    MultipleCsv { files: String },

    #[error("ClusterServiceVersion in {path} must be the only document in its file")]
    #[diagnostic(code(bundlepin::bundle::multi_document))]
    MultiDocumentCsv { path: String },

    #[error("Failed to parse manifest {path}: {reason}")]
    #[diagnostic(code(bundlepin::bundle::parse_failed))]
    ManifestParseFailed { path: String, reason: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(bundlepin::bundle::schema_violation))]
    SchemaViolation { path: String, message: String },

    #[error("Cannot edit manifest {path}: {reason}")]
    #[diagnostic(code(bundlepin::bundle::unsupported_layout))]
    UnsupportedLayout { path: String, reason: String },

    // Reference errors
    #[error("Invalid image reference '{reference}': {reason}")]
    #[diagnostic(code(bundlepin::reference::malformed))]
    MalformedReference { reference: String, reason: String },

    // Registry errors
    #[error("Failed to inspect docker://{reference}. Make sure it exists and is accessible.")]
    #[diagnostic(code(bundlepin::registry::image_not_found), help("{reason}"))]
    ImageNotFound { reference: String, reason: String },

    #[error(
        "Failed to inspect docker://{reference}. Make sure it exists and is accessible. ({reason})"
    )]
    #[diagnostic(code(bundlepin::registry::inspection_failed))]
    InspectionFailed { reference: String, reason: String },

    #[error("Invalid resolver configuration: {message}")]
    #[diagnostic(
        code(bundlepin::registry::config),
        help("Valid resolvers: skopeo, script (script requires --resolver-path)")
    )]
    ResolverConfig { message: String },

    // Related images errors
    #[error("Found conflicts when setting relatedImages:\n{conflicts}")]
    #[diagnostic(code(bundlepin::related::conflict))]
    RelatedImageConflict { conflicts: String },

    #[error("Invalid replacements: {reason}")]
    #[diagnostic(
        code(bundlepin::related::invalid_mapping),
        help("Replacements must be a JSON object mapping image references to image references")
    )]
    InvalidMapping { reason: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(bundlepin::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(bundlepin::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(bundlepin::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for PinError {
    fn from(err: std::io::Error) -> Self {
        PinError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for PinError {
    fn from(err: serde_yaml::Error) -> Self {
        PinError::ManifestParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PinError {
    fn from(err: serde_json::Error) -> Self {
        PinError::InvalidMapping {
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, PinError>;
