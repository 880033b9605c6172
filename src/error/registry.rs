//! Registry inspection errors

use super::PinError;

/// Creates an error for a reference the registry does not know
pub fn image_not_found(reference: impl Into<String>, reason: impl Into<String>) -> PinError {
    PinError::ImageNotFound {
        reference: reference.into(),
        reason: reason.into(),
    }
}

/// Creates an error for an inspection that failed for any other reason
pub fn inspection_failed(reference: impl Into<String>, reason: impl Into<String>) -> PinError {
    PinError::InspectionFailed {
        reference: reference.into(),
        reason: reason.into(),
    }
}

/// Creates a resolver configuration error
pub fn config(message: impl Into<String>) -> PinError {
    PinError::ResolverConfig {
        message: message.into(),
    }
}
