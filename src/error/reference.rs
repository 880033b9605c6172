//! Image reference errors

use super::PinError;

/// Creates a malformed reference error
pub fn malformed(reference: impl Into<String>, reason: impl Into<String>) -> PinError {
    PinError::MalformedReference {
        reference: reference.into(),
        reason: reason.into(),
    }
}

/// Creates an error for a replacements file that is not a reference mapping
pub fn invalid_mapping(reason: impl Into<String>) -> PinError {
    PinError::InvalidMapping {
        reason: reason.into(),
    }
}

/// Creates an error listing related image names claimed by different images
pub fn related_image_conflict(conflicts: &[String]) -> PinError {
    PinError::RelatedImageConflict {
        conflicts: conflicts.join("\n"),
    }
}
