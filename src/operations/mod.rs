//! Pinning operations
//!
//! Each operation composes the engine for one command:
//! - ExtractOperation: list the distinct references of a bundle
//! - ResolveOperation: resolve a list of references to digests
//! - PinOperation: resolve and rewrite a bundle in one go
//! - ReplaceOperation: apply a caller-supplied replacement map to a bundle
//!
//! Operations return data; reading inputs, writing artifacts and printing
//! is left to the commands.

pub mod extract;
pub mod pin;
pub mod replace;
pub mod resolve;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::reference::ImageReference;
use crate::replacer::Replacements;
use crate::scanner::{Role, ScanReport};

pub use extract::ExtractOperation;
pub use pin::{PinOperation, PinOptions, PinOutcome};
pub use replace::{ReplaceOperation, ReplaceOptions, load_replacements};
pub use resolve::{ResolveOperation, parse_reference_list};

/// One located reference and what it resolved to, as written to `references.json`
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceRecord {
    /// Text as written in the manifest
    pub reference: String,
    pub canonical: String,
    pub resolved: String,
    pub role: Role,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Original reference text to replacement text, for every occurrence that changes
///
/// Each text keeps the tree paths it was found at, so bare names are only
/// rewritten there.
///
/// Occurrences whose replacement is identity-equal to them already (such as
/// `repo:tag@digest` mapped to `repo@digest`) are left as written.
pub(crate) fn text_replacements(
    report: &ScanReport,
    mapping: &BTreeMap<String, ImageReference>,
) -> Replacements {
    let mut replacements = Replacements::default();
    for occurrence in report.occurrences() {
        let Some(target) = mapping.get(&occurrence.identity_key()) else {
            continue;
        };
        if target.identity_key() == occurrence.identity_key() {
            continue;
        }
        let replacement = target.to_string();
        if replacement != occurrence.text {
            replacements.insert(&occurrence.text, replacement, &occurrence.path);
        }
    }
    replacements
}
