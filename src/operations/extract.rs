//! Extract operation module
//!
//! Lists the distinct references of a bundle without network access.

use crate::bundle::Bundle;
use crate::error::Result;
use crate::reference::ImageReference;
use crate::scanner::scan;

pub struct ExtractOperation<'a> {
    bundle: &'a Bundle,
}

impl<'a> ExtractOperation<'a> {
    pub fn new(bundle: &'a Bundle) -> Self {
        Self { bundle }
    }

    /// Canonical identity keys of every reference in the bundle, sorted
    pub fn execute(&self) -> Result<Vec<String>> {
        let report = scan(&self.bundle.document)?;
        let references: Vec<String> = report
            .distinct_references()
            .iter()
            .map(ImageReference::identity_key)
            .collect();
        tracing::info!(
            "Extracted {} references from {}",
            references.len(),
            self.bundle.path.display()
        );
        Ok(references)
    }
}
