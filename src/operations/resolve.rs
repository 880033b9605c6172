//! Resolve operation module
//!
//! Resolves an explicit list of references, no bundle involved.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::error::reference::invalid_mapping;
use crate::reference::ImageReference;
use crate::resolver::Resolver;

/// Parse a JSON array of reference texts
pub fn parse_reference_list(json: &str) -> Result<Vec<String>> {
    serde_json::from_str(json)
        .map_err(|e| invalid_mapping(format!("expected a JSON array of image references: {e}")))
}

pub struct ResolveOperation<'a> {
    resolver: &'a Resolver<'a>,
}

impl<'a> ResolveOperation<'a> {
    pub fn new(resolver: &'a Resolver<'a>) -> Self {
        Self { resolver }
    }

    /// Identity key of each reference to its digest form
    pub fn execute(&self, references: &[String]) -> Result<BTreeMap<String, String>> {
        let parsed = references
            .iter()
            .map(|text| ImageReference::parse(text))
            .collect::<Result<Vec<_>>>()?;
        let resolved = self.resolver.resolve_all(&parsed)?;
        Ok(resolved
            .into_iter()
            .map(|(key, reference)| (key, reference.to_string()))
            .collect())
    }
}
