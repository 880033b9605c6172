//! Replace operation module
//!
//! Applies a caller-supplied `reference -> reference` map to a bundle. With
//! the map produced by `resolve`, the result is the same document `pin`
//! writes.

use std::collections::BTreeMap;
use std::path::Path;

use super::text_replacements;
use crate::bundle::{Bundle, ensure_file};
use crate::error::reference::invalid_mapping;
use crate::error::{PinError, Result, fs};
use crate::reference::ImageReference;
use crate::related::{self, RelatedImage};
use crate::replacer::{self, Rewrite};
use crate::scanner::scan;

/// Read a replacements file, keyed by canonical identity key
pub fn load_replacements(path: &Path) -> Result<BTreeMap<String, ImageReference>> {
    ensure_file(path)?;
    let text = fs::read_to_string(path)?;
    parse_replacements(&text).map_err(|e| match e {
        PinError::InvalidMapping { reason } => {
            invalid_mapping(format!("{}: {reason}", path.display()))
        }
        other => other,
    })
}

fn parse_replacements(text: &str) -> Result<BTreeMap<String, ImageReference>> {
    let raw: BTreeMap<String, String> = serde_json::from_str(text)?;
    let mut mapping: BTreeMap<String, ImageReference> = BTreeMap::new();
    for (from, to) in raw {
        let key = ImageReference::parse(&from)?.identity_key();
        let target = ImageReference::parse(&to)?;
        if let Some(existing) = mapping.get(&key) {
            if existing != &target {
                return Err(invalid_mapping(format!(
                    "{key} is mapped to both {existing} and {target}"
                )));
            }
        }
        mapping.insert(key, target);
    }
    Ok(mapping)
}

/// Configuration options for replace
#[derive(Debug, Clone)]
pub struct ReplaceOptions {
    pub dry_run: bool,
    /// Insert `spec.relatedImages` built from the map when the bundle has none
    pub related_images: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            related_images: true,
        }
    }
}

/// What a replace run did
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub rewrite: Rewrite,
    pub related_images: Vec<RelatedImage>,
    /// Map keys that matched no reference in the bundle
    pub unmatched: Vec<String>,
    pub persisted: bool,
}

pub struct ReplaceOperation<'a> {
    mapping: &'a BTreeMap<String, ImageReference>,
    options: ReplaceOptions,
}

impl<'a> ReplaceOperation<'a> {
    pub fn new(mapping: &'a BTreeMap<String, ImageReference>, options: ReplaceOptions) -> Self {
        Self { mapping, options }
    }

    pub fn execute(&self, bundle: &Bundle) -> Result<ReplaceOutcome> {
        let report = scan(&bundle.document)?;
        let replacements = text_replacements(&report, self.mapping);

        let related_images = if self.options.related_images && !report.has_related_images() {
            related::build(&report, self.mapping)?
        } else {
            Vec::new()
        };

        let rewrite = replacer::rewrite(
            &bundle.path,
            &bundle.text,
            &replacements,
            Some(&related_images),
        )?;

        let groups = report.by_identity();
        let unmatched: Vec<String> = self
            .mapping
            .keys()
            .filter(|key| !groups.contains_key(*key))
            .cloned()
            .collect();
        for key in &unmatched {
            tracing::debug!("{} does not occur in {}", key, bundle.path.display());
        }

        let persisted = rewrite.changed(&bundle.text) && !self.options.dry_run;
        if persisted {
            bundle.persist(&rewrite.text)?;
        }

        Ok(ReplaceOutcome {
            rewrite,
            related_images,
            unmatched,
            persisted,
        })
    }
}
