//! Related-images list builder
//!
//! Every distinct resolved image gets one entry per name drawn from the
//! highest tier that has any:
//! 1. container and init container names using the image
//! 2. names derived from `RELATED_IMAGE_*` env vars holding the image
//! 3. names of existing `spec.relatedImages` entries for the image
//! 4. `<basename>-<digest hex>-annotation`
//!
//! Names depend only on the scan and the digests, never on iteration order.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::error::reference::related_image_conflict;
use crate::reference::ImageReference;
use crate::scanner::{Occurrence, Role, ScanReport};

/// One `spec.relatedImages` entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelatedImage {
    pub name: String,
    pub image: String,
}

/// Build the related-images list from a scan and the resolution map
///
/// `resolved` maps identity keys to resolved references. Occurrences whose
/// key is missing from it are listed as written.
pub fn build(
    report: &ScanReport,
    resolved: &BTreeMap<String, ImageReference>,
) -> Result<Vec<RelatedImage>> {
    let mut groups: BTreeMap<String, (ImageReference, Vec<&Occurrence>)> = BTreeMap::new();
    for occurrence in report.occurrences() {
        let reference = resolved
            .get(&occurrence.identity_key())
            .cloned()
            .unwrap_or_else(|| occurrence.reference.canonicalize());
        if !reference.is_pinned() {
            tracing::warn!("{} is not pinned to a digest", reference);
        }
        groups
            .entry(pinned_text(&reference))
            .or_insert_with(|| (reference, Vec::new()))
            .1
            .push(occurrence);
    }

    let mut entries: BTreeMap<String, String> = BTreeMap::new();
    let mut conflicts = Vec::new();
    for (image, (reference, occurrences)) in &groups {
        for name in names_for(reference, occurrences) {
            match entries.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(image.clone());
                }
                Entry::Occupied(slot) if slot.get() != image => {
                    conflicts.push(format!("{}: {} and {}", slot.key(), slot.get(), image));
                }
                Entry::Occupied(_) => {}
            }
        }
    }

    if !conflicts.is_empty() {
        return Err(related_image_conflict(&conflicts));
    }

    tracing::debug!(
        "Built {} related images for {} distinct images",
        entries.len(),
        groups.len()
    );
    Ok(entries
        .into_iter()
        .map(|(name, image)| RelatedImage { name, image })
        .collect())
}

/// Digest form of a resolved reference, dropping any tag kept next to the digest
fn pinned_text(reference: &ImageReference) -> String {
    match reference.digest() {
        Some(digest) => format!("{}@{}", reference.name(), digest),
        None => reference.to_string(),
    }
}

fn names_for(reference: &ImageReference, occurrences: &[&Occurrence]) -> BTreeSet<String> {
    let tiers: [&[Role]; 3] = [
        &[Role::ContainerImage, Role::InitContainerImage],
        &[Role::EnvImage],
        &[Role::RelatedImageEntry],
    ];
    for roles in tiers {
        let names: BTreeSet<String> = occurrences
            .iter()
            .filter(|o| roles.contains(&o.role))
            .filter_map(|o| o.owner.clone())
            .collect();
        if !names.is_empty() {
            return names;
        }
    }
    BTreeSet::from([synthesized_name(reference)])
}

/// `<basename>-<digest hex>-annotation`, or the tag when there is no digest
pub fn synthesized_name(reference: &ImageReference) -> String {
    let suffix = reference
        .digest()
        .map(|d| d.hex().to_string())
        .or_else(|| reference.tag().map(str::to_string))
        .unwrap_or_default();
    format!("{}-{}-annotation", reference.basename(), suffix)
}
