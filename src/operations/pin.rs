//! Pin operation module
//!
//! Runs the whole pipeline on one bundle: scan, resolve every distinct
//! reference, build the related-images list, rewrite and persist.

use std::collections::BTreeMap;

use super::{OccurrenceRecord, text_replacements};
use crate::bundle::Bundle;
use crate::error::Result;
use crate::related::{self, RelatedImage};
use crate::replacer::{self, Rewrite};
use crate::resolver::Resolver;
use crate::scanner::scan;

/// Configuration options for pin
#[derive(Debug, Clone, Default)]
pub struct PinOptions {
    /// Compute everything but leave the bundle file untouched
    pub dry_run: bool,
}

/// What a pin run did
#[derive(Debug, Clone, Default)]
pub struct PinOutcome {
    /// Every occurrence with its resolution
    pub records: Vec<OccurrenceRecord>,
    /// Identity key to resolved reference
    pub replacements: BTreeMap<String, String>,
    pub related_images: Vec<RelatedImage>,
    /// Rewritten text, when the bundle was not skipped
    pub rewrite: Option<Rewrite>,
    /// The bundle already listed related images and was left alone
    pub skipped: bool,
    /// The bundle file was written
    pub persisted: bool,
}

pub struct PinOperation<'a> {
    resolver: &'a Resolver<'a>,
    options: PinOptions,
}

impl<'a> PinOperation<'a> {
    pub fn new(resolver: &'a Resolver<'a>, options: PinOptions) -> Self {
        Self { resolver, options }
    }

    pub fn execute(&self, bundle: &Bundle) -> Result<PinOutcome> {
        let report = scan(&bundle.document)?;
        if report.has_related_images() {
            tracing::info!(
                "{} already lists related images; leaving it untouched",
                bundle.path.display()
            );
            return Ok(PinOutcome {
                skipped: true,
                ..PinOutcome::default()
            });
        }

        let resolved = self.resolver.resolve_all(&report.distinct_references())?;
        let related_images = related::build(&report, &resolved)?;
        let replacements = text_replacements(&report, &resolved);
        let rewrite = replacer::rewrite(
            &bundle.path,
            &bundle.text,
            &replacements,
            Some(&related_images),
        )?;

        let persisted = rewrite.changed(&bundle.text) && !self.options.dry_run;
        if persisted {
            bundle.persist(&rewrite.text)?;
        }

        let records = report
            .occurrences()
            .iter()
            .map(|o| {
                let key = o.identity_key();
                OccurrenceRecord {
                    reference: o.text.clone(),
                    canonical: o.reference.canonicalize().to_string(),
                    resolved: resolved
                        .get(&key)
                        .map_or_else(|| o.text.clone(), ToString::to_string),
                    role: o.role,
                    path: o.path.to_string(),
                    owner: o.owner.clone(),
                }
            })
            .collect();

        Ok(PinOutcome {
            records,
            replacements: resolved
                .into_iter()
                .map(|(key, reference)| (key, reference.to_string()))
                .collect(),
            related_images,
            rewrite: Some(rewrite),
            skipped: false,
            persisted,
        })
    }
}
