//! Digest resolution
//!
//! A [`Resolver`] maps references to their digest form. Digest references
//! resolve to themselves; tag references are looked up once each through a
//! [`RegistryInspector`] and remembered in a [`ResolutionCache`] owned by the
//! resolver, so one invocation never asks twice for the same identity key.

pub mod command;
pub mod script;
pub mod skopeo;

use std::collections::BTreeMap;
use std::path::PathBuf;

use dashmap::DashMap;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::error::Result;
use crate::error::fs::io_error;
use crate::error::registry::config;
use crate::progress::ProgressDisplay;
use crate::reference::{Digest, ImageReference};

pub use script::ScriptInspector;
pub use skopeo::SkopeoInspector;

/// Parallel registry lookups when nothing else is configured
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Learns the digest a registry serves for a tag reference
pub trait RegistryInspector: Send + Sync {
    fn inspect(&self, reference: &ImageReference) -> Result<Digest>;
}

/// Which external program performs registry lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResolverKind {
    /// `skopeo inspect`
    #[default]
    Skopeo,
    /// A script printing the digest for the reference it is given
    Script,
}

/// Resolver settings gathered from flags and environment
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub kind: ResolverKind,
    /// Program to run; `skopeo` from `PATH` when unset
    pub path: Option<PathBuf>,
    pub authfile: Option<PathBuf>,
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind: ResolverKind::Skopeo,
            path: None,
            authfile: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ResolverConfig {
    /// Build the configured inspector
    pub fn inspector(&self) -> Result<Box<dyn RegistryInspector>> {
        match self.kind {
            ResolverKind::Skopeo => {
                let program = self
                    .path
                    .clone()
                    .unwrap_or_else(|| skopeo::default_program().to_path_buf());
                Ok(Box::new(SkopeoInspector::new(program, self.authfile.clone())?))
            }
            ResolverKind::Script => {
                let script = self
                    .path
                    .as_ref()
                    .ok_or_else(|| config("the script resolver requires --resolver-path"))?;
                if self.authfile.is_some() {
                    tracing::warn!("--authfile is ignored by the script resolver");
                }
                Ok(Box::new(ScriptInspector::new(script)?))
            }
        }
    }
}

/// Identity key to resolved reference, insert-once
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<String, ImageReference>,
}

impl ResolutionCache {
    pub fn get(&self, key: &str) -> Option<ImageReference> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store `resolved` unless `key` is already cached; returns the cached value
    pub fn insert(&self, key: String, resolved: ImageReference) -> ImageReference {
        self.entries.entry(key).or_insert(resolved).value().clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves references to digest form for one operation
pub struct Resolver<'a> {
    inspector: &'a dyn RegistryInspector,
    cache: ResolutionCache,
    concurrency: usize,
    show_progress: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(inspector: &'a dyn RegistryInspector, concurrency: usize) -> Self {
        Self {
            inspector,
            cache: ResolutionCache::default(),
            concurrency: concurrency.max(1),
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while resolving
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    #[cfg(test)]
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve one reference
    pub fn resolve(&self, reference: &ImageReference) -> Result<ImageReference> {
        let canonical = reference.canonicalize();
        if canonical.is_pinned() {
            return Ok(canonical);
        }

        let key = canonical.identity_key();
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let digest = self.inspector.inspect(&canonical)?;
        let resolved = canonical.with_digest(digest);
        tracing::info!("Resolved {} to {}", key, resolved);
        Ok(self.cache.insert(key, resolved))
    }

    /// Resolve every distinct reference, keyed by identity key
    ///
    /// Lookups run on a pool of `concurrency` threads. The first failure
    /// fails the whole call and no partial map is returned.
    pub fn resolve_all(
        &self,
        references: &[ImageReference],
    ) -> Result<BTreeMap<String, ImageReference>> {
        let unique: BTreeMap<String, ImageReference> = references
            .iter()
            .map(|r| (r.identity_key(), r.canonicalize()))
            .collect();
        let lookups = unique.values().filter(|r| !r.is_pinned()).count();
        tracing::debug!(
            "Resolving {} references ({} registry lookups, {} threads)",
            unique.len(),
            lookups,
            self.concurrency
        );

        let progress = if self.show_progress && lookups > 0 {
            ProgressDisplay::new(u64::try_from(lookups).unwrap_or(u64::MAX))
        } else {
            ProgressDisplay::hidden()
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()
            .map_err(|e| io_error(format!("failed to start resolver threads: {e}")))?;

        let resolved: Result<Vec<(String, ImageReference)>> = pool.install(|| {
            unique
                .par_iter()
                .map(|(key, reference)| {
                    if reference.is_pinned() {
                        return Ok((key.clone(), reference.clone()));
                    }
                    progress.update(key);
                    let resolved = self.resolve(reference)?;
                    progress.inc();
                    Ok((key.clone(), resolved))
                })
                .collect()
        });

        match resolved {
            Ok(pairs) => {
                progress.finish();
                Ok(pairs.into_iter().collect())
            }
            Err(e) => {
                progress.abandon();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::error::PinError;
    use crate::error::registry::image_not_found;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed table and counts lookups
    #[derive(Default)]
    pub(crate) struct TableInspector {
        pub digests: HashMap<String, String>,
        pub calls: AtomicUsize,
    }

    impl TableInspector {
        pub fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                digests: entries
                    .iter()
                    .map(|(r, d)| ((*r).to_string(), (*d).to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RegistryInspector for TableInspector {
        fn inspect(&self, reference: &ImageReference) -> Result<Digest> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.digests.get(&reference.to_string()) {
                Some(hex) => Digest::sha256(hex),
                None => Err(image_not_found(reference.to_string(), "manifest unknown")),
            }
        }
    }

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn refs(texts: &[&str]) -> Vec<ImageReference> {
        texts
            .iter()
            .map(|t| ImageReference::parse(t).unwrap())
            .collect()
    }

    #[test]
    fn test_resolve_tag_reference() {
        let inspector = TableInspector::new(&[("quay.io/ns/a:v1", SHA_A)]);
        let resolver = Resolver::new(&inspector, 1);
        let resolved = resolver
            .resolve(&ImageReference::parse("quay.io/ns/a:v1").unwrap())
            .unwrap();
        assert_eq!(resolved.to_string(), format!("quay.io/ns/a@sha256:{SHA_A}"));
    }

    #[test]
    fn test_implicit_latest_is_looked_up() {
        let inspector = TableInspector::new(&[("quay.io/ns/a:latest", SHA_A)]);
        let resolver = Resolver::new(&inspector, 1);
        let map = resolver.resolve_all(&refs(&["quay.io/ns/a"])).unwrap();
        assert_eq!(
            map["quay.io/ns/a:latest"].to_string(),
            format!("quay.io/ns/a@sha256:{SHA_A}")
        );
    }

    #[test]
    fn test_digest_reference_maps_to_itself() {
        let inspector = TableInspector::default();
        let resolver = Resolver::new(&inspector, 2);
        let text = format!("quay.io/ns/a@sha256:{SHA_B}");
        let map = resolver.resolve_all(&refs(&[&text])).unwrap();
        assert_eq!(map[&text].to_string(), text);
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_each_identity_is_inspected_once() {
        let inspector = TableInspector::new(&[
            ("quay.io/ns/a:latest", SHA_A),
            ("quay.io/ns/b:v2", SHA_B),
        ]);
        let resolver = Resolver::new(&inspector, 4);
        let map = resolver
            .resolve_all(&refs(&[
                "quay.io/ns/a",
                "quay.io/ns/a:latest",
                "quay.io/ns/b:v2",
                "quay.io/ns/b:v2",
            ]))
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 2);

        resolver
            .resolve(&ImageReference::parse("quay.io/ns/b:v2").unwrap())
            .unwrap();
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.cache().len(), 2);
    }

    #[test]
    fn test_failure_aborts_everything() {
        let inspector = TableInspector::new(&[("quay.io/ns/a:v1", SHA_A)]);
        let resolver = Resolver::new(&inspector, 3);
        let err = resolver
            .resolve_all(&refs(&["quay.io/ns/a:v1", "quay.io/ns/missing:v1"]))
            .unwrap_err();
        assert!(matches!(err, PinError::ImageNotFound { .. }));
        assert!(
            err.to_string()
                .contains("Failed to inspect docker://quay.io/ns/missing:v1.")
        );
    }

    #[test]
    fn test_cache_first_writer_wins() {
        let cache = ResolutionCache::default();
        let first = ImageReference::parse(&format!("quay.io/ns/a@sha256:{SHA_A}")).unwrap();
        let second = ImageReference::parse(&format!("quay.io/ns/a@sha256:{SHA_B}")).unwrap();
        cache.insert("quay.io/ns/a:v1".to_string(), first.clone());
        let kept = cache.insert("quay.io/ns/a:v1".to_string(), second);
        assert_eq!(kept, first);
        assert_eq!(cache.get("quay.io/ns/a:v1"), Some(first));
    }

    #[test]
    fn test_script_resolver_requires_path() {
        let config = ResolverConfig {
            kind: ResolverKind::Script,
            ..ResolverConfig::default()
        };
        let err = config.inspector().err().unwrap();
        assert!(matches!(err, PinError::ResolverConfig { .. }));
    }
}
