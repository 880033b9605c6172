//! Image reference model
//!
//! An [`ImageReference`] is a parsed container image pullspec of the form
//! `[registry/]path[:tag][@algorithm:hex]`. Identity between references is
//! defined by [`ImageReference::identity_key`], the canonical string form
//! used for deduplication and resolution caching.

pub mod heuristic;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::reference::malformed;
use crate::error::{PinError, Result};

/// Tag assumed when a reference carries neither tag nor digest
pub const DEFAULT_TAG: &str = "latest";

static REGISTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?(?::[0-9]+)?$")
        .unwrap_or_else(|e| unreachable!("invalid registry regex: {e}"))
});

static COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$")
        .unwrap_or_else(|e| unreachable!("invalid component regex: {e}"))
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$")
        .unwrap_or_else(|e| unreachable!("invalid tag regex: {e}"))
});

static DIGEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[+._-][a-z0-9]+)*:[A-Fa-f0-9]+$")
        .unwrap_or_else(|e| unreachable!("invalid digest regex: {e}"))
});

/// Content digest of an image manifest (`algorithm:hex`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    /// Parse `algorithm:hex`
    pub fn parse(text: &str) -> Result<Self> {
        if !DIGEST_RE.is_match(text) {
            return Err(malformed(text, "digest must have the form algorithm:hex"));
        }
        let (algorithm, hex) = text
            .split_once(':')
            .ok_or_else(|| malformed(text, "digest must have the form algorithm:hex"))?;
        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// Build a SHA-256 digest from its hex encoding
    pub fn sha256(hex: &str) -> Result<Self> {
        Self::parse(&format!("sha256:{hex}"))
    }

    #[cfg(test)]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// A parsed container image reference
///
/// Structural equality (`==`) compares the parsed components as written.
/// Use [`ImageReference::identity_key`] to compare references the way the
/// pinning engine does, where `repo/image` and `repo/image:latest` are the
/// same image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    registry: Option<String>,
    repository: String,
    tag: Option<String>,
    digest: Option<Digest>,
}

impl ImageReference {
    /// Parse a reference such as `quay.io/ns/image:v1` or `image@sha256:...`
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(malformed(text, "reference is empty"));
        }

        let (name_part, digest) = match text.split_once('@') {
            Some((name, digest)) => {
                let digest = Digest::parse(digest).map_err(|_| {
                    malformed(text, format!("invalid digest '{digest}'"))
                })?;
                (name, Some(digest))
            }
            None => (text, None),
        };

        // A ':' after the last '/' separates the tag; earlier ones belong to a registry port
        let last_slash = name_part.rfind('/');
        let (name, tag) = match name_part.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                (&name_part[..colon], Some(&name_part[colon + 1..]))
            }
            _ => (name_part, None),
        };

        if let Some(tag) = tag {
            if !TAG_RE.is_match(tag) {
                return Err(malformed(text, format!("invalid tag '{tag}'")));
            }
        }

        let components: Vec<&str> = name.split('/').collect();
        let (registry, path) = match components.split_first() {
            Some((first, rest)) if !rest.is_empty() && looks_like_registry(first) => {
                if !REGISTRY_RE.is_match(first) {
                    return Err(malformed(text, format!("invalid registry '{first}'")));
                }
                (Some((*first).to_string()), rest)
            }
            _ => (None, components.as_slice()),
        };

        for component in path {
            if component.is_empty() {
                return Err(malformed(text, "empty path component"));
            }
            if !COMPONENT_RE.is_match(component) {
                return Err(malformed(
                    text,
                    format!("invalid path component '{component}'"),
                ));
            }
        }

        Ok(Self {
            registry,
            repository: path.join("/"),
            tag: tag.map(str::to_string),
            digest,
        })
    }

    /// Return the reference with the implicit `latest` tag made explicit
    ///
    /// References that already carry a tag or a digest are returned unchanged.
    #[must_use]
    pub fn canonicalize(&self) -> Self {
        let mut canonical = self.clone();
        if canonical.tag.is_none() && canonical.digest.is_none() {
            canonical.tag = Some(DEFAULT_TAG.to_string());
        }
        canonical
    }

    /// Canonical string used to deduplicate and cache references
    ///
    /// The digest wins over the tag when both are present.
    pub fn identity_key(&self) -> String {
        match (&self.digest, &self.tag) {
            (Some(digest), _) => format!("{}@{}", self.name(), digest),
            (None, Some(tag)) => format!("{}:{}", self.name(), tag),
            (None, None) => format!("{}:{}", self.name(), DEFAULT_TAG),
        }
    }

    /// Registry and repository path without tag or digest
    pub fn name(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}", registry, self.repository),
            None => self.repository.clone(),
        }
    }

    /// Last path component, e.g. `image` for `quay.io/ns/image:v1`
    pub fn basename(&self) -> &str {
        self.repository
            .rsplit('/')
            .next()
            .unwrap_or(self.repository.as_str())
    }

    #[cfg(test)]
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    #[cfg(test)]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    /// Whether the reference is already pinned to a digest
    pub fn is_pinned(&self) -> bool {
        self.digest.is_some()
    }

    /// Digest form of the same repository (`name@digest`)
    #[must_use]
    pub fn with_digest(&self, digest: Digest) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            digest: Some(digest),
        }
    }
}

fn looks_like_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for ImageReference {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
