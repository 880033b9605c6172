//! Manifest scanner
//!
//! Walks a parsed ClusterServiceVersion and records every image reference it
//! holds, together with the structural role of the field the reference was
//! found in. Scanning never mutates the document.
//!
//! Locations:
//! - `spec.relatedImages[*].image`
//! - `image` of every container and init container of every deployment
//! - `value` of `RELATED_IMAGE_*` env vars of those containers
//! - free text of every `annotations` mapping held by a `metadata` mapping

pub mod path;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

pub use path::TreePath;

use crate::error::bundle::schema_violation;
use crate::error::reference::malformed;
use crate::error::{PinError, Result};
use crate::reference::ImageReference;
use crate::reference::heuristic::find_references;

/// Env var prefix marking a related image
pub const RELATED_IMAGE_PREFIX: &str = "RELATED_IMAGE_";

const DEPLOYMENTS: &[&str] = &["spec", "install", "spec", "deployments"];
const POD_SPEC: &[&str] = &["spec", "template", "spec"];
const RELATED_IMAGES: &[&str] = &["spec", "relatedImages"];

/// Structural role of the field holding a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ContainerImage,
    InitContainerImage,
    EnvImage,
    RelatedImageEntry,
    AnnotationImage,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::ContainerImage => "container-image",
            Role::InitContainerImage => "init-container-image",
            Role::EnvImage => "env-image",
            Role::RelatedImageEntry => "related-image-entry",
            Role::AnnotationImage => "annotation-image",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One located reference
#[derive(Debug, Clone, Serialize)]
pub struct Occurrence {
    /// Reference text exactly as written in the manifest
    pub text: String,
    #[serde(skip)]
    pub reference: ImageReference,
    pub role: Role,
    pub path: TreePath,
    /// Container name, env-derived name, or related entry name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Occurrence {
    pub fn identity_key(&self) -> String {
        self.reference.identity_key()
    }
}

/// Every occurrence found in one document, in document order
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    occurrences: Vec<Occurrence>,
}

impl ScanReport {
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Occurrences grouped by identity key
    pub fn by_identity(&self) -> BTreeMap<String, Vec<&Occurrence>> {
        let mut groups: BTreeMap<String, Vec<&Occurrence>> = BTreeMap::new();
        for occurrence in &self.occurrences {
            groups
                .entry(occurrence.identity_key())
                .or_default()
                .push(occurrence);
        }
        groups
    }

    /// Distinct canonical references, sorted by identity key
    pub fn distinct_references(&self) -> Vec<ImageReference> {
        self.occurrences
            .iter()
            .map(|o| (o.identity_key(), o.reference.canonicalize()))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect()
    }

    /// Whether the document lists related images already
    pub fn has_related_images(&self) -> bool {
        self.occurrences
            .iter()
            .any(|o| o.role == Role::RelatedImageEntry)
    }
}

/// Scan a parsed CSV for image references
///
/// Structural problems (a container without `image`, an env var using
/// `valueFrom`) fail here, before any registry is contacted.
pub fn scan(document: &Value) -> Result<ScanReport> {
    let mut scanner = Scanner::default();
    scanner.related_images(document)?;
    scanner.deployments(document)?;
    scanner.annotations(document, &TreePath::root())?;

    tracing::debug!("Found {} image references", scanner.occurrences.len());
    Ok(ScanReport {
        occurrences: scanner.occurrences,
    })
}

#[derive(Default)]
struct Scanner {
    occurrences: Vec<Occurrence>,
}

impl Scanner {
    fn push(&mut self, text: &str, role: Role, path: TreePath, owner: Option<String>) -> Result<()> {
        let reference = ImageReference::parse(text).map_err(|e| at_path(e, &path))?;
        tracing::debug!("{} {} at {}", role, text, path);
        self.occurrences.push(Occurrence {
            text: text.to_string(),
            reference,
            role,
            path,
            owner,
        });
        Ok(())
    }

    fn related_images(&mut self, document: &Value) -> Result<()> {
        let Some(entries) = lookup(document, RELATED_IMAGES).and_then(Value::as_sequence) else {
            return Ok(());
        };
        let base = TreePath::root().keys(RELATED_IMAGES);
        for (i, entry) in entries.iter().enumerate() {
            let path = base.index(i);
            let image = required_image(entry, &path)?;
            let name = entry.get("name").and_then(Value::as_str).map(str::to_string);
            self.push(image, Role::RelatedImageEntry, path.key("image"), name)?;
        }
        Ok(())
    }

    fn deployments(&mut self, document: &Value) -> Result<()> {
        let Some(deployments) = lookup(document, DEPLOYMENTS).and_then(Value::as_sequence) else {
            return Ok(());
        };
        let base = TreePath::root().keys(DEPLOYMENTS);
        for (i, deployment) in deployments.iter().enumerate() {
            let Some(pod) = lookup(deployment, POD_SPEC) else {
                continue;
            };
            let pod_path = base.index(i).keys(POD_SPEC);
            for (field, role) in [
                ("containers", Role::ContainerImage),
                ("initContainers", Role::InitContainerImage),
            ] {
                let Some(containers) = pod.get(field).and_then(Value::as_sequence) else {
                    continue;
                };
                for (j, container) in containers.iter().enumerate() {
                    self.container(container, &pod_path.key(field).index(j), role)?;
                }
            }
        }
        Ok(())
    }

    fn container(&mut self, container: &Value, path: &TreePath, role: Role) -> Result<()> {
        let image = required_image(container, path)?;
        let name = container.get("name").and_then(Value::as_str).map(str::to_string);
        self.push(image, role, path.key("image"), name)?;

        let Some(env) = container.get("env").and_then(Value::as_sequence) else {
            return Ok(());
        };
        for (k, var) in env.iter().enumerate() {
            let Some(suffix) = var
                .get("name")
                .and_then(Value::as_str)
                .and_then(|name| name.strip_prefix(RELATED_IMAGE_PREFIX))
            else {
                continue;
            };
            let var_path = path.key("env").index(k);
            if var.get("valueFrom").is_some() {
                return Err(schema_violation(
                    var_path.to_string(),
                    "valueFrom references are not supported",
                ));
            }
            let value = var.get("value").and_then(Value::as_str).ok_or_else(|| {
                schema_violation(var_path.to_string(), "'value' is a required property")
            })?;
            self.push(
                value,
                Role::EnvImage,
                var_path.key("value"),
                Some(suffix.to_lowercase()),
            )?;
        }
        Ok(())
    }

    fn annotations(&mut self, node: &Value, path: &TreePath) -> Result<()> {
        match node {
            Value::Mapping(map) => {
                for (key, value) in map {
                    let Some(key) = key.as_str() else {
                        continue;
                    };
                    let child = path.key(key);
                    if key == "metadata" {
                        if let Some(annotations) = value.get("annotations").and_then(Value::as_mapping)
                        {
                            self.annotation_values(annotations, &child.key("annotations"))?;
                        }
                    }
                    self.annotations(value, &child)?;
                }
            }
            Value::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.annotations(item, &path.index(i))?;
                }
            }
            Value::Tagged(tagged) => self.annotations(&tagged.value, path)?,
            _ => {}
        }
        Ok(())
    }

    fn annotation_values(&mut self, annotations: &Mapping, path: &TreePath) -> Result<()> {
        for (key, value) in annotations {
            let (Some(key), Some(text)) = (key.as_str(), value.as_str()) else {
                continue;
            };
            for span in find_references(text) {
                self.push(&text[span], Role::AnnotationImage, path.key(key), None)?;
            }
        }
        Ok(())
    }
}

fn lookup<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |node, key| node.get(*key))
}

fn required_image<'a>(node: &'a Value, path: &TreePath) -> Result<&'a str> {
    node.get("image")
        .and_then(Value::as_str)
        .ok_or_else(|| schema_violation(path.to_string(), "'image' is a required property"))
}

fn at_path(err: PinError, path: &TreePath) -> PinError {
    match err {
        PinError::MalformedReference { reference, reason } => {
            malformed(reference, format!("{reason} (at {path})"))
        }
        other => other,
    }
}
