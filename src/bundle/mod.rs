//! Operator bundle loading
//!
//! A bundle is a directory of Kubernetes manifests that holds exactly one
//! ClusterServiceVersion. The CSV is kept both as original text, for the
//! format-preserving rewrite, and as a parsed tree for scanning.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{Result, bundle, fs};

/// Manifest kind that carries the images to pin
pub const CSV_KIND: &str = "ClusterServiceVersion";

/// The single ClusterServiceVersion of a bundle directory
#[derive(Debug, Clone)]
pub struct Bundle {
    pub path: PathBuf,
    pub text: String,
    pub document: Value,
}

impl Bundle {
    /// Find and load the CSV inside `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;

        let mut found = Vec::new();
        for path in manifest_files(dir) {
            let text = fs::read_to_string(&path)?;
            if let Some(document) = csv_document(&path, &text)? {
                tracing::debug!("Found {} in {}", CSV_KIND, path.display());
                found.push(Bundle {
                    path,
                    text,
                    document,
                });
            }
        }

        match found.len() {
            0 => Err(bundle::missing_csv(dir.display().to_string())),
            1 => Ok(found.remove(0)),
            _ => Err(bundle::multiple_csv(
                &found
                    .iter()
                    .map(|b| b.path.display().to_string())
                    .collect::<Vec<_>>(),
            )),
        }
    }

    #[cfg(test)]
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let text = text.into();
        let document = csv_document(&path, &text)?
            .ok_or_else(|| bundle::missing_csv(path.display().to_string()))?;
        Ok(Self {
            path,
            text,
            document,
        })
    }

    /// Atomically replace the CSV file with `text`
    ///
    /// Writes a sibling temp file and renames it over the original, keeping
    /// the original permissions.
    pub fn persist(&self, text: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let write_err = |e: &dyn std::fmt::Display| {
            fs::write_failed(self.path.display().to_string(), e.to_string())
        };

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| write_err(&e))?;
        tmp.write_all(text.as_bytes()).map_err(|e| write_err(&e))?;
        tmp.flush().map_err(|e| write_err(&e))?;
        if let Ok(metadata) = std::fs::metadata(&self.path) {
            std::fs::set_permissions(tmp.path(), metadata.permissions())
                .map_err(|e| write_err(&e))?;
        }
        tmp.persist(&self.path).map_err(|e| write_err(&e.error))?;

        tracing::debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

/// Fail with `InputNotFound` unless `path` is an existing directory
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(bundle::input_not_found(path.display().to_string()))
    }
}

/// Fail with `InputNotFound` unless `path` is an existing file
pub fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(bundle::input_not_found(path.display().to_string()))
    }
}

/// All `*.yaml` / `*.yml` files below `dir`, sorted by path
fn manifest_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    files.sort();
    files
}

/// Parse every document in `text` and return the CSV, if the file holds one
fn csv_document(path: &Path, text: &str) -> Result<Option<Value>> {
    let mut documents = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(doc)
            .map_err(|e| bundle::parse_failed(path.display().to_string(), e.to_string()))?;
        documents.push(value);
    }

    let is_csv = |doc: &Value| doc.get("kind").and_then(Value::as_str) == Some(CSV_KIND);
    match documents.iter().position(is_csv) {
        None => {
            tracing::debug!("Skipping {}: no {}", path.display(), CSV_KIND);
            Ok(None)
        }
        Some(_) if documents.len() > 1 => Err(bundle::multi_document(path.display().to_string())),
        Some(index) => Ok(Some(documents.swap_remove(index))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PinError;
    use tempfile::TempDir;

    const CSV: &str = "apiVersion: operators.coreos.com/v1alpha1\nkind: ClusterServiceVersion\nmetadata:\n  name: test\nspec: {}\n";
    const CRD: &str = "apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\nmetadata:\n  name: tests.example.com\n";

    #[test]
    fn test_load_finds_single_csv() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("crd.yaml"), CRD).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/csv.yml"), CSV).unwrap();
        std::fs::write(dir.path().join("notes.txt"), CSV).unwrap();

        let bundle = Bundle::load(dir.path()).unwrap();
        assert!(bundle.path.ends_with("nested/csv.yml"));
        assert_eq!(bundle.text, CSV);
        assert_eq!(bundle.document["metadata"]["name"].as_str(), Some("test"));
    }

    #[test]
    fn test_load_missing_dir() {
        let err = Bundle::load(Path::new("/nonexistent/bundle/dir")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "/nonexistent/bundle/dir is not a directory or does not exist"
        );
    }

    #[test]
    fn test_load_without_csv() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("crd.yaml"), CRD).unwrap();
        let err = Bundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, PinError::MissingCsv { .. }));
    }

    #[test]
    fn test_load_with_two_csvs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), CSV).unwrap();
        std::fs::write(dir.path().join("b.yaml"), CSV).unwrap();
        let err = Bundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, PinError::MultipleCsv { .. }));
    }

    #[test]
    fn test_csv_sharing_a_file_is_rejected() {
        let text = format!("{CRD}---\n{CSV}");
        let err = Bundle::from_text("bundle.yaml", text).unwrap_err();
        assert!(matches!(err, PinError::MultiDocumentCsv { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let err = Bundle::from_text("bad.yaml", "kind: [unclosed").unwrap_err();
        assert!(matches!(err, PinError::ManifestParseFailed { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_persist_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("csv.yaml");
        std::fs::write(&path, CSV).unwrap();
        let bundle = Bundle::load(dir.path()).unwrap();

        bundle.persist("kind: ClusterServiceVersion\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "kind: ClusterServiceVersion\n"
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
