//! Output artifacts of a pin run
//!
//! The artifact files are created empty as soon as the bundle has loaded and
//! are only filled at the end of a successful run. An [`OutputArtifacts`]
//! that is dropped without [`OutputArtifacts::commit`] truncates every file it
//! tracks back to zero bytes, so a failed run never leaves partial output.
//!
//! ## Usage
//!
//! ```ignore
//! let artifacts = OutputArtifacts::create(&[&references, &replacements])?;
//!
//! // Scan, resolve, rewrite...
//! artifacts.write_json(&references, &records)?;
//!
//! // On success:
//! artifacts.commit();
//!
//! // On error (automatic via Drop if not committed):
//! // files are truncated
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::error::fs::{io_error, write_failed};

/// Output files guarded for the duration of one operation
#[derive(Debug)]
pub struct OutputArtifacts {
    /// Files created (and truncated) by this guard
    files: Vec<PathBuf>,

    /// Whether the run succeeded
    committed: bool,
}

impl OutputArtifacts {
    /// Create or truncate every file in `paths`
    pub fn create(paths: &[&Path]) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            File::create(path).map_err(|e| write_failed(path.display().to_string(), e.to_string()))?;
            files.push(path.to_path_buf());
        }
        Ok(Self {
            files,
            committed: false,
        })
    }

    /// Write `value` as pretty JSON to one of the tracked files
    pub fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        if !self.files.iter().any(|f| f == path) {
            return Err(io_error(format!(
                "{} is not an output artifact of this run",
                path.display()
            )));
        }
        let mut json = serde_json::to_string_pretty(value)
            .map_err(|e| write_failed(path.display().to_string(), e.to_string()))?;
        json.push('\n');
        fs::write(path, json).map_err(|e| write_failed(path.display().to_string(), e.to_string()))
    }

    /// Keep the written contents
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Truncate every tracked file
    pub fn rollback(&mut self) -> Result<()> {
        if self.committed {
            return Ok(());
        }

        for path in &self.files {
            OpenOptions::new()
                .write(true)
                .open(path)
                .and_then(|file| file.set_len(0))
                .map_err(|e| write_failed(path.display().to_string(), e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for OutputArtifacts {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.rollback() {
                tracing::warn!("Failed to empty output artifacts: {}", e);
            }
        }
    }
}
