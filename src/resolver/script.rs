//! Registry inspection through a user-provided script
//!
//! The script receives the reference as its only argument and prints the
//! digest on stdout, either as bare hex or as `algorithm:hex`.

use std::path::PathBuf;

use super::RegistryInspector;
use super::command::{CommandRunner, SystemRunner};
use crate::error::Result;
use crate::error::registry::{config, image_not_found, inspection_failed};
use crate::reference::{Digest, ImageReference};

pub struct ScriptInspector<R = SystemRunner> {
    script: PathBuf,
    runner: R,
}

impl ScriptInspector<SystemRunner> {
    pub fn new(script: impl Into<PathBuf>) -> Result<Self> {
        Self::with_runner(script, SystemRunner)
    }
}

impl<R: CommandRunner> ScriptInspector<R> {
    pub fn with_runner(script: impl Into<PathBuf>, runner: R) -> Result<Self> {
        let script = script.into();
        if !script.is_file() {
            return Err(config(format!(
                "resolver script {} does not exist",
                script.display()
            )));
        }
        Ok(Self { script, runner })
    }
}

impl<R: CommandRunner> RegistryInspector for ScriptInspector<R> {
    fn inspect(&self, reference: &ImageReference) -> Result<Digest> {
        let output = self
            .runner
            .run(&self.script, &[reference.to_string()])
            .map_err(|e| {
                inspection_failed(
                    reference.to_string(),
                    format!("failed to run {}: {e}", self.script.display()),
                )
            })?;

        if !output.success {
            return Err(image_not_found(reference.to_string(), output.stderr_text()));
        }

        let digest = output.stdout_text();
        if digest.is_empty() {
            return Err(inspection_failed(
                reference.to_string(),
                "resolver script printed no digest",
            ));
        }
        let parsed = if digest.contains(':') {
            Digest::parse(&digest)
        } else {
            Digest::sha256(&digest)
        };
        parsed.map_err(|_| {
            inspection_failed(
                reference.to_string(),
                format!("resolver script printed an invalid digest '{digest}'"),
            )
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PinError;
    use crate::resolver::command::fake::{FakeRunner, failed, ok};

    fn inspector(runner: FakeRunner) -> (tempfile::NamedTempFile, ScriptInspector<FakeRunner>) {
        let script = tempfile::NamedTempFile::new().unwrap();
        let inspector = ScriptInspector::with_runner(script.path(), runner).unwrap();
        (script, inspector)
    }

    #[test]
    fn test_bare_hex_gets_sha256_prefix() {
        let (_script, inspector) = inspector(FakeRunner::with(vec![ok("abc123\n")]));
        let reference = ImageReference::parse("quay.io/ns/image:v1").unwrap();
        let digest = inspector.inspect(&reference).unwrap();
        assert_eq!(digest.to_string(), "sha256:abc123");
        assert_eq!(
            inspector.runner.calls()[0].1,
            vec!["quay.io/ns/image:v1".to_string()]
        );
    }

    #[test]
    fn test_prefixed_digest_is_kept() {
        let (_script, inspector) = inspector(FakeRunner::with(vec![ok("sha512:ff00")]));
        let reference = ImageReference::parse("quay.io/ns/image:v1").unwrap();
        assert_eq!(inspector.inspect(&reference).unwrap().to_string(), "sha512:ff00");
    }

    #[test]
    fn test_failure_is_image_not_found() {
        let (_script, inspector) = inspector(FakeRunner::with(vec![failed("no such tag")]));
        let reference = ImageReference::parse("quay.io/ns/image:nope").unwrap();
        let err = inspector.inspect(&reference).unwrap_err();
        assert!(matches!(err, PinError::ImageNotFound { .. }));
    }

    #[test]
    fn test_garbage_output_is_inspection_failed() {
        let (_script, inspector) = inspector(FakeRunner::with(vec![ok("not a digest!")]));
        let reference = ImageReference::parse("quay.io/ns/image:v1").unwrap();
        let err = inspector.inspect(&reference).unwrap_err();
        assert!(matches!(err, PinError::InspectionFailed { .. }));
    }

    #[test]
    fn test_missing_script_is_config_error() {
        let result = ScriptInspector::with_runner("/nonexistent/resolve.sh", FakeRunner::default());
        assert!(matches!(result, Err(PinError::ResolverConfig { .. })));
    }
}
