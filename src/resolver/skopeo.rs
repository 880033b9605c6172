//! Registry inspection through `skopeo`

use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};

use super::RegistryInspector;
use super::command::{CommandOutput, CommandRunner, SystemRunner};
use crate::error::registry::{config, image_not_found, inspection_failed};
use crate::error::Result;
use crate::reference::{Digest, ImageReference};

const COMMAND_TIMEOUT: &str = "300s";
const ATTEMPTS: u32 = 3;
const NOT_FOUND_MARKERS: &[&str] = &["manifest unknown", "not found", "name unknown"];

/// Learns digests by running `skopeo inspect`
pub struct SkopeoInspector<R = SystemRunner> {
    program: PathBuf,
    authfile: Option<PathBuf>,
    runner: R,
}

impl SkopeoInspector<SystemRunner> {
    /// Inspector running `program` (usually `skopeo` from `PATH`)
    pub fn new(program: impl Into<PathBuf>, authfile: Option<PathBuf>) -> Result<Self> {
        Self::with_runner(program, authfile, SystemRunner)
    }
}

impl<R: CommandRunner> SkopeoInspector<R> {
    pub fn with_runner(
        program: impl Into<PathBuf>,
        authfile: Option<PathBuf>,
        runner: R,
    ) -> Result<Self> {
        if let Some(path) = &authfile {
            if !path.is_file() {
                return Err(config(format!(
                    "authfile {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(Self {
            program: program.into(),
            authfile,
            runner,
        })
    }

    fn args(&self, reference: &ImageReference, raw: bool) -> Vec<String> {
        let mut args = vec![
            "--command-timeout".to_string(),
            COMMAND_TIMEOUT.to_string(),
            "inspect".to_string(),
        ];
        if raw {
            args.push("--raw".to_string());
        }
        args.push(format!("docker://{reference}"));
        if let Some(authfile) = &self.authfile {
            args.push("--authfile".to_string());
            args.push(authfile.display().to_string());
        }
        args
    }

    /// Run one `skopeo inspect`, retrying failed runs
    fn inspect_with_retry(&self, reference: &ImageReference, raw: bool) -> Result<CommandOutput> {
        let args = self.args(reference, raw);
        let mut last_error = String::new();
        for attempt in 1..=ATTEMPTS {
            match self.runner.run(&self.program, &args) {
                Ok(output) if output.success => return Ok(output),
                Ok(output) => last_error = output.stderr_text(),
                Err(e) => last_error = format!("failed to run {}: {e}", self.program.display()),
            }
            tracing::debug!(
                "skopeo inspect of {} failed (attempt {}/{}): {}",
                reference,
                attempt,
                ATTEMPTS,
                last_error
            );
        }

        let lowered = last_error.to_lowercase();
        if NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
            Err(image_not_found(reference.to_string(), last_error))
        } else {
            Err(inspection_failed(reference.to_string(), last_error))
        }
    }
}

impl<R: CommandRunner> RegistryInspector for SkopeoInspector<R> {
    fn inspect(&self, reference: &ImageReference) -> Result<Digest> {
        let raw = self.inspect_with_retry(reference, true)?;
        let manifest: serde_json::Value = serde_json::from_slice(&raw.stdout).map_err(|e| {
            inspection_failed(reference.to_string(), format!("invalid manifest JSON: {e}"))
        })?;

        if manifest.get("schemaVersion").and_then(serde_json::Value::as_u64) == Some(2) {
            return Digest::sha256(&hex::encode(Sha256::digest(&raw.stdout)));
        }

        // Schema 1 manifests are signed, so the registry digest differs from the raw bytes
        let details = self.inspect_with_retry(reference, false)?;
        let details: serde_json::Value = serde_json::from_slice(&details.stdout).map_err(|e| {
            inspection_failed(reference.to_string(), format!("invalid inspect JSON: {e}"))
        })?;
        let digest = details
            .get("Digest")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| inspection_failed(reference.to_string(), "Digest not in response"))?;
        Digest::parse(digest)
    }
}

/// Default program name when no path is configured
pub fn default_program() -> &'static Path {
    Path::new("skopeo")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PinError;
    use crate::resolver::command::fake::{FakeRunner, failed, ok};

    const MANIFEST_V2: &str = r#"{"schemaVersion": 2, "mediaType": "application/vnd.docker.distribution.manifest.v2+json"}"#;

    fn reference() -> ImageReference {
        ImageReference::parse("quay.io/ns/image:v1").unwrap()
    }

    #[test]
    fn test_schema_v2_digest_is_sha256_of_raw_manifest() {
        let runner = FakeRunner::with(vec![ok(MANIFEST_V2)]);
        let inspector = SkopeoInspector::with_runner("skopeo", None, runner).unwrap();

        let digest = inspector.inspect(&reference()).unwrap();
        let expected = hex::encode(Sha256::digest(MANIFEST_V2.trim().as_bytes()));
        assert_eq!(digest.to_string(), format!("sha256:{expected}"));

        let calls = inspector.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].1,
            vec![
                "--command-timeout",
                "300s",
                "inspect",
                "--raw",
                "docker://quay.io/ns/image:v1"
            ]
        );
    }

    #[test]
    fn test_schema_v1_uses_reported_digest() {
        let digest = "sha256:4b94fbb7acec63ab573ef00ebab577c21f2243e50b1b620f7330a49a393960ef";
        let runner = FakeRunner::with(vec![
            ok(r#"{"schemaVersion": 1}"#),
            ok(&format!(r#"{{"Name": "quay.io/ns/image", "Digest": "{digest}"}}"#)),
        ]);
        let inspector = SkopeoInspector::with_runner("skopeo", None, runner).unwrap();

        assert_eq!(inspector.inspect(&reference()).unwrap().to_string(), digest);
        let calls = inspector.runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(!calls[1].1.contains(&"--raw".to_string()));
    }

    #[test]
    fn test_retries_then_succeeds() {
        let runner = FakeRunner::with(vec![failed("timeout"), failed("timeout"), ok(MANIFEST_V2)]);
        let inspector = SkopeoInspector::with_runner("skopeo", None, runner).unwrap();
        assert!(inspector.inspect(&reference()).is_ok());
        assert_eq!(inspector.runner.calls().len(), 3);
    }

    #[test]
    fn test_manifest_unknown_is_image_not_found() {
        let runner = FakeRunner::with(vec![
            failed("manifest unknown"),
            failed("manifest unknown"),
            failed("manifest unknown: manifest unknown"),
        ]);
        let inspector = SkopeoInspector::with_runner("skopeo", None, runner).unwrap();
        let err = inspector.inspect(&reference()).unwrap_err();
        assert!(matches!(err, PinError::ImageNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to inspect docker://quay.io/ns/image:v1. Make sure it exists and is accessible."
        );
    }

    #[test]
    fn test_other_failures_are_inspection_failed() {
        let runner = FakeRunner::with(vec![
            failed("connection refused"),
            failed("connection refused"),
            failed("connection refused"),
        ]);
        let inspector = SkopeoInspector::with_runner("skopeo", None, runner).unwrap();
        let err = inspector.inspect(&reference()).unwrap_err();
        assert!(matches!(err, PinError::InspectionFailed { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_authfile_is_passed() {
        let authfile = tempfile::NamedTempFile::new().unwrap();
        let runner = FakeRunner::with(vec![ok(MANIFEST_V2)]);
        let inspector =
            SkopeoInspector::with_runner("skopeo", Some(authfile.path().to_path_buf()), runner)
                .unwrap();
        inspector.inspect(&reference()).unwrap();
        let args = &inspector.runner.calls()[0].1;
        assert_eq!(args[args.len() - 2], "--authfile");
        assert_eq!(args[args.len() - 1], authfile.path().display().to_string());
    }

    #[test]
    fn test_missing_authfile_is_config_error() {
        let result = SkopeoInspector::with_runner(
            "skopeo",
            Some(PathBuf::from("/nonexistent/auth.json")),
            FakeRunner::default(),
        );
        assert!(matches!(result, Err(PinError::ResolverConfig { .. })));
    }
}
