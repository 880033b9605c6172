//! Common test utilities for bundlepin integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub const SHA_OPERATOR: &str = "4b94fbb7acec63ab573ef00ebab577c21f2243e50b1b620f7330a49a393960ef";
pub const SHA_INIT: &str = "1111111111111111111111111111111111111111111111111111111111111111";
pub const SHA_AGENT: &str = "2222222222222222222222222222222222222222222222222222222222222222";
pub const SHA_V07: &str = "7777777777777777777777777777777777777777777777777777777777777777";
pub const SHA_V06: &str = "6666666666666666666666666666666666666666666666666666666666666666";
pub const SHA_V05: &str = "5555555555555555555555555555555555555555555555555555555555555555";
pub const SHA_EXAMPLE: &str = "4444444444444444444444444444444444444444444444444444444444444444";

/// Two containers sharing one image, once by tag and once by digest
pub fn two_container_csv() -> String {
    format!(
        "\
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: test-operator.v0.9.0
spec:
  install:
    strategy: deployment
    spec:
      deployments:
      - name: test-operator
        spec:
          template:
            spec:
              containers:
              - name: test-operator
                image: quay.io/test/test-operator:v0.9.0
              - name: test-restore-operator
                image: quay.io/test/test-operator@sha256:{SHA_OPERATOR}
"
    )
}

/// A bundle touching every kind of reference location
pub fn full_csv() -> String {
    format!(
        "\
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: test-operator.v0.9.0
  annotations:
    containerImage: quay.io/test/test-operator:v0.7.0
    description: Upgrades from quay.io/test/test-operator:v0.6.0 or quay.io/test/test-operator:v0.5.0.
spec:
  # Owned APIs
  customresourcedefinitions:
    owned:
    - name: backups.test.example.com
      kind: Backup
      metadata:
        annotations:
          example: quay.io/test/backup-example:v0.4.0
  install:
    strategy: deployment
    spec:
      deployments:
      - name: test-operator
        spec:
          template:
            spec:
              initContainers:
              - name: init-db
                image: registry.example.com/test/init
              containers:
              - name: test-operator
                image: quay.io/test/test-operator:v0.9.0 # release tag
                env:
                - name: RELATED_IMAGE_TEST_AGENT
                  value: quay.io/test/agent:v2
              - name: test-restore-operator
                image: quay.io/test/test-operator@sha256:{SHA_OPERATOR}
"
    )
}

/// Registry answers for every reference of [`full_csv`]
pub fn registry() -> Vec<(&'static str, &'static str)> {
    vec![
        ("quay.io/test/test-operator:v0.9.0", SHA_OPERATOR),
        ("quay.io/test/test-operator:v0.7.0", SHA_V07),
        ("quay.io/test/test-operator:v0.6.0", SHA_V06),
        ("quay.io/test/test-operator:v0.5.0", SHA_V05),
        ("quay.io/test/backup-example:v0.4.0", SHA_EXAMPLE),
        ("registry.example.com/test/init:latest", SHA_INIT),
        ("quay.io/test/agent:v2", SHA_AGENT),
    ]
}

/// A scratch directory holding a bundle, a resolver script and the outputs
pub struct TestBundle {
    pub temp: TempDir,
    pub manifests: PathBuf,
}

impl TestBundle {
    /// Create a bundle whose manifest directory holds `csv.yaml`
    pub fn new(csv: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let manifests = temp.path().join("manifests");
        std::fs::create_dir_all(&manifests).expect("Failed to create manifests directory");
        std::fs::write(manifests.join("csv.yaml"), csv).expect("Failed to write CSV");
        Self { temp, manifests }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write another file into the manifest directory
    pub fn write_manifest(&self, name: &str, content: &str) {
        std::fs::write(self.manifests.join(name), content).expect("Failed to write manifest");
    }

    pub fn csv(&self) -> String {
        self.read("manifests/csv.yaml")
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    pub fn write(&self, path: &str, content: &str) {
        std::fs::write(self.path().join(path), content).expect("Failed to write file");
    }

    pub fn file_len(&self, path: &str) -> u64 {
        std::fs::metadata(self.path().join(path))
            .expect("Failed to stat file")
            .len()
    }

    /// Write a resolver script answering from `entries`
    ///
    /// Unknown references fail the way a registry reports a missing manifest.
    pub fn resolver_script(&self, entries: &[(&str, &str)]) -> PathBuf {
        let mut script = String::from("#!/bin/sh\ncase \"$1\" in\n");
        for (reference, hex) in entries {
            script.push_str(&format!("  '{reference}') echo {hex} ;;\n"));
        }
        script.push_str("  *) echo \"manifest unknown: $1\" >&2; exit 1 ;;\nesac\n");

        let path = self.path().join("resolve.sh");
        std::fs::write(&path, script).expect("Failed to write resolver script");
        make_executable(&path);
        path
    }

    /// `bundlepin` running inside the scratch directory with a clean environment
    pub fn cmd(&self) -> Command {
        let mut cmd = bundlepin_cmd();
        cmd.current_dir(self.path())
            .env_remove("BUNDLEPIN_RESOLVER")
            .env_remove("BUNDLEPIN_RESOLVER_PATH")
            .env_remove("BUNDLEPIN_AUTHFILE")
            .env_remove("BUNDLEPIN_CONCURRENCY")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `bundlepin pinning <subcommand>` with the script resolver selected
    pub fn pinning(&self, subcommand: &str, script: &Path) -> Command {
        let mut cmd = self.cmd();
        cmd.args(["pinning", subcommand])
            .env("BUNDLEPIN_RESOLVER", "script")
            .env("BUNDLEPIN_RESOLVER_PATH", script);
        cmd
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make script executable");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

// Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
#[allow(deprecated)]
pub fn bundlepin_cmd() -> Command {
    Command::cargo_bin("bundlepin").unwrap()
}
