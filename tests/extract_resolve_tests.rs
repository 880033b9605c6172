//! Integration tests for `bundlepin pinning extract` and `pinning resolve`

mod common;

use common::*;
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn test_extract_to_stdout() {
    let bundle = TestBundle::new(&full_csv());

    let output = bundle
        .cmd()
        .args(["pinning", "extract", "manifests"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let references: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(references.len(), 8);
    assert!(references.contains(&"registry.example.com/test/init:latest".to_string()));
    assert!(references.contains(&format!(
        "quay.io/test/test-operator@sha256:{SHA_OPERATOR}"
    )));
    let mut sorted = references.clone();
    sorted.sort();
    assert_eq!(references, sorted);

    assert_eq!(bundle.csv(), full_csv());
}

#[test]
fn test_extract_to_file() {
    let bundle = TestBundle::new(&two_container_csv());

    bundle
        .cmd()
        .args(["pinning", "extract", "manifests", "-o", "images.json"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let references: Vec<String> = serde_json::from_str(&bundle.read("images.json")).unwrap();
    assert_eq!(
        references,
        vec![
            "quay.io/test/test-operator:v0.9.0".to_string(),
            format!("quay.io/test/test-operator@sha256:{SHA_OPERATOR}"),
        ]
    );
}

#[test]
fn test_extract_missing_csv() {
    let bundle = TestBundle::new("kind: Deployment\n");

    bundle
        .cmd()
        .args(["pinning", "extract", "manifests"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Missing ClusterServiceVersion in operator manifests",
        ));
}

#[test]
fn test_resolve_file() {
    let bundle = TestBundle::new(&two_container_csv());
    let script = bundle.resolver_script(&registry());
    bundle.write(
        "images.json",
        r#"["quay.io/test/test-operator:v0.9.0", "registry.example.com/test/init"]"#,
    );

    let output = bundle
        .pinning("resolve", &script)
        .arg("images.json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let mapping: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        mapping["quay.io/test/test-operator:v0.9.0"],
        format!("quay.io/test/test-operator@sha256:{SHA_OPERATOR}").as_str()
    );
    assert_eq!(
        mapping["registry.example.com/test/init:latest"],
        format!("registry.example.com/test/init@sha256:{SHA_INIT}").as_str()
    );
}

#[test]
fn test_resolve_stdin_to_file() {
    let bundle = TestBundle::new(&two_container_csv());
    let script = bundle.resolver_script(&registry());
    let digest = format!("quay.io/test/test-operator@sha256:{SHA_OPERATOR}");

    bundle
        .pinning("resolve", &script)
        .args(["-", "--output", "replacements.json"])
        .write_stdin(format!(r#"["{digest}", "quay.io/test/agent:v2"]"#))
        .assert()
        .success();

    let mapping: Value = serde_json::from_str(&bundle.read("replacements.json")).unwrap();
    assert_eq!(mapping[digest.as_str()], digest.as_str());
    assert_eq!(
        mapping["quay.io/test/agent:v2"],
        format!("quay.io/test/agent@sha256:{SHA_AGENT}").as_str()
    );
}

#[test]
fn test_resolve_unknown_image() {
    let bundle = TestBundle::new(&two_container_csv());
    let script = bundle.resolver_script(&[]);
    bundle.write("images.json", r#"["quay.io/test/missing:v1"]"#);

    bundle
        .pinning("resolve", &script)
        .arg("images.json")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: Failed to inspect docker://quay.io/test/missing:v1. Make sure it exists and is accessible.",
        ));
}

#[test]
fn test_resolve_rejects_non_list() {
    let bundle = TestBundle::new(&two_container_csv());
    let script = bundle.resolver_script(&registry());
    bundle.write("images.json", r#"{"a": "b"}"#);

    bundle
        .pinning("resolve", &script)
        .arg("images.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a JSON array of image references"));
}
