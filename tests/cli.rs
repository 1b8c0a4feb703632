//! Integration tests for top-level CLI behavior.
//!
//! The binary runs against replay cassettes, so no cluster is needed.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{json, Value};

use claim_migrator::cassette::recorder::CassetteRecorder;

fn run_claim(args: &[&str], cassette: Option<&Path>) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_claim");
    let mut command = Command::new(bin);
    command.args(args).env_remove("CLAIM_MIGRATOR_RECORD").env_remove("RUST_LOG");
    match cassette {
        Some(path) => command.env("CLAIM_MIGRATOR_REPLAY", path),
        None => command.env_remove("CLAIM_MIGRATOR_REPLAY"),
    };
    command.output().expect("failed to run claim binary")
}

fn claim_document(namespace: &str) -> Value {
    json!({
        "apiVersion": "storage.example.org/v1",
        "kind": "Bucket",
        "metadata": {"name": "assets", "namespace": namespace, "resourceVersion": "4"},
        "spec": {
            "resourceRef": {
                "apiVersion": "storage.example.org/v1",
                "kind": "XBucket",
                "name": "assets-9qz4d"
            }
        }
    })
}

fn discovery_catalog() -> Value {
    json!({"Ok": [{
        "group": "storage.example.org",
        "version": "v1",
        "kind": "Bucket",
        "plural": "buckets",
        "singular": "bucket",
        "namespaced": true,
        "preferred": true
    }]})
}

fn not_found() -> Value {
    json!({"Err": {"reason": "not_found", "message": "not found"}})
}

/// Recorded input naming the instance a store call addressed.
fn at(kind: &str, api_version: &str, name: &str, namespace: &str) -> Value {
    json!({"reference": {
        "kind": kind,
        "apiVersion": api_version,
        "name": name,
        "namespace": namespace
    }})
}

fn bucket_in(namespace: &str) -> Value {
    at("Bucket", "storage.example.org/v1", "assets", namespace)
}

/// Writes a cassette with the given `(port, method, input, output)` interactions.
fn cassette(test: &str, interactions: &[(&str, &str, Value, Value)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("claim_migrator_cli_{test}"));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run.cassette.yaml");
    let mut recorder = CassetteRecorder::new(&path, test, "https://kind:6443");
    for (port, method, input, output) in interactions {
        recorder.record(*port, *method, input.clone(), output.clone());
    }
    recorder.finish().unwrap()
}

fn cleanup(path: &Path) {
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn help_lists_migrate_subcommand() {
    let output = run_claim(&["--help"], None);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("migrate"));
    assert!(stdout.contains("--debug"));
}

#[test]
fn migrate_requires_destination_namespace() {
    let output = run_claim(&["migrate", "bucket/assets"], None);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("--dest-namespace"));
}

#[test]
fn replayed_migration_succeeds() {
    let namespace = json!({"Ok": {
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {"name": "team-b"}
    }});
    let composite = json!({"Ok": {
        "apiVersion": "storage.example.org/v1",
        "kind": "XBucket",
        "metadata": {"name": "assets-9qz4d", "resourceVersion": "7"},
        "spec": {"claimRef": {"name": "assets", "namespace": "team-a"}}
    }});
    let composite_ref = at("XBucket", "storage.example.org/v1", "assets-9qz4d", "");
    let source = json!({"Ok": claim_document("team-a")});
    let path = cassette(
        "success",
        &[
            ("store", "get", at("Namespace", "v1", "team-b", ""), namespace),
            ("discovery", "server_resources", json!({}), discovery_catalog()),
            ("store", "get", bucket_in("team-a"), source.clone()),
            ("store", "get", bucket_in("team-b"), not_found()),
            ("store", "create", bucket_in("team-b"), json!({"Ok": claim_document("team-b")})),
            ("store", "get", composite_ref.clone(), composite.clone()),
            ("store", "update", composite_ref, composite),
            ("store", "get", bucket_in("team-a"), source.clone()),
            ("store", "update", bucket_in("team-a"), source.clone()),
            ("store", "get", bucket_in("team-a"), source),
            ("store", "delete", bucket_in("team-a"), json!({"Ok": null})),
        ],
    );

    let output = run_claim(
        &["migrate", "bucket/assets", "-n", "team-a", "--dest-namespace", "team-b"],
        Some(&path),
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("to namespace team-b"));
    assert!(stdout.contains("assets-9qz4d"));

    cleanup(&path);
}

#[test]
fn replay_that_addresses_another_claim_fails() {
    let path = cassette(
        "diverged",
        &[
            ("store", "get", at("Namespace", "v1", "team-b", ""), json!({"Ok": {}})),
            ("discovery", "server_resources", json!({}), discovery_catalog()),
            ("store", "get", bucket_in("team-c"), json!({"Ok": claim_document("team-c")})),
        ],
    );

    let output = run_claim(
        &["migrate", "bucket/assets", "-n", "team-a", "--dest-namespace", "team-b"],
        Some(&path),
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("Cassette out of sequence"), "stderr: {stderr}");

    cleanup(&path);
}

#[test]
fn missing_destination_namespace_fails_with_message() {
    let path = cassette("missing_ns", &[("store", "get", json!({}), not_found())]);

    let output =
        run_claim(&["migrate", "bucket/assets", "--dest-namespace", "team-b"], Some(&path));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("migration aborted while validating destination"));
    assert!(stderr.contains("namespace team-b does not exist"));
    assert!(stderr.contains("no changes were made"));

    cleanup(&path);
}

#[test]
fn missing_name_is_reported_after_namespace_check() {
    let namespace = json!({"Ok": {
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {"name": "team-b"}
    }});
    let path = cassette("missing_name", &[("store", "get", json!({}), namespace)]);

    let output = run_claim(&["migrate", "bucket", "--dest-namespace", "team-b"], Some(&path));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("missing name"));

    cleanup(&path);
}

#[test]
fn debug_flag_enables_step_logging() {
    let path = cassette("debug", &[("store", "get", json!({}), not_found())]);

    let output =
        run_claim(&["-d", "migrate", "bucket/assets", "--dest-namespace", "team-b"], Some(&path));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("DEBUG"));
    assert!(stderr.contains("validating destination"));

    cleanup(&path);
}
