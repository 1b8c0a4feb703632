//! Record-replay round trip.
//!
//! 1. Run a migration against the in-memory store through recording adapters.
//! 2. Replay the session's per-port cassettes with `ServiceContext::replaying_from`.
//! 3. Assert the replayed run reports the same outcome, twice.

use std::path::{Path, PathBuf};

use serde_json::json;

use claim_migrator::adapters::memory::{InMemoryStore, StaticDiscovery};
use claim_migrator::adapters::recording::{RecordingDiscovery, RecordingResourceStore};
use claim_migrator::cassette::config::CassetteConfig;
use claim_migrator::cassette::format::Cassette;
use claim_migrator::cassette::session::RecordingSession;
use claim_migrator::context::ServiceContext;
use claim_migrator::migrate::{MigrationReport, MigrationRequest, Migrator};
use claim_migrator::ports::{ApiResourceEntry, ResourceStore};
use claim_migrator::resource::{Backoff, DiscoveryCache, Gateway, ResourceReference, TypeResolver};

fn bucket(namespace: &str) -> ResourceReference {
    ResourceReference::new("Bucket", "storage.example.org/v1", "assets", namespace)
}

fn composite() -> ResourceReference {
    ResourceReference::new("XBucket", "storage.example.org/v1", "assets-9qz4d", "")
}

fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert(&ResourceReference::namespace_object("team-b"), json!({}));
    store.insert(
        &bucket("team-a"),
        json!({
            "metadata": {"finalizers": ["finalizer.apiextensions.crossplane.io"]},
            "spec": {
                "region": "eu-west-1",
                "resourceRef": {
                    "apiVersion": "storage.example.org/v1",
                    "kind": "XBucket",
                    "name": "assets-9qz4d"
                }
            }
        }),
    );
    store.insert(&composite(), json!({"spec": {"claimRef": {"namespace": "team-a"}}}));
    store
}

fn discovery() -> StaticDiscovery {
    StaticDiscovery::new(vec![ApiResourceEntry {
        group: "storage.example.org".into(),
        version: "v1".into(),
        kind: "Bucket".into(),
        plural: "buckets".into(),
        singular: "bucket".into(),
        short_names: Vec::new(),
        namespaced: true,
        preferred: true,
    }])
}

fn request() -> MigrationRequest {
    MigrationRequest {
        claim: "bucket.storage.example.org".into(),
        name: Some("assets".into()),
        source_namespace: "team-a".into(),
        destination_namespace: "team-b".into(),
    }
}

async fn migrate(ctx: &ServiceContext) -> MigrationReport {
    let cache = DiscoveryCache::new();
    Migrator::new(
        Gateway::new(ctx.store.as_ref()),
        TypeResolver::new(ctx.discovery.as_ref(), &cache),
        Backoff::default(),
    )
    .run(&request())
    .await
    .expect("migration should succeed")
}

async fn record(base: &Path) -> (MigrationReport, PathBuf) {
    let session = RecordingSession::new(base, "in-memory").unwrap();
    let ctx = ServiceContext::with_ports(
        Box::new(RecordingResourceStore::new(Box::new(seeded_store()), session.store.clone())),
        Box::new(RecordingDiscovery::new(Box::new(discovery()), session.discovery.clone())),
    );
    let report = migrate(&ctx).await;
    drop(ctx);
    (report, session.finish().unwrap())
}

#[tokio::test]
async fn record_then_replay_produces_identical_outcomes() {
    let base = std::env::temp_dir().join("claim_migrator_record_replay_test");
    let _ = std::fs::remove_dir_all(&base);

    let (recorded, dir) = record(&base).await;
    assert_eq!(recorded.destination, bucket("team-b"));
    assert_eq!(recorded.composite, Some(composite()));

    let config = CassetteConfig::from_session_dir(&dir);
    assert!(config.store.is_some() && config.discovery.is_some());

    let first = migrate(&ServiceContext::replaying_from(&config).unwrap()).await;
    assert_eq!(first, recorded);

    let second = migrate(&ServiceContext::replaying_from(&config).unwrap()).await;
    assert_eq!(second, first);

    let _ = std::fs::remove_dir_all(&base);
}

#[tokio::test]
async fn recorded_store_cassette_keeps_not_found_results() {
    let base = std::env::temp_dir().join("claim_migrator_record_not_found_test");
    let _ = std::fs::remove_dir_all(&base);

    let (_, dir) = record(&base).await;
    let cassette = Cassette::load(&dir.join("store.cassette.yaml")).unwrap();

    let destination_check = cassette
        .interactions
        .iter()
        .find(|i| i.method == "get" && i.input["reference"]["namespace"] == "team-b"
            && i.input["reference"]["kind"] == "Bucket")
        .expect("destination lookup should be recorded");
    assert_eq!(destination_check.output["Err"]["reason"], "not_found");

    let methods: Vec<&str> = cassette.interactions.iter().map(|i| i.method.as_str()).collect();
    assert_eq!(methods.iter().filter(|m| **m == "create").count(), 1);
    assert_eq!(methods.iter().filter(|m| **m == "update").count(), 2);
    assert_eq!(methods.last(), Some(&"delete"));

    let _ = std::fs::remove_dir_all(&base);
}

#[tokio::test]
async fn replaying_a_store_cassette_serves_recorded_documents() {
    let base = std::env::temp_dir().join("claim_migrator_replay_documents_test");
    let _ = std::fs::remove_dir_all(&base);

    let (_, dir) = record(&base).await;
    let ctx = ServiceContext::replaying_from(&CassetteConfig::from_session_dir(&dir)).unwrap();

    let namespace = ctx.store.get(&ResourceReference::namespace_object("team-b")).await.unwrap();
    assert_eq!(namespace["metadata"]["name"], "team-b");
    let source = ctx.store.get(&bucket("team-a")).await.unwrap();
    assert_eq!(source["spec"]["region"], "eu-west-1");

    let _ = std::fs::remove_dir_all(&base);
}
