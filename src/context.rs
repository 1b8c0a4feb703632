//! Service context bundling the port trait objects.

use std::path::Path;

use crate::adapters::live::{LiveDiscovery, LiveResourceStore};
use crate::adapters::recording::{RecordingDiscovery, RecordingResourceStore};
use crate::adapters::replaying::{ReplayingDiscovery, ReplayingResourceStore};
use crate::cassette::config::CassetteConfig;
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::ports::{DiscoveryClient, DiscoveryFuture, ResourceStore, StoreFuture};
use crate::resource::ResourceReference;

/// Bundles the port trait objects a command needs.
///
/// Constructors wire up different adapter implementations (live, recording,
/// replaying, or caller-supplied).
pub struct ServiceContext {
    /// Reads and writes resources.
    pub store: Box<dyn ResourceStore>,
    /// Lists server-advertised resource types.
    pub discovery: Box<dyn DiscoveryClient>,
}

impl ServiceContext {
    /// Creates a live context against the cluster found by the standard
    /// kubeconfig / in-cluster inference.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable cluster configuration is found.
    pub async fn live() -> Result<Self, String> {
        let (client, _) = live_client().await?;
        Ok(Self {
            store: Box::new(LiveResourceStore::new(client.clone())),
            discovery: Box::new(LiveDiscovery::new(client)),
        })
    }

    /// Creates a live context whose interactions are recorded into a new
    /// session under `dir`.
    ///
    /// The returned session must be finished after the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if no cluster is reachable or the session directory
    /// cannot be created.
    pub async fn recording_at(dir: &Path) -> Result<(Self, RecordingSession), String> {
        let (client, cluster) = live_client().await?;
        let session = RecordingSession::new(dir, &cluster)?;
        let ctx = Self {
            store: Box::new(RecordingResourceStore::new(
                Box::new(LiveResourceStore::new(client.clone())),
                session.store.clone(),
            )),
            discovery: Box::new(RecordingDiscovery::new(
                Box::new(LiveDiscovery::new(client)),
                session.discovery.clone(),
            )),
        };
        Ok((ctx, session))
    }

    /// Creates a replaying context from a monolithic cassette file.
    ///
    /// Each port gets its own replayer from the same cassette so that
    /// per-port cursors are independent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = Cassette::load(path)?;
        Ok(Self {
            store: Box::new(ReplayingResourceStore::new(CassetteReplayer::new(&cassette))),
            discovery: Box::new(ReplayingDiscovery::new(CassetteReplayer::new(&cassette))),
        })
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette panic with a clear message when
    /// called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;
        Ok(Self {
            store: match replayers.store {
                Some(r) => Box::new(ReplayingResourceStore::new(r)),
                None => Box::new(PanickingResourceStore),
            },
            discovery: match replayers.discovery {
                Some(r) => Box::new(ReplayingDiscovery::new(r)),
                None => Box::new(PanickingDiscovery),
            },
        })
    }

    /// Wraps caller-supplied adapters.
    #[must_use]
    pub fn with_ports(store: Box<dyn ResourceStore>, discovery: Box<dyn DiscoveryClient>) -> Self {
        Self { store, discovery }
    }
}

/// Builds a client and returns it with the API server URL it talks to.
async fn live_client() -> Result<(kube::Client, String), String> {
    let config =
        kube::Config::infer().await.map_err(|e| format!("failed to get kubeconfig: {e}"))?;
    let cluster = config.cluster_url.to_string();
    let client = kube::Client::try_from(config)
        .map_err(|e| format!("failed to create kubernetes client: {e}"))?;
    Ok((client, cluster))
}

// --- Panicking adapters for unspecified ports ---

struct PanickingResourceStore;
impl ResourceStore for PanickingResourceStore {
    fn get<'a>(&'a self, _reference: &'a ResourceReference) -> StoreFuture<'a, serde_json::Value> {
        panic!("ResourceStore port not configured in CassetteConfig: no cassette loaded for store");
    }
    fn create<'a>(
        &'a self,
        _reference: &'a ResourceReference,
        _document: serde_json::Value,
    ) -> StoreFuture<'a, serde_json::Value> {
        panic!("ResourceStore port not configured in CassetteConfig: no cassette loaded for store");
    }
    fn update<'a>(
        &'a self,
        _reference: &'a ResourceReference,
        _document: serde_json::Value,
    ) -> StoreFuture<'a, serde_json::Value> {
        panic!("ResourceStore port not configured in CassetteConfig: no cassette loaded for store");
    }
    fn delete<'a>(&'a self, _reference: &'a ResourceReference) -> StoreFuture<'a, ()> {
        panic!("ResourceStore port not configured in CassetteConfig: no cassette loaded for store");
    }
}

struct PanickingDiscovery;
impl DiscoveryClient for PanickingDiscovery {
    fn server_resources(&self) -> DiscoveryFuture<'_> {
        panic!(
            "DiscoveryClient port not configured in CassetteConfig: \
             no cassette loaded for discovery"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Interaction;
    use chrono::Utc;
    use serde_json::json;

    fn write_cassette(path: &Path, interactions: Vec<Interaction>) {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            cluster: "https://kind:6443".into(),
            interactions,
        };
        std::fs::write(path, serde_yaml::to_string(&cassette).unwrap()).unwrap();
    }

    fn namespace_get() -> Interaction {
        Interaction {
            seq: 0,
            port: "store".into(),
            method: "get".into(),
            input: json!({}),
            output: json!({"Ok": {"kind": "Namespace", "metadata": {"name": "team-b"}}}),
        }
    }

    #[tokio::test]
    async fn replaying_context_from_monolithic_cassette() {
        let dir = std::env::temp_dir().join("claim_migrator_ctx_test_mono");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("full.cassette.yaml");
        write_cassette(
            &path,
            vec![
                namespace_get(),
                Interaction {
                    seq: 1,
                    port: "discovery".into(),
                    method: "server_resources".into(),
                    input: json!({}),
                    output: json!({"Ok": []}),
                },
            ],
        );

        let ctx = ServiceContext::replaying(&path).unwrap();
        let ns = ctx.store.get(&ResourceReference::namespace_object("team-b")).await.unwrap();
        assert_eq!(ns["metadata"]["name"], "team-b");
        assert!(ctx.discovery.server_resources().await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn replaying_from_per_port_cassettes() {
        let dir = std::env::temp_dir().join("claim_migrator_ctx_test_ports");
        std::fs::create_dir_all(&dir).unwrap();
        let store_path = dir.join("store.cassette.yaml");
        write_cassette(&store_path, vec![namespace_get()]);

        let config = CassetteConfig { store: Some(store_path), ..CassetteConfig::default() };
        let ctx = ServiceContext::replaying_from(&config).unwrap();
        assert!(ctx.store.get(&ResourceReference::namespace_object("team-b")).await.is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[should_panic(expected = "not configured in CassetteConfig")]
    fn unspecified_port_panics_with_clear_message() {
        let config = CassetteConfig::panic_on_unspecified();
        let ctx = ServiceContext::replaying_from(&config).unwrap();
        let _ = ctx.discovery.server_resources();
    }
}
