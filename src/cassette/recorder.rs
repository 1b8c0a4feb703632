//! Records store and discovery calls into a cassette file.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::format::{Cassette, Interaction, StoreCall, DISCOVERY_PORT, STORE_PORT};
use crate::ports::{ApiResourceEntry, StoreError};
use crate::resource::ResourceReference;

/// Accumulates interactions against one cluster and writes them as YAML.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    cluster: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Creates a recorder writing to `path`, stamped with the API server URL.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            cluster: cluster.into(),
            interactions: Vec::new(),
        }
    }

    /// Appends a raw interaction; `seq` follows recording order.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: Value,
        output: Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Records a store call with the reference it addressed, so a replay can
    /// tell when it drifts out of sequence.
    pub fn record_store_call<T: Serialize>(
        &mut self,
        method: &str,
        reference: &ResourceReference,
        document: Option<&Value>,
        result: &Result<T, StoreError>,
    ) {
        let call = StoreCall { reference: reference.clone(), document: document.cloned() };
        let input = serde_json::to_value(call).expect("store call serializes");
        self.record(STORE_PORT, method, input, outcome(result));
    }

    /// Records one discovery round-trip.
    pub fn record_discovery(&mut self, result: &Result<Vec<ApiResourceEntry>, StoreError>) {
        self.record(DISCOVERY_PORT, "server_resources", json!({}), outcome(result));
    }

    /// Writes the cassette to disk and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, std::io::Error> {
        let cassette = Cassette {
            name: self.name,
            recorded_at: Utc::now(),
            cluster: self.cluster,
            interactions: self.interactions,
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, yaml)?;
        Ok(self.path)
    }
}

/// `{"Ok": v}` or `{"Err": e}`; errors keep their reason so "not found" and
/// "conflict" replay as such.
fn outcome<T: Serialize>(result: &Result<T, StoreError>) -> Value {
    match result {
        Ok(value) => json!({ "Ok": serde_json::to_value(value).expect("store result serializes") }),
        Err(err) => json!({ "Err": serde_json::to_value(err).expect("store error serializes") }),
    }
}
