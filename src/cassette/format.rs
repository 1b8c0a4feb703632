//! Cassette data structures for recording and replaying interactions.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::ResourceReference;

/// Port name of resource store interactions.
pub const STORE_PORT: &str = "store";
/// Port name of discovery interactions.
pub const DISCOVERY_PORT: &str = "discovery";

/// A single recorded interaction with an external port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name (`store` or `discovery`).
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Input data sent to the port.
    pub input: serde_json::Value,
    /// Output data returned from the port.
    pub output: serde_json::Value,
}

/// Recorded input of a store call: the addressed instance and, for writes,
/// the document sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreCall {
    /// Instance the call addressed.
    pub reference: ResourceReference,
    /// Document sent with `create` and `update`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
}

impl StoreCall {
    /// Reads the store call back out of a recorded input; `None` for inputs
    /// that do not name a reference.
    #[must_use]
    pub fn from_input(input: &Value) -> Option<Self> {
        serde_json::from_value(input.clone()).ok()
    }
}

/// A cassette containing a sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// API server the interactions were recorded against.
    pub cluster: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Reads and parses a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid cassette.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }
}
