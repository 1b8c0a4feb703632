//! Discovery port for server-advertised resource types.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use super::store::StoreError;

/// Boxed future returned by [`DiscoveryClient::server_resources`].
pub type DiscoveryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ApiResourceEntry>, StoreError>> + Send + 'a>>;

/// One resource type advertised by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResourceEntry {
    /// API group; empty for the core group.
    pub group: String,
    /// API version within the group.
    pub version: String,
    /// Kind name, e.g. `PostgreSQLInstance`.
    pub kind: String,
    /// Plural resource name, e.g. `postgresqlinstances`.
    pub plural: String,
    /// Singular resource name; may be empty on older servers.
    #[serde(default)]
    pub singular: String,
    /// Abbreviations accepted in place of the plural name.
    #[serde(default)]
    pub short_names: Vec<String>,
    /// Whether instances live inside a namespace.
    pub namespaced: bool,
    /// Whether `version` is the group's preferred version.
    #[serde(default)]
    pub preferred: bool,
}

/// Lists the resource types the server knows about.
pub trait DiscoveryClient: Send + Sync {
    /// Returns every resource type across all groups and versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the discovery endpoints cannot be reached.
    fn server_resources(&self) -> DiscoveryFuture<'_>;
}
