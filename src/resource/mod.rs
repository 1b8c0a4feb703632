//! Resource addressing, type resolution and conflict-safe mutation.
//!
//! Everything in here talks to the control plane only through the port
//! traits in `crate::ports`.

pub mod claim;
pub mod gateway;
pub mod resolver;
pub mod retry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use gateway::{Gateway, GatewayError, Lookup, Verb};
pub use resolver::{DiscoveryCache, ResolveError, TypeResolver};
pub use retry::{
    compare_and_swap, mutate_with_retry, retry_on_conflict, Backoff, ConflictAware, RetryError,
};

/// Addresses one instance of a typed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    /// Kind of the resource, e.g. `Namespace`.
    pub kind: String,
    /// `group/version`, or just `version` for the core group.
    pub api_version: String,
    /// Instance name.
    pub name: String,
    /// Owning namespace; empty for cluster-scoped resources.
    #[serde(default)]
    pub namespace: String,
}

impl ResourceReference {
    /// Builds a reference from its four parts.
    pub fn new(
        kind: impl Into<String>,
        api_version: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            api_version: api_version.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Reference to a core `Namespace` object.
    pub fn namespace_object(name: impl Into<String>) -> Self {
        Self::new("Namespace", "v1", name, "")
    }

    /// Same type and name, in another namespace.
    #[must_use]
    pub fn in_namespace(&self, namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), ..self.clone() }
    }

    /// API group; empty for the core group.
    #[must_use]
    pub fn group(&self) -> &str {
        split_api_version(&self.api_version).0
    }

    /// API version within the group.
    #[must_use]
    pub fn version(&self) -> &str {
        split_api_version(&self.api_version).1
    }

    /// Plural endpoint name, derived by lowercasing the kind and appending `s`.
    #[must_use]
    pub fn plural(&self) -> String {
        format!("{}s", self.kind.to_lowercase())
    }

    /// Returns `true` when the reference addresses a cluster-scoped resource.
    #[must_use]
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}.{}/{}", self.kind, self.api_version, self.name)
        } else {
            write!(
                f,
                "{}.{}/{} in namespace {}",
                self.kind, self.api_version, self.name, self.namespace
            )
        }
    }
}

/// Splits `group/version` into its parts; a bare version has an empty group.
fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.rsplit_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Whether a resource type lives inside a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Instances belong to a namespace.
    Namespaced,
    /// Instances are global to the cluster.
    Cluster,
}

/// Fully qualified resource type as resolved from discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedResourceDescriptor {
    /// API group; empty for the core group.
    pub group: String,
    /// API version within the group.
    pub version: String,
    /// Kind name.
    pub kind: String,
    /// Plural resource name as advertised by the server. Store requests use
    /// [`ResourceReference::plural`]; this is kept to flag types where the two differ.
    pub plural: String,
    /// Namespace scope of the type.
    pub scope: ScopeKind,
}

impl TypedResourceDescriptor {
    /// `group/version`, or just `version` for the core group.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Reference to a named instance of this type.
    pub fn reference(
        &self,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> ResourceReference {
        ResourceReference::new(self.kind.clone(), self.api_version(), name, namespace)
    }

    /// Returns `true` when the server's plural is not the lowercased kind
    /// plus `s`, so store endpoints derived from the kind will miss the type.
    #[must_use]
    pub fn has_irregular_plural(&self) -> bool {
        self.plural != self.reference("", "").plural()
    }

    /// Returns `true` for namespaced types.
    #[must_use]
    pub fn is_namespaced(&self) -> bool {
        self.scope == ScopeKind::Namespaced
    }
}
