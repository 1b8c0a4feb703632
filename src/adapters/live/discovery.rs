//! Live adapter for the `DiscoveryClient` port using the API server's
//! discovery endpoints.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::Client;
use tracing::warn;

use super::store_error;
use crate::ports::{ApiResourceEntry, DiscoveryClient, DiscoveryFuture};

/// Live discovery backed by `/api` and `/apis`.
pub struct LiveDiscovery {
    client: Client,
}

impl LiveDiscovery {
    /// Creates a discovery client on top of an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl DiscoveryClient for LiveDiscovery {
    fn server_resources(&self) -> DiscoveryFuture<'_> {
        Box::pin(async move {
            let mut entries = Vec::new();

            let core = self.client.list_core_api_versions().await.map_err(store_error)?;
            for (index, version) in core.versions.iter().enumerate() {
                let list =
                    self.client.list_core_api_resources(version).await.map_err(store_error)?;
                entries.extend(entries_from(&list, "", version, index == 0));
            }

            let groups = self.client.list_api_groups().await.map_err(store_error)?;
            for group in &groups.groups {
                let preferred = group.preferred_version.as_ref().map(|p| p.version.as_str());
                for version in &group.versions {
                    // An unavailable aggregated API must not hide every other group.
                    match self.client.list_api_group_resources(&version.group_version).await {
                        Ok(list) => entries.extend(entries_from(
                            &list,
                            &group.name,
                            &version.version,
                            preferred == Some(version.version.as_str()),
                        )),
                        Err(err) => {
                            warn!(
                                group_version = %version.group_version,
                                error = %err,
                                "skipping undiscoverable group version"
                            );
                        }
                    }
                }
            }

            Ok(entries)
        })
    }
}

fn entries_from<'a>(
    list: &'a APIResourceList,
    group: &'a str,
    version: &'a str,
    preferred: bool,
) -> impl Iterator<Item = ApiResourceEntry> + 'a {
    list.resources.iter().filter(|r| !r.name.contains('/')).map(move |r| ApiResourceEntry {
        group: group.to_owned(),
        version: version.to_owned(),
        kind: r.kind.clone(),
        plural: r.name.clone(),
        singular: r.singular_name.clone(),
        short_names: r.short_names.clone().unwrap_or_default(),
        namespaced: r.namespaced,
        preferred,
    })
}
