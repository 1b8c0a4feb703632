//! Resolves short type tokens (`KIND[.VERSION][.GROUP]`) against discovery.
//!
//! Lookup order:
//!
//! 1. The token as a fully qualified `resource.version.group`.
//! 2. The token as `resource[.group]` in any version.
//! 3. The token as a kind: first `Kind.version.group`, then `Kind[.group]`.
//!
//! Resource names match plural, singular and short names case-insensitively.
//! Kinds match exactly. When several entries match, the group's preferred
//! version wins.

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{ScopeKind, TypedResourceDescriptor};
use crate::ports::{ApiResourceEntry, DiscoveryClient, StoreError};

/// Failure to turn a token into a resource type.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nothing in discovery matched the token.
    #[error("the server doesn't have a resource type {0:?}")]
    ResourceTypeNotFound(String),
    /// The discovery endpoints could not be read.
    #[error("cannot discover server resource types")]
    Discovery(#[source] StoreError),
}

/// Discovery results, fetched once and kept for the life of the cache.
///
/// There is no invalidation: a type registered after the first lookup stays
/// invisible to this cache. A migration is a single short run, so that
/// staleness is accepted.
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    entries: OnceCell<Vec<ApiResourceEntry>>,
}

impl DiscoveryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache that is already filled.
    #[must_use]
    pub fn with_entries(entries: Vec<ApiResourceEntry>) -> Self {
        Self { entries: OnceCell::from(entries) }
    }

    /// Returns `true` once discovery has been fetched.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.entries.initialized()
    }

    /// Returns the cached entries, asking `client` on first use.
    ///
    /// # Errors
    ///
    /// Returns the discovery failure; a failed fetch is not cached.
    pub async fn entries(
        &self,
        client: &dyn DiscoveryClient,
    ) -> Result<&[ApiResourceEntry], StoreError> {
        let entries = self
            .entries
            .get_or_try_init(|| async {
                let entries = client.server_resources().await?;
                debug!(count = entries.len(), "discovery cache filled");
                Ok::<_, StoreError>(entries)
            })
            .await?;
        Ok(entries.as_slice())
    }
}

/// Maps type tokens to fully qualified resource types.
pub struct TypeResolver<'a> {
    discovery: &'a dyn DiscoveryClient,
    cache: &'a DiscoveryCache,
}

impl<'a> TypeResolver<'a> {
    /// Creates a resolver backed by `discovery` and memoized in `cache`.
    #[must_use]
    pub fn new(discovery: &'a dyn DiscoveryClient, cache: &'a DiscoveryCache) -> Self {
        Self { discovery, cache }
    }

    /// Resolves a `KIND[.VERSION][.GROUP]` token.
    ///
    /// Scope is reported, not enforced; callers that need a namespaced type
    /// must check [`TypedResourceDescriptor::is_namespaced`].
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ResourceTypeNotFound`] when no entry matches and
    /// [`ResolveError::Discovery`] when discovery itself fails.
    pub async fn resolve(&self, token: &str) -> Result<TypedResourceDescriptor, ResolveError> {
        let entries = self.cache.entries(self.discovery).await.map_err(ResolveError::Discovery)?;
        resolve_in(entries, token)
    }
}

/// Group/version/name triple split from a token; `name` is a resource or a kind.
#[derive(Debug, PartialEq, Eq)]
struct Parsed<'t> {
    name: &'t str,
    version: Option<&'t str>,
    group: &'t str,
}

/// Splits `name.version.group` when the token has at least two dots.
fn parse_fully_specified(token: &str) -> Option<Parsed<'_>> {
    let mut parts = token.splitn(3, '.');
    let name = parts.next()?;
    let version = parts.next()?;
    let group = parts.next()?;
    Some(Parsed { name, version: Some(version), group })
}

/// Splits `name[.group]` at the first dot.
fn parse_grouped(token: &str) -> Parsed<'_> {
    match token.split_once('.') {
        Some((name, group)) => Parsed { name, version: None, group },
        None => Parsed { name: token, version: None, group: "" },
    }
}

fn resolve_in(
    entries: &[ApiResourceEntry],
    token: &str,
) -> Result<TypedResourceDescriptor, ResolveError> {
    let grouped = parse_grouped(token);
    let fully = parse_fully_specified(token);

    let found = fully
        .as_ref()
        .and_then(|p| pick(entries, |e| matches_resource(e, p, true)))
        .or_else(|| pick(entries, |e| matches_resource(e, &grouped, false)))
        .or_else(|| fully.as_ref().and_then(|p| pick(entries, |e| matches_kind(e, p))))
        .or_else(|| pick(entries, |e| matches_kind(e, &grouped)));

    match found {
        Some(entry) => Ok(describe(entry)),
        None => Err(ResolveError::ResourceTypeNotFound(grouped.name.to_owned())),
    }
}

/// First preferred-version match, else the first match in discovery order.
fn pick<F>(entries: &[ApiResourceEntry], accept: F) -> Option<&ApiResourceEntry>
where
    F: Fn(&ApiResourceEntry) -> bool,
{
    let mut first = None;
    for entry in entries.iter().filter(|e| !e.plural.contains('/') && accept(e)) {
        if entry.preferred {
            return Some(entry);
        }
        first.get_or_insert(entry);
    }
    first
}

/// An empty group matches any group unless `exact_group` is set.
fn matches_resource(entry: &ApiResourceEntry, parsed: &Parsed<'_>, exact_group: bool) -> bool {
    let name = parsed.name.to_lowercase();
    let name_matches = entry.plural.eq_ignore_ascii_case(&name)
        || entry.singular.eq_ignore_ascii_case(&name)
        || (entry.singular.is_empty() && entry.kind.eq_ignore_ascii_case(&name))
        || entry.short_names.iter().any(|s| s.eq_ignore_ascii_case(&name));
    let group_matches =
        (!exact_group && parsed.group.is_empty()) || entry.group.eq_ignore_ascii_case(parsed.group);
    let version_matches = parsed.version.map_or(true, |v| entry.version == v);
    name_matches && group_matches && version_matches
}

fn matches_kind(entry: &ApiResourceEntry, parsed: &Parsed<'_>) -> bool {
    entry.kind == parsed.name
        && entry.group == parsed.group
        && parsed.version.map_or(true, |v| entry.version == v)
}

fn describe(entry: &ApiResourceEntry) -> TypedResourceDescriptor {
    TypedResourceDescriptor {
        group: entry.group.clone(),
        version: entry.version.clone(),
        kind: entry.kind.clone(),
        plural: entry.plural.clone(),
        scope: if entry.namespaced { ScopeKind::Namespaced } else { ScopeKind::Cluster },
    }
}
