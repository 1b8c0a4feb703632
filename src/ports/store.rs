//! Resource store port for typed-but-opaque documents on the control plane.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::resource::ResourceReference;

/// Boxed future type alias used by [`ResourceStore`] to keep the trait dyn-compatible.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Failure reported by the remote store.
///
/// Only `NotFound` and `Conflict` carry meaning for the migration logic;
/// every other variant is passed through to the caller untouched.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StoreError {
    /// The addressed instance does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Message reported by the store.
        message: String,
    },
    /// The instance changed since it was read (stale resource version).
    #[error("conflict: {message}")]
    Conflict {
        /// Message reported by the store.
        message: String,
    },
    /// An instance with the same name already exists.
    #[error("already exists: {message}")]
    AlreadyExists {
        /// Message reported by the store.
        message: String,
    },
    /// The store rejected the request for another reason.
    #[error("rejected ({code}): {message}")]
    Rejected {
        /// HTTP status code reported by the store.
        code: u16,
        /// Message reported by the store.
        message: String,
    },
    /// A document could not be encoded or decoded.
    #[error("malformed document: {message}")]
    Malformed {
        /// Description of the encoding failure.
        message: String,
    },
    /// The request never produced a store response.
    #[error("transport: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

impl StoreError {
    /// Returns `true` for "not found" failures.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for optimistic-concurrency conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Reads and writes arbitrary resources on the control plane.
///
/// Documents are passed as raw JSON so claims and composites of any schema
/// flow through unchanged. An empty namespace on the reference addresses a
/// cluster-scoped resource.
pub trait ResourceStore: Send + Sync {
    /// Fetches one instance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the instance is absent, or any
    /// other store failure.
    fn get<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, Value>;

    /// Creates a new instance and returns the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the name is taken, or any
    /// other store failure.
    fn create<'a>(&'a self, reference: &'a ResourceReference, document: Value)
        -> StoreFuture<'a, Value>;

    /// Replaces an instance, guarded by the document's resource version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the resource version is stale.
    fn update<'a>(&'a self, reference: &'a ResourceReference, document: Value)
        -> StoreFuture<'a, Value>;

    /// Deletes an instance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the instance is already gone, or
    /// any other store failure.
    fn delete<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, ()>;
}
