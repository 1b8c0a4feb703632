//! Remote resource gateway: the only path from the core to the store.

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::retry::ConflictAware;
use super::ResourceReference;
use crate::ports::{ResourceStore, StoreError};

/// Outcome of a read: the store's "not found" is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The instance exists.
    Found(Value),
    /// The store reported the instance as absent.
    Missing,
}

impl Lookup {
    /// Returns `true` when the instance exists.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns the document, if any.
    #[must_use]
    pub fn into_document(self) -> Option<Value> {
        match self {
            Self::Found(doc) => Some(doc),
            Self::Missing => None,
        }
    }
}

/// Store verb a gateway call was performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Read.
    Get,
    /// Claim creation.
    Create,
    /// Replace.
    Update,
    /// Removal.
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "cannot get",
            Self::Create => "unable to create new claim",
            Self::Update => "cannot update",
            Self::Delete => "cannot delete",
        })
    }
}

/// A store failure annotated with the call that produced it.
#[derive(Debug, Error)]
#[error("{verb} {target}")]
pub struct GatewayError {
    /// Operation that failed.
    pub verb: Verb,
    /// Instance the operation addressed.
    pub target: ResourceReference,
    /// Underlying store failure.
    #[source]
    pub source: StoreError,
}

impl GatewayError {
    fn new(verb: Verb, target: &ResourceReference, source: StoreError) -> Self {
        Self { verb, target: target.clone(), source }
    }

    /// Returns `true` when the store reported the target as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }
}

impl ConflictAware for GatewayError {
    fn is_conflict(&self) -> bool {
        self.source.is_conflict()
    }
}

/// Typed front for a [`ResourceStore`].
#[derive(Clone, Copy)]
pub struct Gateway<'a> {
    store: &'a dyn ResourceStore,
}

impl<'a> Gateway<'a> {
    /// Wraps the given store.
    #[must_use]
    pub fn new(store: &'a dyn ResourceStore) -> Self {
        Self { store }
    }

    /// Fetches an instance, translating "not found" into [`Lookup::Missing`].
    ///
    /// # Errors
    ///
    /// Returns any store failure other than "not found".
    pub async fn get(&self, reference: &ResourceReference) -> Result<Lookup, GatewayError> {
        match self.store.get(reference).await {
            Ok(doc) => Ok(Lookup::Found(doc)),
            Err(err) if err.is_not_found() => {
                debug!(target_ref = %reference, "resource not found");
                Ok(Lookup::Missing)
            }
            Err(err) => Err(GatewayError::new(Verb::Get, reference, err)),
        }
    }

    /// Fetches an instance that is expected to exist.
    ///
    /// # Errors
    ///
    /// Returns a "not found" [`GatewayError`] when the instance is absent, or
    /// any other store failure.
    pub async fn fetch(&self, reference: &ResourceReference) -> Result<Value, GatewayError> {
        self.store
            .get(reference)
            .await
            .map_err(|err| GatewayError::new(Verb::Get, reference, err))
    }

    /// Returns whether the instance exists.
    ///
    /// # Errors
    ///
    /// Returns any store failure other than "not found".
    pub async fn exists(&self, reference: &ResourceReference) -> Result<bool, GatewayError> {
        Ok(self.get(reference).await?.is_found())
    }

    /// Creates an instance at the reference's type and namespace.
    ///
    /// # Errors
    ///
    /// Returns the store failure (e.g. "already exists") wrapped as a claim
    /// creation error.
    pub async fn create(
        &self,
        reference: &ResourceReference,
        document: Value,
    ) -> Result<Value, GatewayError> {
        self.store
            .create(reference, document)
            .await
            .map_err(|err| GatewayError::new(Verb::Create, reference, err))
    }

    /// Replaces an instance.
    ///
    /// # Errors
    ///
    /// Returns the store failure unchanged in meaning; conflicts are left for
    /// the caller to retry.
    pub async fn update(
        &self,
        reference: &ResourceReference,
        document: Value,
    ) -> Result<Value, GatewayError> {
        self.store
            .update(reference, document)
            .await
            .map_err(|err| GatewayError::new(Verb::Update, reference, err))
    }

    /// Deletes an instance.
    ///
    /// # Errors
    ///
    /// Returns the store failure, including "not found".
    pub async fn delete(&self, reference: &ResourceReference) -> Result<(), GatewayError> {
        self.store
            .delete(reference)
            .await
            .map_err(|err| GatewayError::new(Verb::Delete, reference, err))
    }
}
