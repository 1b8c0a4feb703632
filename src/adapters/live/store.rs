//! Live adapter for the `ResourceStore` port using `Api<DynamicObject>`.

use kube::api::{Api, DeleteParams, DynamicObject, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::Value;

use super::store_error;
use crate::ports::{ResourceStore, StoreError, StoreFuture};
use crate::resource::ResourceReference;

/// Live store backed by the cluster's API server.
pub struct LiveResourceStore {
    client: Client,
}

impl LiveResourceStore {
    /// Creates a store on top of an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Untyped API handle for the reference's type and scope.
    fn api(&self, reference: &ResourceReference) -> Api<DynamicObject> {
        let resource = ApiResource {
            group: reference.group().to_owned(),
            version: reference.version().to_owned(),
            api_version: reference.api_version.clone(),
            kind: reference.kind.clone(),
            plural: reference.plural(),
        };
        if reference.is_cluster_scoped() {
            Api::all_with(self.client.clone(), &resource)
        } else {
            Api::namespaced_with(self.client.clone(), &reference.namespace, &resource)
        }
    }
}

fn to_object(document: Value) -> Result<DynamicObject, StoreError> {
    serde_json::from_value(document).map_err(|e| StoreError::Malformed { message: e.to_string() })
}

fn to_document(object: &DynamicObject) -> Result<Value, StoreError> {
    serde_json::to_value(object).map_err(|e| StoreError::Malformed { message: e.to_string() })
}

impl ResourceStore for LiveResourceStore {
    fn get<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let object = self.api(reference).get(&reference.name).await.map_err(store_error)?;
            to_document(&object)
        })
    }

    fn create<'a>(
        &'a self,
        reference: &'a ResourceReference,
        document: Value,
    ) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let object = to_object(document)?;
            let created = self
                .api(reference)
                .create(&PostParams::default(), &object)
                .await
                .map_err(store_error)?;
            to_document(&created)
        })
    }

    fn update<'a>(
        &'a self,
        reference: &'a ResourceReference,
        document: Value,
    ) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let object = to_object(document)?;
            let replaced = self
                .api(reference)
                .replace(&reference.name, &PostParams::default(), &object)
                .await
                .map_err(store_error)?;
            to_document(&replaced)
        })
    }

    fn delete<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.api(reference)
                .delete(&reference.name, &DeleteParams::default())
                .await
                .map_err(store_error)?;
            Ok(())
        })
    }
}
