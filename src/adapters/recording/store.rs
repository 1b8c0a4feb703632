//! Recording adapter for the `ResourceStore` port.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::lock;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{ResourceStore, StoreFuture};
use crate::resource::ResourceReference;

/// Records store interactions while delegating to an inner implementation.
pub struct RecordingResourceStore {
    inner: Box<dyn ResourceStore>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingResourceStore {
    /// Creates a recording store wrapping the given implementation.
    pub fn new(inner: Box<dyn ResourceStore>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl ResourceStore for RecordingResourceStore {
    fn get<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let result = self.inner.get(reference).await;
            lock(&self.recorder).record_store_call("get", reference, None, &result);
            result
        })
    }

    fn create<'a>(
        &'a self,
        reference: &'a ResourceReference,
        document: Value,
    ) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let result = self.inner.create(reference, document.clone()).await;
            lock(&self.recorder).record_store_call("create", reference, Some(&document), &result);
            result
        })
    }

    fn update<'a>(
        &'a self,
        reference: &'a ResourceReference,
        document: Value,
    ) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let result = self.inner.update(reference, document.clone()).await;
            lock(&self.recorder).record_store_call("update", reference, Some(&document), &result);
            result
        })
    }

    fn delete<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let result = self.inner.delete(reference).await;
            lock(&self.recorder).record_store_call("delete", reference, None, &result);
            result
        })
    }
}
