//! Replaying adapter for the `ResourceStore` port.

use std::sync::Mutex;

use serde_json::Value;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{ResourceStore, StoreFuture};
use crate::resource::ResourceReference;

/// Serves recorded store responses from a cassette.
///
/// Responses are served in order per method. A recorded call that addressed
/// a different instance than the one requested stops the replay.
pub struct ReplayingResourceStore {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingResourceStore {
    /// Creates a replaying store from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn replay<T: serde::de::DeserializeOwned + Send + 'static>(
        &self,
        method: &str,
        reference: &ResourceReference,
    ) -> StoreFuture<'_, T> {
        let output =
            next_output(&self.replayer, |replayer| replayer.next_store_call(method, reference));
        Box::pin(async move { replay_result(output) })
    }
}

impl ResourceStore for ReplayingResourceStore {
    fn get<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, Value> {
        self.replay("get", reference)
    }

    fn create<'a>(
        &'a self,
        reference: &'a ResourceReference,
        _document: Value,
    ) -> StoreFuture<'a, Value> {
        self.replay("create", reference)
    }

    fn update<'a>(
        &'a self,
        reference: &'a ResourceReference,
        _document: Value,
    ) -> StoreFuture<'a, Value> {
        self.replay("update", reference)
    }

    fn delete<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, ()> {
        self.replay("delete", reference)
    }
}
