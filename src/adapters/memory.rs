//! In-memory adapters that behave like a small control plane.
//!
//! Used by tests to drive the migration end to end: objects get resource
//! versions, stale updates conflict, finalizers hold deletion back, and every
//! call is journaled so tests can inspect what was sent.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::ports::{
    ApiResourceEntry, DiscoveryClient, DiscoveryFuture, ResourceStore, StoreError, StoreFuture,
};
use crate::resource::claim;
use crate::resource::ResourceReference;

/// One call received by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    /// `get`, `create`, `update` or `delete`.
    pub verb: &'static str,
    /// Addressed instance.
    pub reference: ResourceReference,
    /// Document sent with `create` and `update`.
    pub document: Option<Value>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ResourceReference, Value>,
    next_version: u64,
    journal: Vec<StoreCall>,
    failures: Vec<(&'static str, StoreError)>,
    conflicts: HashMap<ResourceReference, u32>,
}

impl State {
    fn stamp(&mut self, document: &mut Value) {
        self.next_version += 1;
        document["metadata"]["resourceVersion"] = Value::String(self.next_version.to_string());
    }

    fn take_failure(&mut self, verb: &str) -> Option<StoreError> {
        let index = self.failures.iter().position(|(v, _)| *v == verb)?;
        Some(self.failures.remove(index).1)
    }
}

/// In-memory [`ResourceStore`].
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object, filling in its identity fields.
    pub fn insert(&self, reference: &ResourceReference, mut document: Value) {
        if !document.is_object() {
            document = json!({});
        }
        document["apiVersion"] = Value::String(reference.api_version.clone());
        document["kind"] = Value::String(reference.kind.clone());
        document["metadata"]["name"] = Value::String(reference.name.clone());
        if !reference.namespace.is_empty() {
            document["metadata"]["namespace"] = Value::String(reference.namespace.clone());
        }
        let mut state = self.lock();
        state.stamp(&mut document);
        state.objects.insert(reference.clone(), document);
    }

    /// Returns the stored object, if any.
    #[must_use]
    pub fn object(&self, reference: &ResourceReference) -> Option<Value> {
        self.lock().objects.get(reference).cloned()
    }

    /// Makes the next call with `verb` fail with `error`.
    pub fn fail_next(&self, verb: &'static str, error: StoreError) {
        self.lock().failures.push((verb, error));
    }

    /// Simulates a concurrent writer: the next `times` updates of `reference`
    /// find the object changed since it was read.
    pub fn conflict_next_updates(&self, reference: &ResourceReference, times: u32) {
        self.lock().conflicts.insert(reference.clone(), times);
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().journal.clone()
    }

    /// Number of calls received with `verb`.
    #[must_use]
    pub fn count_calls(&self, verb: &str) -> usize {
        self.lock().journal.iter().filter(|c| c.verb == verb).count()
    }

    /// Number of writes (create, update, delete) received.
    #[must_use]
    pub fn count_writes(&self) -> usize {
        self.lock().journal.iter().filter(|c| c.verb != "get").count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("store lock poisoned")
    }

    fn begin(
        &self,
        verb: &'static str,
        reference: &ResourceReference,
        document: Option<&Value>,
    ) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        let mut state = self.lock();
        state.journal.push(StoreCall {
            verb,
            reference: reference.clone(),
            document: document.cloned(),
        });
        match state.take_failure(verb) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    fn do_get(&self, reference: &ResourceReference) -> Result<Value, StoreError> {
        let state = self.begin("get", reference, None)?;
        state.objects.get(reference).cloned().ok_or_else(|| not_found(reference))
    }

    fn do_create(
        &self,
        reference: &ResourceReference,
        mut document: Value,
    ) -> Result<Value, StoreError> {
        let mut state = self.begin("create", reference, Some(&document))?;
        if state.objects.contains_key(reference) {
            return Err(StoreError::AlreadyExists {
                message: format!("{} {:?} already exists", reference.plural(), reference.name),
            });
        }
        if resource_version(&document).is_some_and(|v| !v.is_empty()) {
            return Err(StoreError::Rejected {
                code: 400,
                message: "resourceVersion should not be set on objects to be created".into(),
            });
        }
        state.stamp(&mut document);
        state.objects.insert(reference.clone(), document.clone());
        Ok(document)
    }

    fn do_update(
        &self,
        reference: &ResourceReference,
        mut document: Value,
    ) -> Result<Value, StoreError> {
        let mut state = self.begin("update", reference, Some(&document))?;
        let Some(current) = state.objects.get(reference).cloned() else {
            return Err(not_found(reference));
        };
        if let Some(remaining) = state.conflicts.get_mut(reference).filter(|n| **n > 0) {
            *remaining -= 1;
            let mut changed = current;
            state.stamp(&mut changed);
            state.objects.insert(reference.clone(), changed);
            return Err(conflict(reference));
        }
        match resource_version(&document) {
            None | Some("") => {
                return Err(StoreError::Rejected {
                    code: 422,
                    message: "metadata.resourceVersion must be specified for an update".into(),
                })
            }
            Some(v) if Some(v) != resource_version(&current) => return Err(conflict(reference)),
            Some(_) => {}
        }
        if let Some(deleted_at) = current.pointer("/metadata/deletionTimestamp") {
            document["metadata"]["deletionTimestamp"] = deleted_at.clone();
            if claim::finalizers(&document).is_empty() {
                state.objects.remove(reference);
                return Ok(document);
            }
        }
        state.stamp(&mut document);
        state.objects.insert(reference.clone(), document.clone());
        Ok(document)
    }

    fn do_delete(&self, reference: &ResourceReference) -> Result<(), StoreError> {
        let mut state = self.begin("delete", reference, None)?;
        let Some(mut current) = state.objects.get(reference).cloned() else {
            return Err(not_found(reference));
        };
        if claim::finalizers(&current).is_empty() {
            state.objects.remove(reference);
        } else {
            current["metadata"]["deletionTimestamp"] = json!("1970-01-01T00:00:00Z");
            state.stamp(&mut current);
            state.objects.insert(reference.clone(), current);
        }
        Ok(())
    }
}

fn resource_version(document: &Value) -> Option<&str> {
    document.pointer("/metadata/resourceVersion").and_then(Value::as_str)
}

fn not_found(reference: &ResourceReference) -> StoreError {
    StoreError::NotFound {
        message: format!("{} {:?} not found", reference.plural(), reference.name),
    }
}

fn conflict(reference: &ResourceReference) -> StoreError {
    StoreError::Conflict {
        message: format!(
            "Operation cannot be fulfilled on {} {:?}: the object has been modified; \
             please apply your changes to the latest version and try again",
            reference.plural(),
            reference.name
        ),
    }
}

impl ResourceStore for InMemoryStore {
    fn get<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, Value> {
        let result = self.do_get(reference);
        Box::pin(async move { result })
    }

    fn create<'a>(
        &'a self,
        reference: &'a ResourceReference,
        document: Value,
    ) -> StoreFuture<'a, Value> {
        let result = self.do_create(reference, document);
        Box::pin(async move { result })
    }

    fn update<'a>(
        &'a self,
        reference: &'a ResourceReference,
        document: Value,
    ) -> StoreFuture<'a, Value> {
        let result = self.do_update(reference, document);
        Box::pin(async move { result })
    }

    fn delete<'a>(&'a self, reference: &'a ResourceReference) -> StoreFuture<'a, ()> {
        let result = self.do_delete(reference);
        Box::pin(async move { result })
    }
}

/// [`DiscoveryClient`] serving a fixed catalog.
pub struct StaticDiscovery {
    outcome: Result<Vec<ApiResourceEntry>, StoreError>,
    calls: AtomicUsize,
}

impl StaticDiscovery {
    /// Serves `entries` on every call.
    #[must_use]
    pub fn new(entries: Vec<ApiResourceEntry>) -> Self {
        Self { outcome: Ok(entries), calls: AtomicUsize::new(0) }
    }

    /// Fails every call with `error`.
    #[must_use]
    pub fn failing(error: StoreError) -> Self {
        Self { outcome: Err(error), calls: AtomicUsize::new(0) }
    }

    /// Number of discovery round-trips served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DiscoveryClient for StaticDiscovery {
    fn server_resources(&self) -> DiscoveryFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}
