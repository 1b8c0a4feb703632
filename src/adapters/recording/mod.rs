//! Recording adapters that capture interactions to cassettes.

pub mod discovery;
pub mod store;

pub use discovery::RecordingDiscovery;
pub use store::RecordingResourceStore;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::cassette::recorder::CassetteRecorder;

/// Locks the shared recorder; a poisoned lock means a recording thread panicked.
pub(crate) fn lock(recorder: &Arc<Mutex<CassetteRecorder>>) -> MutexGuard<'_, CassetteRecorder> {
    recorder.lock().expect("recorder lock poisoned")
}
