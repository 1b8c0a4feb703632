//! Replaying adapters that serve recorded interactions.

pub mod discovery;
pub mod store;

pub use discovery::ReplayingDiscovery;
pub use store::ReplayingResourceStore;

use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::format::Interaction;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::StoreError;

/// Runs `take` against the shared replayer and clones the served output.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    take: impl FnOnce(&mut CassetteReplayer) -> &Interaction,
) -> Value {
    let mut replayer = replayer.lock().expect("replayer lock poisoned");
    take(&mut *replayer).output.clone()
}

/// Decode an `{"Ok": v}` / `{"Err": e}` output written by
/// `CassetteRecorder`.
///
/// # Panics
///
/// Panics when the output does not follow the convention; a malformed
/// cassette is a broken fixture, not a runtime condition.
pub(crate) fn replay_result<T: DeserializeOwned>(output: Value) -> Result<T, StoreError> {
    if let Some(ok) = output.get("Ok") {
        return Ok(serde_json::from_value(ok.clone())
            .unwrap_or_else(|e| panic!("cassette Ok value does not decode: {e}")));
    }
    if let Some(err) = output.get("Err") {
        return Err(serde_json::from_value(err.clone())
            .unwrap_or_else(|e| panic!("cassette Err value does not decode: {e}")));
    }
    panic!("cassette output is neither Ok nor Err: {output}");
}
