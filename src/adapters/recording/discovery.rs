//! Recording adapter for the `DiscoveryClient` port.

use std::sync::{Arc, Mutex};

use super::lock;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{DiscoveryClient, DiscoveryFuture};

/// Records discovery round-trips while delegating to an inner implementation.
pub struct RecordingDiscovery {
    inner: Box<dyn DiscoveryClient>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingDiscovery {
    /// Creates a recording discovery client wrapping the given implementation.
    pub fn new(inner: Box<dyn DiscoveryClient>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl DiscoveryClient for RecordingDiscovery {
    fn server_resources(&self) -> DiscoveryFuture<'_> {
        Box::pin(async move {
            let result = self.inner.server_resources().await;
            lock(&self.recorder).record_discovery(&result);
            result
        })
    }
}
