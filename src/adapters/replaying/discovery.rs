//! Replaying adapter for the `DiscoveryClient` port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::format::DISCOVERY_PORT;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{DiscoveryClient, DiscoveryFuture};

/// Serves a recorded discovery catalog from a cassette.
pub struct ReplayingDiscovery {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingDiscovery {
    /// Creates a replaying discovery client from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl DiscoveryClient for ReplayingDiscovery {
    fn server_resources(&self) -> DiscoveryFuture<'_> {
        let output = next_output(&self.replayer, |replayer| {
            replayer.next_interaction(DISCOVERY_PORT, "server_resources")
        });
        Box::pin(async move { replay_result(output) })
    }
}
