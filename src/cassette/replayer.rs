//! Serves recorded interactions back in order.
//!
//! Each port/method pair is its own queue, so a store `get` never consumes a
//! recorded `update`. Store calls are also checked against the reference
//! they were recorded with: a migration that addresses a different instance
//! than the recording did has diverged, and the replay stops there.

use std::collections::HashMap;

use super::format::{Cassette, Interaction, StoreCall, STORE_PORT};
use crate::resource::ResourceReference;

/// Per port/method queues over a loaded cassette.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), Queue>,
    /// Sorted `port::method` names, for exhaustion messages.
    recorded: Vec<String>,
}

struct Queue {
    interactions: Vec<Interaction>,
    next: usize,
}

impl CassetteReplayer {
    /// Indexes a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), Queue> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_insert_with(|| Queue { interactions: Vec::new(), next: 0 })
                .interactions
                .push(interaction.clone());
        }
        let mut recorded: Vec<String> =
            queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
        recorded.sort();
        Self { queues, recorded }
    }

    /// Returns the next interaction recorded for `port`/`method`.
    ///
    /// # Panics
    ///
    /// Panics when nothing (more) was recorded for the pair, naming what
    /// the cassette does hold.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> &Interaction {
        let Some(queue) = self.queues.get_mut(&(port.to_owned(), method.to_owned())) else {
            panic!(
                "Cassette exhausted: no interactions recorded for {port}::{method}. \
                 Recorded: [{}]",
                self.recorded.join(", ")
            );
        };
        let Some(interaction) = queue.interactions.get(queue.next) else {
            panic!(
                "Cassette exhausted: all {count} interactions for {port}::{method} \
                 have been consumed",
                count = queue.interactions.len(),
            );
        };
        queue.next += 1;
        interaction
    }

    /// Returns the next store interaction for `method`, checking that it was
    /// recorded against `reference`.
    ///
    /// Inputs that name no reference (hand-written fixtures) are served as is.
    ///
    /// # Panics
    ///
    /// Panics when the queue is exhausted or the recorded call addressed a
    /// different instance.
    pub fn next_store_call(
        &mut self,
        method: &str,
        reference: &ResourceReference,
    ) -> &Interaction {
        let interaction = self.next_interaction(STORE_PORT, method);
        if let Some(recorded) = StoreCall::from_input(&interaction.input) {
            assert!(
                recorded.reference == *reference,
                "Cassette out of sequence: store::{method} requested {reference}, \
                 but seq={seq} was recorded for {recorded}",
                seq = interaction.seq,
                recorded = recorded.reference,
            );
        }
        interaction
    }
}
