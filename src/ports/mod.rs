//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the migration core and the
//! control plane (resource reads/writes and type discovery).
//! Implementations live in `src/adapters/`.

pub mod discovery;
pub mod store;

pub use discovery::{ApiResourceEntry, DiscoveryClient, DiscoveryFuture};
pub use store::{ResourceStore, StoreError, StoreFuture};
