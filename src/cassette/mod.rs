//! Cassette format for recording and replaying control-plane interactions.
//!
//! A cassette captures every store and discovery call of one run so the
//! same migration can be replayed offline, byte for byte.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
