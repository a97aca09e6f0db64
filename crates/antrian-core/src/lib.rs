//! ANTRIAN Core library.
//! Queue state model and the versioned shared-state protocol for the counter board:
//! a store over a key-value seam, readers that only move forward in version, and the
//! HTTP client used by displays and operator panels.

pub mod action;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod follower;
pub mod kv;
pub mod model;
pub mod store;

pub use action::{MutationRequest, QueueAction};
pub use client::QueueClient;
pub use clock::{Clock, SystemClock};
pub use config::{load_layered, CounterSpec, QueueConfig};
pub use error::{QueueError, QueueResult};
pub use follower::{QueueFollower, StateSource, VersionGate};
pub use kv::{KeyValueStore, MemoryStore, SledStore};
pub use model::{default_counters, Counter, QueueState};
pub use store::{QueueStore, DEFAULT_STATE_KEY};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
