//! Readers of the canonical state: the version gate and the polling follower.
//!
//! Polling is the only synchronization between the operator (writer) and the display
//! and other operator panels (readers). A reader applies a snapshot only when its
//! version is strictly greater than the last one it applied, so it never regresses but
//! may skip intermediate versions.

use crate::action::QueueAction;
use crate::client::QueueClient;
use crate::error::{QueueError, QueueResult};
use crate::model::QueueState;
use crate::store::QueueStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// Admits only strictly newer versions.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionGate {
    last_applied: Option<u64>,
}

impl VersionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and accept `state` if it is newer than anything applied so far.
    pub fn admit(&mut self, state: &QueueState) -> bool {
        match self.last_applied {
            Some(last) if state.version <= last => false,
            _ => {
                self.last_applied = Some(state.version);
                true
            }
        }
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }
}

/// Anything that can produce the current canonical state.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch(&self) -> QueueResult<QueueState>;
}

#[async_trait]
impl StateSource for QueueClient {
    async fn fetch(&self) -> QueueResult<QueueState> {
        self.fetch_state().await
    }
}

/// The store takes a lock and may write through to disk, so reads run on the
/// blocking pool.
#[async_trait]
impl StateSource for Arc<QueueStore> {
    async fn fetch(&self) -> QueueResult<QueueState> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.read())
            .await
            .map_err(|e| QueueError::Storage(format!("read task failed: {}", e)))?
    }
}

/// Local view of the queue kept current by polling.
///
/// Subscribers receive every admitted snapshot through a watch channel (`None` until
/// the first one arrives).
pub struct QueueFollower {
    gate: Mutex<VersionGate>,
    tx: watch::Sender<Option<QueueState>>,
    /// Submits in flight; polls are skipped while non-zero.
    in_flight: AtomicUsize,
}

impl QueueFollower {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            gate: Mutex::new(VersionGate::new()),
            tx,
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<QueueState>> {
        self.tx.subscribe()
    }

    /// Last admitted snapshot.
    pub fn latest(&self) -> Option<QueueState> {
        self.tx.borrow().clone()
    }

    pub fn last_applied_version(&self) -> Option<u64> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner()).last_applied()
    }

    /// Offer a snapshot; returns `true` if it was newer and got published.
    pub fn apply(&self, state: QueueState) -> bool {
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if !gate.admit(&state) {
            debug!(version = state.version, "[ANTRIAN SYNC] stale snapshot skipped");
            return false;
        }
        self.tx.send_replace(Some(state));
        true
    }

    /// Fetch once and apply. Skipped (returns `Ok(false)`) while a submit is in flight.
    pub async fn poll_once(&self, source: &dyn StateSource) -> QueueResult<bool> {
        if self.in_flight.load(Ordering::Acquire) > 0 {
            return Ok(false);
        }
        let state = source.fetch().await?;
        Ok(self.apply(state))
    }

    /// Send an operator action and apply the returned state. Failures are logged, not
    /// retried.
    pub async fn submit(&self, client: &QueueClient, action: &QueueAction) -> Option<QueueState> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let result = client.send(action).await;
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        match result {
            Ok(state) => {
                self.apply(state.clone());
                Some(state)
            }
            Err(e) => {
                warn!(action = action.name(), "[ANTRIAN SYNC] action failed: {}", e);
                None
            }
        }
    }

    /// Poll `source` every `interval` forever. When `changes` is given, a change
    /// notification triggers an immediate re-read as well.
    pub async fn run(
        &self,
        source: Arc<dyn StateSource>,
        interval: Duration,
        mut changes: Option<broadcast::Receiver<String>>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = next_change(&mut changes) => {}
            }
            if let Err(e) = self.poll_once(source.as_ref()).await {
                warn!("[ANTRIAN SYNC] fetching queue state failed: {}", e);
            }
        }
    }
}

impl Default for QueueFollower {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on the next change notification; pending forever without a channel.
async fn next_change(changes: &mut Option<broadcast::Receiver<String>>) {
    let Some(rx) = changes.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => {
            *changes = None;
        }
    }
}
