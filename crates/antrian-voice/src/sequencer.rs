//! **AnnouncementSequencer**: strictly serialized "chime + spoken call" pipeline.
//!
//! One worker task drains a FIFO of announcements, so at most one announcement is
//! audible at any time even when several counters call within the same second.
//!
//! ```text
//! Queued → Chiming → Pausing → Speaking → Pausing → Idle
//! ```
//!
//! `Queued` is the time an item spends in the channel; the other phases are published
//! on a watch channel as [`SequencerStatus`]. A failed chime or utterance is logged and
//! the worker moves on to the next item.

use crate::chime::{ChimePlayer, CHIME, CHIME_DURATION};
use crate::dedup::{AnnouncedCalls, CallKey};
use crate::error::{VoiceError, VoiceResult};
use crate::speech::{Speaker, Utterance};
use crate::text::Phrasebook;
use antrian_core::{Counter, QueueState};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Rate used when no voice for the configured language is available.
const DEFAULT_RATE: f32 = 1.0;

fn default_pause_after_chime_ms() -> u64 {
    400
}

fn default_pause_after_speech_ms() -> u64 {
    500
}

fn default_lang() -> String {
    "id-ID".to_string()
}

fn default_rate() -> f32 {
    0.85
}

fn default_one() -> f32 {
    1.0
}

fn default_dedup_capacity() -> usize {
    100
}

/// `[announcer]` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncerConfig {
    /// Pause between the chime and the spoken text (default: 400ms)
    #[serde(default = "default_pause_after_chime_ms")]
    pub pause_after_chime_ms: u64,
    /// Pause after the spoken text before the next item (default: 500ms)
    #[serde(default = "default_pause_after_speech_ms")]
    pub pause_after_speech_ms: u64,
    /// Announcement language, BCP-47 (default: id-ID)
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_one")]
    pub pitch: f32,
    #[serde(default = "default_one")]
    pub volume: f32,
    /// Dedup set size before the oldest half is evicted (default: 100)
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            pause_after_chime_ms: default_pause_after_chime_ms(),
            pause_after_speech_ms: default_pause_after_speech_ms(),
            lang: default_lang(),
            rate: default_rate(),
            pitch: default_one(),
            volume: default_one(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

/// One call to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub counter_id: String,
    pub counter_name: String,
    pub prefix: String,
    pub number: u32,
}

impl From<&Counter> for Announcement {
    fn from(counter: &Counter) -> Self {
        Self {
            counter_id: counter.id.clone(),
            counter_name: counter.name.clone(),
            prefix: counter.prefix.clone(),
            number: counter.current_number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Chiming,
    Pausing,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerStatus {
    pub phase: Phase,
    /// Items waiting in the queue (not counting the one being played).
    pub pending: usize,
    /// Items fully played since start.
    pub completed: u64,
}

/// Owned announcement pipeline. Construct one per display.
pub struct AnnouncementSequencer {
    tx: mpsc::UnboundedSender<Announcement>,
    status_tx: Arc<watch::Sender<SequencerStatus>>,
    announced: Mutex<AnnouncedCalls>,
    enabled: AtomicBool,
    worker: JoinHandle<()>,
}

impl AnnouncementSequencer {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(
        config: AnnouncerConfig,
        chime: Arc<dyn ChimePlayer>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(SequencerStatus {
            phase: Phase::Idle,
            pending: 0,
            completed: 0,
        });
        let status_tx = Arc::new(status_tx);
        let announced = Mutex::new(AnnouncedCalls::new(config.dedup_capacity));

        let worker = Worker {
            config,
            chime,
            speaker,
            status: Arc::clone(&status_tx),
        };
        let worker = tokio::spawn(worker.run(rx));

        Self {
            tx,
            status_tx,
            announced,
            enabled: AtomicBool::new(true),
            worker,
        }
    }

    /// Turn announcements on or off. While off, [`observe`](Self::observe) ignores
    /// state changes entirely, so calls made meanwhile are not remembered either.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        info!(enabled, "[ANTRIAN VOICE] announcements toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enqueue every call in `state` that has not been announced yet, in counter
    /// order. Returns how many were enqueued.
    pub fn observe(&self, state: &QueueState) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let fresh: Vec<Announcement> = {
            let mut announced = self.announced.lock().unwrap_or_else(|e| e.into_inner());
            state
                .counters
                .iter()
                .filter(|c| CallKey::of(c).is_some_and(|key| announced.insert(key)))
                .map(Announcement::from)
                .collect()
        };
        let mut enqueued = 0;
        for item in fresh {
            match self.enqueue(item) {
                Ok(()) => enqueued += 1,
                Err(e) => warn!("[ANTRIAN VOICE] {}", e),
            }
        }
        enqueued
    }

    /// Append to the FIFO.
    pub fn enqueue(&self, item: Announcement) -> VoiceResult<()> {
        debug!(counter = %item.counter_id, number = item.number, "[ANTRIAN VOICE] queued");
        self.status_tx.send_modify(|s| s.pending += 1);
        self.tx.send(item).map_err(|_| {
            self.status_tx
                .send_modify(|s| s.pending = s.pending.saturating_sub(1));
            VoiceError::ChannelClosed("announcement worker stopped".to_string())
        })
    }

    pub fn status(&self) -> SequencerStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SequencerStatus> {
        self.status_tx.subscribe()
    }

    /// Resolve once nothing is queued and the worker is idle.
    pub async fn drained(&self) {
        let mut rx = self.status_tx.subscribe();
        let _ = rx
            .wait_for(|s| s.phase == Phase::Idle && s.pending == 0)
            .await;
    }

    /// Stop accepting work, let queued items finish, and wait for the worker.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!("[ANTRIAN VOICE] worker ended abnormally: {}", e);
        }
    }
}

struct Worker {
    config: AnnouncerConfig,
    chime: Arc<dyn ChimePlayer>,
    speaker: Arc<dyn Speaker>,
    status: Arc<watch::Sender<SequencerStatus>>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Announcement>) {
        let phrasebook = Phrasebook::for_lang(&self.config.lang);
        while let Some(item) = rx.recv().await {
            // Leave the queue and start chiming in one step, so `drained` never sees
            // an idle worker with an item in flight.
            self.status.send_modify(|s| {
                s.pending = s.pending.saturating_sub(1);
                s.phase = Phase::Chiming;
            });
            self.announce(&item, phrasebook).await;
            self.status.send_modify(|s| {
                s.phase = Phase::Idle;
                s.completed += 1;
            });
        }
        debug!("[ANTRIAN VOICE] announcement queue closed");
    }

    async fn announce(&self, item: &Announcement, phrasebook: Phrasebook) {
        info!(
            counter = %item.counter_name,
            ticket = %format!("{}-{:03}", item.prefix, item.number),
            "📢 announcing"
        );

        let chime_started = Instant::now();
        if let Err(e) = self.chime.play(&CHIME).await {
            warn!("[ANTRIAN VOICE] chime failed: {}", e);
        }
        sleep_until(chime_started + CHIME_DURATION).await;

        self.set_phase(Phase::Pausing);
        sleep(Duration::from_millis(self.config.pause_after_chime_ms)).await;

        self.set_phase(Phase::Speaking);
        let text = phrasebook.announcement(&item.prefix, item.number, &item.counter_name);
        self.speak(text).await;

        self.set_phase(Phase::Pausing);
        sleep(Duration::from_millis(self.config.pause_after_speech_ms)).await;
    }

    async fn speak(&self, text: String) {
        if !self.speaker.is_available() {
            debug!("[ANTRIAN VOICE] speech unavailable, skipping utterance");
            return;
        }
        let utterance = self.utterance(text);
        if let Err(e) = self.speaker.speak(&utterance).await {
            warn!("[ANTRIAN VOICE] speech failed: {}", e);
        }
    }

    /// Prefer a voice for the configured language; otherwise let the backend pick its
    /// default voice at the default rate.
    fn utterance(&self, text: String) -> Utterance {
        let primary = self
            .config
            .lang
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let voice = self
            .speaker
            .voices()
            .into_iter()
            .find(|v| !primary.is_empty() && v.lang.to_ascii_lowercase().starts_with(&primary));
        let rate = if voice.is_some() {
            self.config.rate
        } else {
            DEFAULT_RATE
        };
        Utterance {
            text,
            lang: self.config.lang.clone(),
            rate,
            pitch: self.config.pitch,
            volume: self.config.volume,
            voice: voice.map(|v| v.name),
        }
    }

    fn set_phase(&self, phase: Phase) {
        self.status.send_modify(|s| s.phase = phase);
    }
}
