//! # Antrian Voice - Queue Call Announcements
//!
//! Turns queue state changes into audible calls: a four-note chime followed by the
//! ticket spoken digit by digit, strictly one announcement at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    AnnouncementSequencer                      │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────┐   │
//! │  │ QueueState   │→ │ Dedup        │→ │ FIFO (one worker)  │   │
//! │  │ observe()    │  │ (id,no,time) │  │                    │   │
//! │  └──────────────┘  └──────────────┘  └────────────────────┘   │
//! │                                         ↓            ↓        │
//! │                               ┌──────────────┐ ┌───────────┐  │
//! │                               │ ChimePlayer  │ │  Speaker  │  │
//! │                               │ (rodio/none) │ │ (TTS/none)│  │
//! │                               └──────────────┘ └───────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod chime;
pub mod dedup;
pub mod error;
#[cfg(feature = "audio")]
pub mod playback;
pub mod sequencer;
pub mod speech;
pub mod text;

pub use chime::{ChimeNote, ChimePlayer, SilentChime, CHIME, CHIME_DURATION};
pub use dedup::{AnnouncedCalls, CallKey};
pub use error::{VoiceError, VoiceResult};
#[cfg(feature = "audio")]
pub use playback::{AudioOutput, RodioChime};
pub use sequencer::{
    Announcement, AnnouncementSequencer, AnnouncerConfig, Phase, SequencerStatus,
};
pub use speech::{HttpTts, SilentSpeaker, Speaker, TtsBackend, TtsConfig, Utterance, VoiceInfo};
#[cfg(feature = "audio")]
pub use speech::TtsSpeaker;
pub use text::Phrasebook;
