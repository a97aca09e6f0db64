//! The four-note "ding-dong-ding-dong" alert played before every call.

use crate::error::VoiceResult;
use async_trait::async_trait;
use std::time::Duration;

/// One sine tone of the chime, relative to the chime start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChimeNote {
    pub frequency_hz: f32,
    pub offset: Duration,
    pub duration: Duration,
}

/// G#5, D#5, G#5, D#5 (the last one held longer).
pub const CHIME: [ChimeNote; 4] = [
    ChimeNote {
        frequency_hz: 830.6,
        offset: Duration::from_millis(0),
        duration: Duration::from_millis(500),
    },
    ChimeNote {
        frequency_hz: 622.3,
        offset: Duration::from_millis(550),
        duration: Duration::from_millis(500),
    },
    ChimeNote {
        frequency_hz: 830.6,
        offset: Duration::from_millis(1100),
        duration: Duration::from_millis(500),
    },
    ChimeNote {
        frequency_hz: 622.3,
        offset: Duration::from_millis(1650),
        duration: Duration::from_millis(700),
    },
];

/// Peak gain of each note; the tone then decays towards silence.
pub const CHIME_GAIN: f32 = 0.4;

/// Time the sequencer waits from chime start before moving on (includes the ring-out).
pub const CHIME_DURATION: Duration = Duration::from_millis(2500);

/// Something that can sound the chime. Players may return as soon as playback is
/// scheduled; the sequencer itself waits out [`CHIME_DURATION`].
#[async_trait]
pub trait ChimePlayer: Send + Sync {
    async fn play(&self, notes: &[ChimeNote]) -> VoiceResult<()>;
}

/// No audio device: the chime is skipped, the pacing still applies.
#[derive(Debug, Default)]
pub struct SilentChime;

#[async_trait]
impl ChimePlayer for SilentChime {
    async fn play(&self, _notes: &[ChimeNote]) -> VoiceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_fits_inside_its_wait() {
        let end = CHIME
            .iter()
            .map(|n| n.offset + n.duration)
            .max()
            .unwrap();
        assert_eq!(end, Duration::from_millis(2350));
        assert!(end < CHIME_DURATION);
        assert!(CHIME.windows(2).all(|w| w[0].offset + w[0].duration <= w[1].offset));
    }
}
