//! Audio output on the default device (rodio).
//!
//! `rodio::OutputStream` is not `Send`, so the stream lives on a dedicated playback
//! thread and async callers talk to it over a channel. Each request gets a fresh
//! `Sink`; the reply is sent once that sink has drained.

use crate::chime::{ChimeNote, ChimePlayer, CHIME_GAIN};
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use rodio::source::{SineWave, Zero};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

const SAMPLE_RATE: u32 = 44100;
const ATTACK: Duration = Duration::from_millis(20);

enum PlaybackCommand {
    Chime(Vec<ChimeNote>, oneshot::Sender<VoiceResult<()>>),
    Clip(Vec<u8>, oneshot::Sender<VoiceResult<()>>),
}

/// Handle to the playback thread. Cheap to clone.
#[derive(Clone)]
pub struct AudioOutput {
    tx: std_mpsc::Sender<PlaybackCommand>,
}

impl AudioOutput {
    /// Open the default output device. Fails when there is no device.
    pub fn open() -> VoiceResult<Self> {
        let (tx, rx) = std_mpsc::channel::<PlaybackCommand>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<VoiceResult<()>>();

        thread::Builder::new()
            .name("antrian-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(VoiceError::Playback(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                info!("🔊 audio output ready");

                while let Ok(command) = rx.recv() {
                    match command {
                        PlaybackCommand::Chime(notes, reply) => {
                            let _ = reply.send(play_chime(&handle, &notes));
                        }
                        PlaybackCommand::Clip(bytes, reply) => {
                            let _ = reply.send(play_clip(&handle, bytes));
                        }
                    }
                }
                warn!("🛑 audio output thread ended");
            })?;

        ready_rx
            .recv()
            .map_err(|_| VoiceError::ChannelClosed("audio thread exited during startup".to_string()))??;
        Ok(Self { tx })
    }

    /// Play the chime notes; resolves when the last note has rung out.
    pub async fn play_chime(&self, notes: &[ChimeNote]) -> VoiceResult<()> {
        let (reply, done) = oneshot::channel();
        self.send(PlaybackCommand::Chime(notes.to_vec(), reply))?;
        done.await
            .map_err(|e| VoiceError::ChannelClosed(e.to_string()))?
    }

    /// Decode and play encoded audio (WAV/MP3); resolves when playback ends.
    pub async fn play_clip(&self, bytes: Vec<u8>) -> VoiceResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let (reply, done) = oneshot::channel();
        self.send(PlaybackCommand::Clip(bytes, reply))?;
        done.await
            .map_err(|e| VoiceError::ChannelClosed(e.to_string()))?
    }

    fn send(&self, command: PlaybackCommand) -> VoiceResult<()> {
        self.tx
            .send(command)
            .map_err(|e| VoiceError::ChannelClosed(e.to_string()))
    }
}

fn play_chime(handle: &OutputStreamHandle, notes: &[ChimeNote]) -> VoiceResult<()> {
    let sink = Sink::try_new(handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
    let mut cursor = Duration::ZERO;
    for note in notes {
        if note.offset > cursor {
            let gap = Zero::<f32>::new(1, SAMPLE_RATE).take_duration(note.offset - cursor);
            sink.append(gap);
        }
        // Sine tone: quick attack, then fade towards silence over the note length.
        let mut tone = SineWave::new(note.frequency_hz)
            .amplify(CHIME_GAIN)
            .take_duration(note.duration);
        tone.set_filter_fadeout();
        sink.append(tone.fade_in(ATTACK));
        cursor = note.offset + note.duration;
    }
    sink.sleep_until_end();
    Ok(())
}

fn play_clip(handle: &OutputStreamHandle, bytes: Vec<u8>) -> VoiceResult<()> {
    let sink = Sink::try_new(handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
    let source = rodio::Decoder::new(Cursor::new(bytes))
        .map_err(|e| VoiceError::Playback(format!("Decode failed: {}", e)))?;
    sink.append(source.convert_samples::<f32>());
    sink.sleep_until_end();
    Ok(())
}

/// Chime through the real audio output.
pub struct RodioChime {
    output: AudioOutput,
}

impl RodioChime {
    pub fn new(output: AudioOutput) -> Self {
        Self { output }
    }
}

#[async_trait]
impl ChimePlayer for RodioChime {
    async fn play(&self, notes: &[ChimeNote]) -> VoiceResult<()> {
        self.output.play_chime(notes).await
    }
}
