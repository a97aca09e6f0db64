//! Public display runner. Follows the gateway's queue state and announces each call.
//! Run next to a gateway: cargo run --bin display (add --features audio for speakers)

use antrian_core::{load_layered, QueueClient, QueueFollower, QueueState, StateSource};
use antrian_voice::{
    AnnouncementSequencer, AnnouncerConfig, ChimePlayer, SilentChime, SilentSpeaker, Speaker,
    TtsConfig,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Deserialize)]
struct DisplayConfig {
    gateway_url: String,
    poll_interval_ms: u64,
    sound_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DisplayRunnerConfig {
    display: DisplayConfig,
    #[serde(default)]
    announcer: AnnouncerConfig,
    #[serde(default)]
    tts: Option<TtsConfig>,
}

impl DisplayRunnerConfig {
    fn load() -> antrian_core::QueueResult<Self> {
        let builder = config::Config::builder()
            .set_default("display.gateway_url", "http://127.0.0.1:8000")?
            .set_default("display.poll_interval_ms", 500_i64)?
            .set_default("display.sound_enabled", true)?;
        load_layered(builder)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DisplayRunnerConfig::load()?;
    let client = QueueClient::new(config.display.gateway_url.clone())?;
    tracing::info!(
        "[ANTRIAN DISPLAY] following {} every {}ms",
        client.base_url(),
        config.display.poll_interval_ms
    );

    let (chime, speaker) = audio_backends(config.tts.clone());
    let sequencer = AnnouncementSequencer::spawn(config.announcer.clone(), chime, speaker);
    sequencer.set_enabled(config.display.sound_enabled);

    let follower = Arc::new(QueueFollower::new());
    let mut updates = follower.subscribe();
    let source: Arc<dyn StateSource> = Arc::new(client);
    let interval = Duration::from_millis(config.display.poll_interval_ms.max(50));
    let poller = {
        let follower = Arc::clone(&follower);
        tokio::spawn(async move { follower.run(source, interval, None).await })
    };

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(state) = latest {
                    render_board(&state);
                    sequencer.observe(&state);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("[ANTRIAN DISPLAY] shutting down");
                break;
            }
        }
    }

    poller.abort();
    sequencer.shutdown().await;
    Ok(())
}

fn render_board(state: &QueueState) {
    let board = state
        .counters
        .iter()
        .filter(|c| c.is_active)
        .map(|c| format!("{} {}", c.name, c.ticket()))
        .collect::<Vec<_>>()
        .join(" | ");
    tracing::info!(version = state.version, "[ANTRIAN DISPLAY] {}", board);
}

#[cfg(feature = "audio")]
fn audio_backends(tts: Option<TtsConfig>) -> (Arc<dyn ChimePlayer>, Arc<dyn Speaker>) {
    use antrian_voice::{AudioOutput, HttpTts, RodioChime, TtsSpeaker};

    let output = match AudioOutput::open() {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("[ANTRIAN DISPLAY] no audio output, announcing silently: {}", e);
            return (Arc::new(SilentChime), Arc::new(SilentSpeaker));
        }
    };
    let chime: Arc<dyn ChimePlayer> = Arc::new(RodioChime::new(output.clone()));
    let speaker: Arc<dyn Speaker> = match tts.map(HttpTts::new) {
        Some(Ok(tts)) => {
            let voices = tts.voices();
            Arc::new(TtsSpeaker::new(Arc::new(tts), output, voices))
        }
        Some(Err(e)) => {
            tracing::warn!("[ANTRIAN DISPLAY] TTS disabled: {}", e);
            Arc::new(SilentSpeaker)
        }
        None => {
            tracing::info!("[ANTRIAN DISPLAY] no [tts] configured, chime only");
            Arc::new(SilentSpeaker)
        }
    };
    (chime, speaker)
}

#[cfg(not(feature = "audio"))]
fn audio_backends(tts: Option<TtsConfig>) -> (Arc<dyn ChimePlayer>, Arc<dyn Speaker>) {
    if tts.is_some() {
        tracing::warn!("[ANTRIAN DISPLAY] [tts] ignored: built without the audio feature");
    }
    (Arc::new(SilentChime), Arc::new(SilentSpeaker))
}
