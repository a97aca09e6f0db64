//! **Speech**: the spoken half of an announcement.
//!
//! [`Speaker`] is what the sequencer talks to. A runtime without any speech support
//! uses [`SilentSpeaker`], which reports itself unavailable so announcements complete
//! silently. With the `audio` feature, [`TtsSpeaker`] synthesizes through an
//! OpenAI-compatible `/audio/speech` endpoint ([`HttpTts`]) and plays the result on the
//! shared audio output.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A voice offered by a speech backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    /// BCP-47 tag, e.g. `id-ID`.
    pub lang: String,
}

/// Text plus delivery settings for one announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// `None` lets the backend use its default voice.
    pub voice: Option<String>,
}

#[async_trait]
pub trait Speaker: Send + Sync {
    /// `false` when the runtime has no speech at all; the sequencer then skips speaking.
    fn is_available(&self) -> bool {
        true
    }

    /// Voices this speaker can use.
    fn voices(&self) -> Vec<VoiceInfo> {
        Vec::new()
    }

    /// Speak and return once the utterance has finished (or failed).
    async fn speak(&self, utterance: &Utterance) -> VoiceResult<()>;
}

/// No speech synthesis in this runtime.
#[derive(Debug, Default)]
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    fn is_available(&self) -> bool {
        false
    }

    async fn speak(&self, _utterance: &Utterance) -> VoiceResult<()> {
        Err(VoiceError::Unavailable("no speech backend configured".to_string()))
    }
}

/// Backend that turns an utterance into encoded audio bytes (WAV).
#[async_trait]
pub trait TtsBackend: Send + Sync {
    async fn synthesize(&self, utterance: &Utterance) -> VoiceResult<Vec<u8>>;
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

/// `[tts]` section of the display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_tts_model")]
    pub model: String,
    /// Voice used when no locale voice matches.
    #[serde(default = "default_tts_voice")]
    pub default_voice: String,
    /// Voices offered for locale matching.
    #[serde(default)]
    pub voices: Vec<VoiceInfo>,
}

/// OpenAI-compatible speech endpoint.
#[derive(Debug, Clone)]
pub struct HttpTts {
    config: TtsConfig,
    client: reqwest::Client,
}

impl HttpTts {
    pub fn new(config: TtsConfig) -> VoiceResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(VoiceError::Config("tts.base_url is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.config.voices.clone()
    }

    fn request_body(&self, utterance: &Utterance) -> serde_json::Value {
        let voice = utterance
            .voice
            .clone()
            .unwrap_or_else(|| self.config.default_voice.clone());
        serde_json::json!({
            "model": self.config.model,
            "input": utterance.text,
            "voice": voice,
            "speed": utterance.rate,
            "response_format": "wav",
        })
    }
}

#[async_trait]
impl TtsBackend for HttpTts {
    async fn synthesize(&self, utterance: &Utterance) -> VoiceResult<Vec<u8>> {
        let text = utterance.text.trim();
        if text.is_empty() {
            return Err(VoiceError::Tts("empty announcement text".to_string()));
        }
        let url = format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'));
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(utterance))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        Ok(res.bytes().await?.to_vec())
    }
}

#[cfg(feature = "audio")]
pub use tts_speaker::TtsSpeaker;

#[cfg(feature = "audio")]
mod tts_speaker {
    use super::*;
    use crate::playback::AudioOutput;
    use std::sync::Arc;

    /// Synthesize with a [`TtsBackend`] and play through the shared [`AudioOutput`].
    pub struct TtsSpeaker {
        backend: Arc<dyn TtsBackend>,
        output: AudioOutput,
        voices: Vec<VoiceInfo>,
    }

    impl TtsSpeaker {
        pub fn new(backend: Arc<dyn TtsBackend>, output: AudioOutput, voices: Vec<VoiceInfo>) -> Self {
            Self {
                backend,
                output,
                voices,
            }
        }
    }

    #[async_trait]
    impl Speaker for TtsSpeaker {
        fn voices(&self) -> Vec<VoiceInfo> {
            self.voices.clone()
        }

        async fn speak(&self, utterance: &Utterance) -> VoiceResult<()> {
            let bytes = self.backend.synthesize(utterance).await?;
            self.output.play_clip(bytes).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TtsConfig {
        TtsConfig {
            base_url: "http://localhost:9/v1/".to_string(),
            api_key: "test".to_string(),
            model: default_tts_model(),
            default_voice: default_tts_voice(),
            voices: vec![VoiceInfo {
                name: "nova".into(),
                lang: "id-ID".into(),
            }],
        }
    }

    fn utterance(voice: Option<&str>) -> Utterance {
        Utterance {
            text: "Nomor antrian A, nol, nol, satu".into(),
            lang: "id-ID".into(),
            rate: 0.85,
            pitch: 1.0,
            volume: 1.0,
            voice: voice.map(str::to_string),
        }
    }

    #[test]
    fn request_uses_default_voice_when_none_selected() {
        let tts = HttpTts::new(config()).unwrap();
        let body = tts.request_body(&utterance(None));
        assert_eq!(body["voice"], "alloy");
        assert_eq!(body["model"], "tts-1");

        let body = tts.request_body(&utterance(Some("nova")));
        assert_eq!(body["voice"], "nova");
        assert!((body["speed"].as_f64().unwrap() - 0.85).abs() < 1e-6);
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let mut cfg = config();
        cfg.base_url = "  ".into();
        assert!(matches!(HttpTts::new(cfg), Err(VoiceError::Config(_))));
    }

    #[tokio::test]
    async fn empty_text_is_an_error() {
        let tts = HttpTts::new(config()).unwrap();
        let mut blank = utterance(None);
        blank.text = "   ".into();
        assert!(matches!(tts.synthesize(&blank).await, Err(VoiceError::Tts(_))));
    }

    #[tokio::test]
    async fn silent_speaker_reports_unavailable() {
        let speaker = SilentSpeaker;
        assert!(!speaker.is_available());
        assert!(speaker.speak(&utterance(None)).await.is_err());
    }
}
