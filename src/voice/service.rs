//! Text-to-speech through the VOICEVOX engine.

use std::time::Duration;

use axum::body::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::config::SettingsHandle;
use crate::engine::{EngineError, VoicevoxClient};
use crate::observability::metrics;
use crate::voice::analyzer::{self, Analysis, Prosody};
use crate::voice::VoiceError;

const CONNECTION_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// A synthesis request as accepted by the voice routes.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    #[serde(default = "default_emotion")]
    pub emotion: String,
    #[serde(default = "default_speaker_id")]
    pub speaker_id: Option<u32>,
}

fn default_emotion() -> String {
    "normal".to_string()
}

fn default_speaker_id() -> Option<u32> {
    Some(8)
}

/// Voice synthesis and duplicate suppression.
pub struct VoiceService {
    client: VoicevoxClient,
    settings: SettingsHandle,
    recent: DashMap<String, (String, Instant)>,
}

impl VoiceService {
    pub fn new(client: VoicevoxClient, settings: SettingsHandle) -> Self {
        Self {
            client,
            settings,
            recent: DashMap::new(),
        }
    }

    /// Build a service from the current settings snapshot.
    pub fn from_settings(http: reqwest::Client, settings: SettingsHandle) -> Result<Self, VoiceError> {
        let client = VoicevoxClient::from_config(http, &settings.load().voicevox)?;
        tracing::debug!(host = %client.base_url(), "Voice service created");
        Ok(Self::new(client, settings))
    }

    /// Synthesize `request.text` to WAV.
    ///
    /// The emotion selects a prosody preset; the speaker falls back to the
    /// configured default.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, VoiceError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(VoiceError::EmptyText);
        }

        let settings = self.settings.load();
        let speaker = request.speaker_id.unwrap_or(settings.voicevox.speaker);
        let prosody = Prosody::from(settings.voice.preset(&request.emotion));

        let audio = self.render(text, speaker, &prosody).await?;
        tracing::info!(
            speaker,
            emotion = %request.emotion,
            bytes = audio.len(),
            "Synthesized speech"
        );
        Ok(audio)
    }

    /// Synthesize `text` with prosody chosen by the emotion analyzer.
    pub async fn synthesize_analyzed(
        &self,
        text: &str,
        speaker_id: Option<u32>,
    ) -> Result<(Bytes, Analysis), VoiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::EmptyText);
        }

        let settings = self.settings.load();
        let speaker = speaker_id.unwrap_or(settings.voicevox.speaker);
        let analysis = analyzer::analyze(text, |emotion| settings.voice.preset(emotion));

        let audio = self.render(text, speaker, &analysis.parameters).await?;
        tracing::info!(
            speaker,
            emotion = analysis.emotion,
            bytes = audio.len(),
            "Synthesized analyzed speech"
        );
        Ok((audio, analysis))
    }

    async fn render(&self, text: &str, speaker: u32, prosody: &Prosody) -> Result<Bytes, EngineError> {
        let started = Instant::now();
        let result = async {
            let mut query = self.client.audio_query(text, speaker).await?;
            apply_prosody(&mut query, prosody);
            self.client.synthesis(&query, speaker).await
        }
        .await;
        metrics::record_synthesis(result.is_ok(), started.elapsed());
        result
    }

    /// Engine version, if reachable.
    pub async fn check_connection(&self) -> Result<String, VoiceError> {
        Ok(self.client.version(CONNECTION_CHECK_TIMEOUT).await?)
    }

    /// True if the same `message` of `kind` was seen within `cooldown`.
    /// Otherwise records it and returns false.
    pub fn is_duplicate(&self, kind: &str, message: &str, cooldown: Duration) -> bool {
        let now = Instant::now();
        // The entry holds the shard lock, so check and record are one step.
        match self.recent.entry(kind.to_string()) {
            Entry::Occupied(mut entry) => {
                let (last_message, seen_at) = entry.get();
                if last_message == message && now.duration_since(*seen_at) < cooldown {
                    tracing::debug!(kind, message, "Suppressed duplicate voice line");
                    return true;
                }
                entry.insert((message.to_string(), now));
            }
            Entry::Vacant(entry) => {
                entry.insert((message.to_string(), now));
            }
        }
        false
    }
}

/// Write prosody into an engine audio query.
pub fn apply_prosody(query: &mut Value, prosody: &Prosody) {
    if let Some(fields) = query.as_object_mut() {
        fields.insert("speedScale".to_string(), json!(prosody.speed_scale));
        fields.insert("pitchScale".to_string(), json!(prosody.pitch_scale));
        fields.insert("intonationScale".to_string(), json!(prosody.intonation_scale));
        fields.insert("volumeScale".to_string(), json!(prosody.volume_scale));
    }
}
