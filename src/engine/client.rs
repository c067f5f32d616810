//! HTTP client for the VOICEVOX engine API.

use std::time::Duration;

use axum::body::Bytes;
use serde_json::Value;
use url::Url;

use crate::config::VoicevoxConfig;
use crate::engine::EngineError;

/// Thin client over the engine endpoints used by the backend.
#[derive(Clone, Debug)]
pub struct VoicevoxClient {
    http: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl VoicevoxClient {
    /// Create a client for `host` (e.g. "http://127.0.0.1:50021").
    pub fn new(http: reqwest::Client, host: &str, timeout: Duration) -> Result<Self, EngineError> {
        Url::parse(host).map_err(|e| EngineError::InvalidHost {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            base: host.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(http: reqwest::Client, config: &VoicevoxConfig) -> Result<Self, EngineError> {
        Self::new(
            http,
            &config.host,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// Engine version. Doubles as the liveness probe.
    pub async fn version(&self, timeout: Duration) -> Result<String, EngineError> {
        let response = self
            .http
            .get(self.url("version"))
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Status {
                endpoint: "version",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(body.trim().trim_matches('"').to_string())
    }

    /// Build a synthesis query for `text`.
    pub async fn audio_query(&self, text: &str, speaker: u32) -> Result<Value, EngineError> {
        let speaker = speaker.to_string();
        let response = self
            .http
            .post(self.url("audio_query"))
            .query(&[("text", text), ("speaker", speaker.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Status {
                endpoint: "audio_query",
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// Render a query to WAV audio.
    pub async fn synthesis(&self, query: &Value, speaker: u32) -> Result<Bytes, EngineError> {
        let response = self
            .http
            .post(self.url("synthesis"))
            .query(&[("speaker", speaker)])
            .json(query)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Status {
                endpoint: "synthesis",
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_host() {
        let err = VoicevoxClient::new(reqwest::Client::new(), "not a url", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidHost { .. }));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = VoicevoxClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:50021/",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:50021");
        assert_eq!(client.url("version"), "http://127.0.0.1:50021/version");
    }
}
