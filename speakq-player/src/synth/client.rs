//! Synthesis client boundary
//!
//! The speech provider is an external collaborator; this module only fixes
//! its interface. `HttpSynthesisClient` talks to a provider that accepts
//! text + voice parameters and answers with a playable audio locator and a
//! duration estimate. Provider failures surface as `Error::Synthesis` with
//! a human-readable message that ends up on the affected queue item.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Voice parameters for a synthesis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceParams {
    pub voice_id: String,
}

impl VoiceParams {
    pub fn new(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
        }
    }
}

/// Result of a successful synthesis request
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Playable audio reference (URL or file path)
    pub audio_locator: String,

    /// Provider's duration estimate; used when the audio container carries
    /// no duration of its own
    pub estimated_duration_secs: f64,
}

/// Asynchronous, fallible text-to-speech synthesis
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<SynthesizedAudio>;
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    audio_url: String,
    #[serde(default)]
    duration_seconds: f64,
}

/// HTTP synthesis provider client
pub struct HttpSynthesisClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSynthesisClient {
    /// Create a client for a provider endpoint, e.g. `http://localhost:5880`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SynthesisClient for HttpSynthesisClient {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<SynthesizedAudio> {
        let url = format!("{}/synthesize", self.base_url);
        debug!(voice = %voice.voice_id, chars = text.len(), "requesting synthesis");

        let response = self
            .http
            .post(&url)
            .json(&SynthesizeRequest {
                text,
                voice: &voice.voice_id,
            })
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("provider unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match status.as_u16() {
                429 => "provider rate limited".to_string(),
                400..=499 => format!("provider rejected input ({}): {}", status, body),
                _ => format!("provider unavailable ({}): {}", status, body),
            };
            return Err(Error::Synthesis(reason));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Synthesis(format!("malformed provider response: {}", e)))?;

        Ok(SynthesizedAudio {
            audio_locator: parsed.audio_url,
            estimated_duration_secs: parsed.duration_seconds,
        })
    }
}
