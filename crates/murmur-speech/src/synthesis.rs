//! Remote speech synthesis.
//!
//! One POST per utterance to `<base_url>/api/tts` with a `{text, voice}` JSON
//! body. A 2xx response carries compressed audio, which is buffered in full and
//! written to an [`AudioArtifact`] before the call returns.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::artifact::AudioArtifact;
use crate::config::SpeechConfig;
use crate::error::{SpeechError, SynthesisError};

/// Backend-agnostic text-to-audio fetch.
///
/// The pipeline only sees this trait, so tests and alternative services can
/// be injected without touching the orchestrator.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize `text` with `voice` into a local audio artifact.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioArtifact, SynthesisError>;
}

/// Wire format of a synthesis request.
#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

/// [`SynthesisBackend`] backed by the HTTP synthesis service.
#[derive(Debug, Clone)]
pub struct HttpSynthesisClient {
    client: reqwest::Client,
    endpoint: String,
    temp_dir: PathBuf,
}

impl HttpSynthesisClient {
    pub fn new(config: &SpeechConfig) -> Result<Self, SpeechError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SynthesisError::from)?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            temp_dir: config.temp_dir.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SynthesisBackend for HttpSynthesisClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioArtifact, SynthesisError> {
        tracing::info!(
            endpoint = %self.endpoint,
            voice,
            chars = text.chars().count(),
            "Requesting speech synthesis"
        );

        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&SynthesisRequest { text, voice })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(SynthesisError::EmptyBody {
                url: self.endpoint.clone(),
            });
        }

        tracing::debug!(bytes = body.len(), "Synthesis response received");
        AudioArtifact::write(&self.temp_dir, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_text_and_voice() {
        let json = serde_json::to_value(SynthesisRequest {
            text: "hello",
            voice: "en-US-AvaMultilingualNeural",
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "hello", "voice": "en-US-AvaMultilingualNeural"})
        );
    }

    #[test]
    fn client_targets_tts_route() {
        let client =
            HttpSynthesisClient::new(&SpeechConfig::new().with_base_url("http://127.0.0.1:9/"))
                .unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/api/tts");
    }

    #[test]
    fn client_rejects_invalid_base_url() {
        let err = HttpSynthesisClient::new(&SpeechConfig::new().with_base_url("::nope")).unwrap_err();
        assert!(matches!(err, SpeechError::Config(_)));
    }
}
