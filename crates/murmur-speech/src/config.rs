//! Pipeline configuration.
//!
//! Use the builder methods to customize the defaults, or [`SpeechConfig::from_env`]
//! to pick up overrides from the environment.
//!
//! ```
//! use murmur_speech::SpeechConfig;
//! use std::time::Duration;
//!
//! let config = SpeechConfig::new()
//!     .with_base_url("http://tts.local:9000")
//!     .with_timeout(Duration::from_secs(20));
//! assert_eq!(config.endpoint(), "http://tts.local:9000/api/tts");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Default synthesis service location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// The single voice the pipeline requests.
pub const DEFAULT_VOICE: &str = "en-US-AvaMultilingualNeural";

/// Path of the synthesis route below the base URL.
pub const SYNTHESIS_PATH: &str = "/api/tts";

const ENV_URL: &str = "MURMUR_TTS_URL";
const ENV_VOICE: &str = "MURMUR_TTS_VOICE";
const ENV_TEMP_DIR: &str = "MURMUR_TTS_TEMP_DIR";
const ENV_TIMEOUT_MS: &str = "MURMUR_TTS_TIMEOUT_MS";

/// Configuration for a [`SpeechPipeline`](crate::SpeechPipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Base URL of the synthesis service (without the `/api/tts` suffix).
    pub base_url: String,

    /// Voice identifier sent with every request.
    pub voice: String,

    /// Directory for per-utterance audio artifacts.
    pub temp_dir: PathBuf,

    /// User agent string for synthesis requests.
    pub user_agent: String,

    /// Overall request timeout. `None` waits for the network stack to give up.
    pub request_timeout: Option<Duration>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            temp_dir: std::env::temp_dir(),
            user_agent: concat!("murmur-speech/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: None,
        }
    }
}

impl SpeechConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `MURMUR_TTS_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(voice) = lookup(ENV_VOICE).filter(|v| !v.trim().is_empty()) {
            self.voice = voice;
        }
        if let Some(dir) = lookup(ENV_TEMP_DIR).filter(|v| !v.trim().is_empty()) {
            self.temp_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.request_timeout = None,
                Ok(ms) => self.request_timeout = Some(Duration::from_millis(ms)),
                Err(e) => tracing::warn!(
                    key = ENV_TIMEOUT_MS,
                    value = %raw,
                    error = %e,
                    "Ignoring malformed timeout override"
                ),
            }
        }
        self
    }

    /// Set the base URL of the synthesis service.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the voice identifier.
    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Set the directory for audio artifacts.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Full URL of the synthesis route.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{SYNTHESIS_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// Check that the endpoint is a usable http(s) URL.
    pub fn validate(&self) -> Result<(), SpeechError> {
        let endpoint = self.endpoint();
        let url = url::Url::parse(&endpoint)
            .map_err(|e| SpeechError::Config(format!("invalid base URL '{}': {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(SpeechError::Config(format!(
                "unsupported URL scheme '{other}' in '{}'",
                self.base_url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SpeechConfig::new();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.voice, "en-US-AvaMultilingualNeural");
        assert!(config.user_agent.starts_with("murmur-speech/"));
        assert!(config.request_timeout.is_none());
        assert_eq!(config.endpoint(), "http://localhost:8080/api/tts");
    }

    #[test]
    fn test_builder_pattern() {
        let config = SpeechConfig::new()
            .with_base_url("https://speech.example/")
            .with_voice("en-GB-SoniaNeural")
            .with_temp_dir("/var/tmp/murmur")
            .with_user_agent("test-agent")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.endpoint(), "https://speech.example/api/tts");
        assert_eq!(config.voice, "en-GB-SoniaNeural");
        assert_eq!(config.temp_dir, PathBuf::from("/var/tmp/murmur"));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_env_overrides() {
        let config = SpeechConfig::default().with_env_overrides(lookup_from(&[
            (ENV_URL, "http://10.0.0.2:8080"),
            (ENV_VOICE, "de-DE-KatjaNeural"),
            (ENV_TIMEOUT_MS, "2500"),
        ]));
        assert_eq!(config.base_url, "http://10.0.0.2:8080");
        assert_eq!(config.voice, "de-DE-KatjaNeural");
        assert_eq!(config.request_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_malformed_env_values_are_ignored() {
        let config = SpeechConfig::default().with_env_overrides(lookup_from(&[
            (ENV_URL, "   "),
            (ENV_TIMEOUT_MS, "soon"),
        ]));
        assert_eq!(config, SpeechConfig::default());
    }

    #[test]
    fn test_validate() {
        assert!(SpeechConfig::new().validate().is_ok());
        assert!(matches!(
            SpeechConfig::new().with_base_url("not a url").validate(),
            Err(SpeechError::Config(_))
        ));
        assert!(matches!(
            SpeechConfig::new().with_base_url("ftp://host").validate(),
            Err(SpeechError::Config(_))
        ));
    }
}
