//! Speech pipeline error types.
//!
//! None of these are fatal to a running pipeline: the orchestrator turns every
//! per-utterance failure into an `on_error` lifecycle event and moves on to the
//! next queued utterance. The detail is only visible in the logs.

use std::path::PathBuf;

/// Failures while fetching audio for one utterance.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The request never produced a response (DNS, connect, reset, timeout).
    #[error("Synthesis request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Synthesis service returned status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The endpoint that was called
        url: String,
    },

    /// The service answered 2xx but sent no audio.
    #[error("Synthesis service returned an empty body: {url}")]
    EmptyBody {
        /// The endpoint that was called
        url: String,
    },

    /// Writing the response body to a temporary artifact failed.
    #[error("Failed to store synthesized audio: {0}")]
    Storage(#[from] std::io::Error),

    /// The synthesis task was torn down before it could report.
    #[error("Synthesis cancelled")]
    Cancelled,
}

/// Failures while loading or starting an audio artifact.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The artifact could not be opened.
    #[error("Cannot read audio file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The artifact is not in a format the decoder understands.
    #[error("Cannot decode audio file {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The output device or a playback sink could not be opened.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// `start` was called without a successful `load`.
    #[error("No audio source loaded")]
    NothingLoaded,

    /// The dedicated audio thread has exited (released or panicked).
    #[error("Audio thread is no longer running")]
    AudioThreadDied,
}

/// Crate-level error for constructing and driving a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Invalid configuration (unparseable base URL, unsupported scheme).
    #[error("Invalid speech configuration: {0}")]
    Config(String),

    /// The pipeline has been shut down and no longer accepts commands.
    #[error("Speech pipeline has been shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_names_status_and_url() {
        let error = SynthesisError::Status {
            status: 500,
            url: "http://localhost:8080/api/tts".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("/api/tts"));
    }

    #[test]
    fn storage_error_converts_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error: SynthesisError = io.into();
        assert!(matches!(error, SynthesisError::Storage(_)));
        assert!(error.to_string().contains("read-only"));
    }

    #[test]
    fn speech_error_is_transparent_over_playback() {
        let error: SpeechError = PlaybackError::NothingLoaded.into();
        assert_eq!(error.to_string(), "No audio source loaded");
    }

    #[test]
    fn decode_error_mentions_path() {
        let error = PlaybackError::Decode {
            path: PathBuf::from("/tmp/tts_abc.mp3"),
            message: "unrecognized format".to_string(),
        };
        assert!(error.to_string().contains("tts_abc.mp3"));
    }
}
