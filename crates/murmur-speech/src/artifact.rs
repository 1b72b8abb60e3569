//! Per-utterance audio artifacts.
//!
//! Playback needs file-backed access, so every synthesized response is
//! written to its own temporary file. An [`AudioArtifact`] owns that file:
//! [`discard`](AudioArtifact::discard) deletes it, and dropping an artifact
//! that was never discarded deletes it as well. Either way the file is
//! removed exactly once.

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;

use crate::error::SynthesisError;

const ARTIFACT_PREFIX: &str = "tts_";
const ARTIFACT_SUFFIX: &str = ".mp3";

/// A temporary audio file backing one utterance's playback.
#[derive(Debug)]
pub struct AudioArtifact {
    path: TempPath,
}

impl AudioArtifact {
    /// Write `audio` to a uniquely named file in `dir`.
    ///
    /// The write runs on the blocking pool. The file is flushed, synced and
    /// closed before this returns.
    pub async fn write<B>(dir: &Path, audio: B) -> Result<Self, SynthesisError>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || Self::write_blocking(&dir, audio.as_ref()))
            .await
            .map_err(|_| SynthesisError::Cancelled)?
            .map_err(SynthesisError::Storage)
    }

    /// Synchronous variant of [`write`](Self::write).
    pub fn write_blocking(dir: &Path, audio: &[u8]) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(ARTIFACT_SUFFIX)
            .tempfile_in(dir)?;
        file.write_all(audio)?;
        file.flush()?;
        file.as_file().sync_all()?;

        // Closes the handle; the path keeps delete-on-drop semantics.
        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), bytes = audio.len(), "Audio artifact written");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file.
    pub fn discard(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => tracing::debug!(path = %shown, "Audio artifact deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %shown, "Audio artifact already gone");
            }
            Err(e) => {
                tracing::error!(path = %shown, error = %e, "Failed to delete audio artifact");
            }
        }
    }
}
