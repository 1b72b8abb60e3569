//! Speech output pipeline.
//!
//! Text utterances are queued, synthesized one at a time by a remote
//! text-to-speech service, and played back in submission order, with
//! `on_start` / `on_done` / `on_error` callbacks per utterance.
//!
//! ```no_run
//! use murmur_speech::{LifecycleCallbacks, QueueMode, SpeechConfig, SpeechPipeline};
//!
//! # async fn demo() -> Result<(), murmur_speech::SpeechError> {
//! let pipeline = SpeechPipeline::with_defaults(&SpeechConfig::from_env())?;
//! pipeline.set_lifecycle_listener(LifecycleCallbacks::new(
//!     |id: &str| println!("start {id}"),
//!     |id: &str| println!("done {id}"),
//!     |id: &str| eprintln!("error {id}"),
//! ));
//! pipeline.speak("Hello there.", QueueMode::Add, "1");
//! pipeline.wait_until_idle().await;
//! pipeline.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod audio_thread;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod playback;
pub mod queue;
pub mod synthesis;

// Re-export key types for convenience
pub use artifact::AudioArtifact;
pub use audio_thread::RodioSink;
pub use config::SpeechConfig;
pub use error::{PlaybackError, SpeechError, SynthesisError};
pub use pipeline::{
    LanguageStatus, LifecycleCallbacks, PlaybackState, SpeakStatus, SpeechPipeline,
    UtteranceListener,
};
pub use playback::{CompletionCallback, PlaybackSink, PlaybackTicket};
pub use queue::{QueueMode, Utterance, UtteranceQueue};
pub use synthesis::{HttpSynthesisClient, SynthesisBackend};
