//! Root CLI structure, global speech options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use murmur_speech::SpeechConfig;

/// Speak text through a remote text-to-speech service.
#[derive(Debug, Parser)]
#[command(name = "murmur")]
#[command(about = "Queue text for remote speech synthesis and local playback")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub speech: SpeechArgs,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options that shape the [`SpeechConfig`].
///
/// Anything left unset falls back to the `MURMUR_TTS_*` environment
/// variables and then to the built-in defaults.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SpeechArgs {
    /// Base URL of the synthesis service
    #[arg(long = "url", global = true)]
    pub url: Option<String>,

    /// Voice name sent with every request
    #[arg(long = "voice", global = true)]
    pub voice: Option<String>,

    /// Directory for temporary audio files
    #[arg(long = "temp-dir", global = true)]
    pub temp_dir: Option<PathBuf>,

    /// Playback volume from 0.0 (muted) to 1.0 (full)
    #[arg(long = "volume", global = true, env = "MURMUR_VOLUME", default_value_t = 1.0)]
    pub volume: f32,
}

impl SpeechArgs {
    /// Layer the command-line overrides on top of `base`.
    pub fn apply(&self, base: SpeechConfig) -> SpeechConfig {
        let mut config = base;
        if let Some(url) = &self.url {
            config = config.with_base_url(url.as_str());
        }
        if let Some(voice) = &self.voice {
            config = config.with_voice(voice.as_str());
        }
        if let Some(dir) = &self.temp_dir {
            config = config.with_temp_dir(dir.as_path());
        }
        config
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Speak each argument as its own utterance, in order
    Speak {
        /// Texts to speak (utterance ids are 1, 2, ... in argument order)
        #[arg(required = true)]
        texts: Vec<String>,

        /// Discard anything still queued before the first text
        #[arg(long)]
        flush: bool,
    },

    /// Speak each non-empty line read from standard input
    Stdin,
}
