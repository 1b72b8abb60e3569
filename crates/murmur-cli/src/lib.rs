//! Command-line front end for the murmur speech pipeline.
//!
//! `main.rs` is the composition root; argument parsing lives in [`parser`]
//! and command bodies in [`handlers`].

pub mod handlers;
pub mod parser;

pub use parser::{Cli, Commands, SpeechArgs};
