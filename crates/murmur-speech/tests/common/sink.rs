//! Scriptable [`PlaybackSink`] that never touches an audio device.
//!
//! Playback only "ends" when the test calls [`SinkProbe::finish`], so every
//! interleaving of completion, stop and new work can be forced explicitly.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use murmur_speech::{CompletionCallback, PlaybackError, PlaybackSink, PlaybackTicket};

/// One call the pipeline made into the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Load(PathBuf),
    Start(PlaybackTicket),
    Stop,
    Release,
}

#[derive(Default)]
struct SinkState {
    calls: Vec<SinkCall>,
    last_ticket: u64,
    playing: Option<PlaybackTicket>,
    loaded: Option<PathBuf>,
    callback: Option<CompletionCallback>,
    fail_next_load: bool,
    fail_next_start: bool,
    overlapping_starts: usize,
}

/// Test-side view of a [`MockSink`].
#[derive(Clone, Default)]
pub struct SinkProbe {
    state: Arc<Mutex<SinkState>>,
}

impl SinkProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sink half, to hand to the pipeline.
    pub fn sink(&self) -> Box<dyn PlaybackSink> {
        Box::new(MockSink {
            state: Arc::clone(&self.state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock().calls.clone()
    }

    /// Paths passed to `load`, in order.
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::Load(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of successful `start` calls.
    pub fn starts(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SinkCall::Start(_)))
            .count()
    }

    pub fn stops(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SinkCall::Stop))
            .count()
    }

    pub fn released(&self) -> bool {
        self.lock().calls.contains(&SinkCall::Release)
    }

    /// Starts issued while a previous cycle was still playing.
    pub fn overlapping_starts(&self) -> usize {
        self.lock().overlapping_starts
    }

    /// Ticket of the cycle currently playing.
    pub fn current(&self) -> Option<PlaybackTicket> {
        self.lock().playing
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing.is_some()
    }

    pub fn fail_next_load(&self) {
        self.lock().fail_next_load = true;
    }

    pub fn fail_next_start(&self) {
        self.lock().fail_next_start = true;
    }

    /// End the current cycle naturally, as the device would at end of audio.
    pub fn finish(&self) {
        let (ticket, callback) = {
            let mut state = self.lock();
            let ticket = state
                .playing
                .take()
                .expect("finish() called with nothing playing");
            (ticket, state.callback.clone())
        };
        if let Some(cb) = callback {
            cb(ticket);
        }
    }

    /// Deliver a completion for an arbitrary ticket (e.g. a stale one).
    pub fn fire(&self, ticket: PlaybackTicket) {
        let callback = self.lock().callback.clone();
        if let Some(cb) = callback {
            cb(ticket);
        }
    }
}

/// Pipeline-side half of a [`SinkProbe`].
pub struct MockSink {
    state: Arc<Mutex<SinkState>>,
}

impl MockSink {
    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap()
    }
}

impl PlaybackSink for MockSink {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Load(path.to_path_buf()));
        state.playing = None;
        if std::mem::take(&mut state.fail_next_load) {
            state.loaded = None;
            return Err(PlaybackError::Decode {
                path: path.to_path_buf(),
                message: "scripted load failure".into(),
            });
        }
        assert!(path.exists(), "loaded artifact {} does not exist", path.display());
        state.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn start(&mut self) -> Result<PlaybackTicket, PlaybackError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_start) {
            return Err(PlaybackError::OutputStream("scripted start failure".into()));
        }
        if state.loaded.take().is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        if state.playing.is_some() {
            state.overlapping_starts += 1;
        }
        state.last_ticket += 1;
        let ticket = PlaybackTicket::new(state.last_ticket);
        state.playing = Some(ticket);
        state.calls.push(SinkCall::Start(ticket));
        Ok(ticket)
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.calls.push(SinkCall::Stop);
        state.playing = None;
        state.loaded = None;
    }

    fn is_active(&self) -> bool {
        self.lock().playing.is_some()
    }

    fn set_completion_callback(&mut self, callback: CompletionCallback) {
        self.lock().callback = Some(callback);
    }

    fn release(&mut self) {
        let mut state = self.lock();
        state.playing = None;
        state.loaded = None;
        state.calls.push(SinkCall::Release);
    }
}
