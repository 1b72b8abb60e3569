//! Audio playback of synthesized artifacts via `rodio`.
//!
//! [`PlaybackSink`] is the seam the pipeline drives. [`RodioPlayback`] is the
//! device-owning implementation; because the rodio output stream is `!Send`
//! on some platforms it is confined to a dedicated thread and reached through
//! [`RodioSink`](crate::audio_thread::RodioSink).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::error::PlaybackError;

/// Identifies one `start()` → end-of-audio cycle of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackTicket(u64);

impl PlaybackTicket {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Invoked once per cycle that reaches the end of its audio naturally.
///
/// Never invoked for a cycle that was ended by [`PlaybackSink::stop`].
pub type CompletionCallback = Arc<dyn Fn(PlaybackTicket) + Send + Sync + 'static>;

/// The single audio output a pipeline plays through.
///
/// Only the pipeline task calls into a sink, so methods take `&mut self` and
/// implementations need `Send` but not `Sync`.
pub trait PlaybackSink: Send {
    /// Reset any previous playback and attach the audio file at `path`.
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError>;

    /// Play the loaded source from the beginning.
    fn start(&mut self) -> Result<PlaybackTicket, PlaybackError>;

    /// Halt playback immediately. Idempotent.
    fn stop(&mut self);

    /// Whether audio is currently being played.
    fn is_active(&self) -> bool;

    /// Register the natural-completion callback (replaces any previous one).
    fn set_completion_callback(&mut self, callback: CompletionCallback);

    /// Permanently release the output device. The sink is unusable afterwards.
    fn release(&mut self) {
        self.stop();
    }
}

/// Open and probe an audio file for playback.
pub fn decode_file(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path).map_err(|source| PlaybackError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Decides how a started cycle ends: stopped or drained, whichever happens
/// first. Shared between the playback owner and the cycle's watcher thread.
#[derive(Debug, Clone)]
struct CycleGuard {
    ticket: PlaybackTicket,
    running: Arc<AtomicBool>,
}

impl CycleGuard {
    fn new(ticket: PlaybackTicket) -> Self {
        Self {
            ticket,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the cycle stopped. Returns whether it was still running.
    fn cancel(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    /// The audio drained. Fires `on_complete` unless the cycle was cancelled
    /// or already finished; returns whether it fired.
    fn finish(&self, on_complete: Option<&CompletionCallback>) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        tracing::debug!(ticket = self.ticket.get(), "Playback finished naturally");
        if let Some(cb) = on_complete {
            cb(self.ticket);
        }
        true
    }
}

/// A started cycle: the sink playing it and its guard.
struct ActiveCycle {
    sink: Arc<Sink>,
    guard: CycleGuard,
}

/// Device-owning playback. Lives on the audio thread only.
pub struct RodioPlayback {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// Decoded source waiting for `start()`.
    loaded: Option<Decoder<BufReader<File>>>,

    /// The cycle most recently started, if any.
    current: Option<ActiveCycle>,

    last_ticket: PlaybackTicket,
    on_complete: Option<CompletionCallback>,
    volume: f32,
}

impl RodioPlayback {
    /// Open the default output device.
    pub fn new() -> Result<Self, PlaybackError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| PlaybackError::OutputStream(e.to_string()))?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            loaded: None,
            current: None,
            last_ticket: PlaybackTicket::new(0),
            on_complete: None,
            volume: 1.0,
        })
    }

    pub fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        self.stop();
        self.loaded = Some(decode_file(path)?);
        tracing::debug!(path = %path.display(), "Audio source loaded");
        Ok(())
    }

    pub fn start(&mut self) -> Result<PlaybackTicket, PlaybackError> {
        let source = self.loaded.take().ok_or(PlaybackError::NothingLoaded)?;
        self.stop();

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| PlaybackError::OutputStream(e.to_string()))?;
        sink.set_volume(self.volume);
        sink.append(source);

        let ticket = self.last_ticket.next();
        let cycle = ActiveCycle {
            sink: Arc::new(sink),
            guard: CycleGuard::new(ticket),
        };
        self.spawn_completion_watcher(&cycle)?;
        self.current = Some(cycle);
        self.last_ticket = ticket;

        tracing::debug!(ticket = ticket.get(), "Audio playback started");
        Ok(ticket)
    }

    /// Block a helper thread until the cycle's sink drains. If the cycle was
    /// not stopped in the meantime, report natural completion.
    fn spawn_completion_watcher(&self, cycle: &ActiveCycle) -> Result<(), PlaybackError> {
        let sink = Arc::clone(&cycle.sink);
        let guard = cycle.guard.clone();
        let on_complete = self.on_complete.clone();

        // `sleep_until_end()` also returns when `stop()` drops the queued
        // sources; the guard tells the two cases apart.
        std::thread::Builder::new()
            .name("murmur-playback-watch".into())
            .spawn(move || {
                sink.sleep_until_end();
                guard.finish(on_complete.as_ref());
            })
            .map(|_| ())
            .map_err(|e| PlaybackError::OutputStream(format!("failed to spawn watcher: {e}")))
    }

    pub fn stop(&mut self) {
        self.loaded = None;
        if let Some(cycle) = self.current.take() {
            // Cancel first so the watcher sees a stop, not an ending.
            let was_running = cycle.guard.cancel();
            cycle.sink.stop();
            if was_running {
                tracing::debug!("Audio playback stopped");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.guard.is_running() && !c.sink.empty())
    }

    pub fn set_completion_callback(&mut self, callback: CompletionCallback) {
        self.on_complete = Some(callback);
    }

    /// Set playback volume (0.0 = muted, 1.0 = full).
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(cycle) = &self.current {
            cycle.sink.set_volume(self.volume);
        }
    }
}
