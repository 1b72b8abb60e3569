//! Dedicated audio thread: isolates the `!Send` rodio output stream from the
//! async runtime.
//!
//! [`RodioSink`] is the `Send` proxy the pipeline holds. Every
//! [`PlaybackSink`] call is turned into an [`AudioCommand`] for the thread that
//! owns [`RodioPlayback`], and request/reply calls block the caller until the
//! thread answers (microseconds of local channel I/O plus the audio
//! operation itself).

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use crate::error::PlaybackError;
use crate::playback::{CompletionCallback, PlaybackSink, PlaybackTicket, RodioPlayback};

/// A command sent from the pipeline to the audio thread.
enum AudioCommand {
    /// Reset and attach a new audio file.
    Load {
        path: PathBuf,
        reply: mpsc::Sender<Result<(), PlaybackError>>,
    },

    /// Start playing the loaded source.
    Start {
        reply: mpsc::Sender<Result<PlaybackTicket, PlaybackError>>,
    },

    /// Stop any active playback immediately (fire-and-forget).
    Stop,

    /// Query whether audio is currently playing.
    IsActive { reply: mpsc::Sender<bool> },

    /// Install the natural-completion callback.
    SetCompletionCallback(CompletionCallback),

    /// Adjust output volume.
    SetVolume(f32),

    /// Shut down the audio thread, releasing the output device.
    Shutdown,
}

/// `Send` handle to the dedicated audio thread.
pub struct RodioSink {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioSink {
    /// Spawn the audio thread, open the default output device and return the
    /// handle. Device errors are reported back through a one-shot init channel.
    pub fn open() -> Result<Self, PlaybackError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), PlaybackError>>();

        let thread = thread::Builder::new()
            .name("murmur-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| PlaybackError::OutputStream(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| PlaybackError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// Set playback volume (0.0 = muted, 1.0 = full).
    pub fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(AudioCommand::SetVolume(volume));
    }

    /// Send a command that expects a `Result` reply and wait for it.
    fn send_and_recv<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<Result<T, PlaybackError>>) -> AudioCommand,
    ) -> Result<T, PlaybackError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| PlaybackError::AudioThreadDied)?;
        rx.recv().map_err(|_| PlaybackError::AudioThreadDied)?
    }

    /// Like `send_and_recv` but for bare-value queries. `None` if the thread is gone.
    fn query<T>(&self, build: impl FnOnce(mpsc::Sender<T>) -> AudioCommand) -> Option<T> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx.send(build(tx)).ok()?;
        rx.recv().ok()
    }

    fn shutdown_thread(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Body of the audio thread. Owns `RodioPlayback` for its whole lifetime.
    fn run(
        cmd_rx: &mpsc::Receiver<AudioCommand>,
        init_tx: &mpsc::Sender<Result<(), PlaybackError>>,
    ) {
        let mut playback = match RodioPlayback::new() {
            Ok(p) => p,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Load { path, reply } => {
                    let _ = reply.send(playback.load(&path));
                }
                AudioCommand::Start { reply } => {
                    let _ = reply.send(playback.start());
                }
                AudioCommand::Stop => playback.stop(),
                AudioCommand::IsActive { reply } => {
                    let _ = reply.send(playback.is_active());
                }
                AudioCommand::SetCompletionCallback(cb) => playback.set_completion_callback(cb),
                AudioCommand::SetVolume(volume) => playback.set_volume(volume),
                AudioCommand::Shutdown => break,
            }
        }

        playback.stop();
        tracing::debug!("Audio thread shutting down");
    }
}

impl PlaybackSink for RodioSink {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        let path = path.to_path_buf();
        self.send_and_recv(|reply| AudioCommand::Load { path, reply })
    }

    fn start(&mut self) -> Result<PlaybackTicket, PlaybackError> {
        self.send_and_recv(|reply| AudioCommand::Start { reply })
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }

    fn is_active(&self) -> bool {
        self.query(|reply| AudioCommand::IsActive { reply })
            .unwrap_or(false)
    }

    fn set_completion_callback(&mut self, callback: CompletionCallback) {
        let _ = self
            .cmd_tx
            .send(AudioCommand::SetCompletionCallback(callback));
    }

    fn release(&mut self) {
        self.shutdown_thread();
        tracing::info!("Audio output released");
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        self.shutdown_thread();
    }
}
