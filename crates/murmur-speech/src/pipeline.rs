//! Speech pipeline orchestrator: drives queued utterances through synthesis
//! and playback, one at a time.
//!
//! ```text
//!   Idle ──dequeue──▶ Synthesizing ──load+start──▶ Playing
//!    ▲                    │ error                     │ done / error
//!    └────────────────────┴───────────────────────────┘
//! ```
//!
//! [`SpeechPipeline`] is a cheap handle. The state machine itself runs on a
//! single tokio task that owns the playback sink, the active artifact and the
//! listener; every trigger (submission, synthesis result, end of playback,
//! stop, shutdown) reaches it as a message on one channel, so sink calls and
//! state changes never race. Only the [`UtteranceQueue`] is touched from
//! caller threads.
//!
//! Results that arrive for an utterance that has since been superseded by
//! [`stop`](SpeechPipeline::stop) are recognised by their epoch (synthesis) or
//! ticket (playback) and dropped without emitting any lifecycle event. A stop
//! only abandons work dequeued before it was issued: each `stop()` opens a new
//! queue generation, and the worker leaves alone an utterance dequeued under
//! that generation or a later one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};

use crate::artifact::AudioArtifact;
use crate::audio_thread::RodioSink;
use crate::config::SpeechConfig;
use crate::error::{SpeechError, SynthesisError};
use crate::playback::{PlaybackSink, PlaybackTicket};
use crate::queue::{QueueMode, Utterance, UtteranceQueue};
use crate::synthesis::{HttpSynthesisClient, SynthesisBackend};

// ── State ──────────────────────────────────────────────────────────

/// Externally visible pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing in flight.
    #[default]
    Idle,

    /// Waiting for the synthesis service.
    Synthesizing,

    /// Audio is playing.
    Playing,
}

/// Result of a `speak`/`stop` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakStatus {
    Success,
    /// The pipeline has been shut down.
    Error,
}

/// Result of a `set_language` request. With a single fixed voice every
/// locale is reported as available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageStatus {
    Available,
}

// ── Lifecycle listener ─────────────────────────────────────────────

/// Receives per-utterance lifecycle events.
///
/// Called on the pipeline task; implementations should return quickly.
/// For one utterance `on_start` always precedes `on_done`, and an utterance
/// that fails gets `on_error` only.
pub trait UtteranceListener: Send + Sync {
    fn on_start(&self, utterance_id: &str);
    fn on_done(&self, utterance_id: &str);
    fn on_error(&self, utterance_id: &str);
}

/// Closure-backed [`UtteranceListener`].
pub struct LifecycleCallbacks<S, D, E> {
    on_start: S,
    on_done: D,
    on_error: E,
}

impl<S, D, E> LifecycleCallbacks<S, D, E>
where
    S: Fn(&str) + Send + Sync,
    D: Fn(&str) + Send + Sync,
    E: Fn(&str) + Send + Sync,
{
    pub const fn new(on_start: S, on_done: D, on_error: E) -> Self {
        Self {
            on_start,
            on_done,
            on_error,
        }
    }
}

impl<S, D, E> UtteranceListener for LifecycleCallbacks<S, D, E>
where
    S: Fn(&str) + Send + Sync,
    D: Fn(&str) + Send + Sync,
    E: Fn(&str) + Send + Sync,
{
    fn on_start(&self, utterance_id: &str) {
        (self.on_start)(utterance_id);
    }

    fn on_done(&self, utterance_id: &str) {
        (self.on_done)(utterance_id);
    }

    fn on_error(&self, utterance_id: &str) {
        (self.on_error)(utterance_id);
    }
}

// ── Commands ───────────────────────────────────────────────────────

/// Everything the pipeline task reacts to.
enum Command {
    /// New work was queued.
    Wake,

    /// A synthesis request issued at `epoch` completed.
    SynthesisFinished {
        epoch: u64,
        result: Result<AudioArtifact, SynthesisError>,
    },

    /// The sink reached the end of a cycle on its own.
    PlaybackFinished(PlaybackTicket),

    SetListener(Option<Arc<dyn UtteranceListener>>),

    /// Abandon the active utterance if it was dequeued before this stop
    /// generation began.
    Stop(u64),

    /// Resolve once the pipeline is idle with nothing queued.
    NotifyWhenDrained(oneshot::Sender<()>),

    /// Stop, release the sink and exit.
    Shutdown(oneshot::Sender<()>),
}

/// Internal state, with the data each phase owns.
enum Phase {
    Idle,
    Synthesizing {
        utterance: Utterance,
        epoch: u64,
        generation: u64,
    },
    Playing {
        utterance: Utterance,
        artifact: AudioArtifact,
        ticket: PlaybackTicket,
        generation: u64,
    },
}

impl Phase {
    const fn state(&self) -> PlaybackState {
        match self {
            Self::Idle => PlaybackState::Idle,
            Self::Synthesizing { .. } => PlaybackState::Synthesizing,
            Self::Playing { .. } => PlaybackState::Playing,
        }
    }

    /// Stop generation the active utterance was dequeued under.
    const fn generation(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Synthesizing { generation, .. } | Self::Playing { generation, .. } => {
                Some(*generation)
            }
        }
    }
}

// ── Handle ─────────────────────────────────────────────────────────

/// Speech output pipeline.
///
/// Dropping the handle shuts the pipeline down once in-flight synthesis
/// requests have returned; call [`shutdown`](Self::shutdown) to do it
/// immediately and wait for it.
pub struct SpeechPipeline {
    queue: Arc<UtteranceQueue>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<PlaybackState>,
    closed: AtomicBool,
}

impl SpeechPipeline {
    /// Start a pipeline on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        config: &SpeechConfig,
        backend: Arc<dyn SynthesisBackend>,
        mut sink: Box<dyn PlaybackSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);
        let queue = Arc::new(UtteranceQueue::new());

        let completion_tx = cmd_tx.downgrade();
        sink.set_completion_callback(Arc::new(move |ticket| {
            if let Some(tx) = completion_tx.upgrade() {
                let _ = tx.send(Command::PlaybackFinished(ticket));
            }
        }));

        let worker = PipelineWorker {
            phase: Phase::Idle,
            epoch: 0,
            queue: Arc::clone(&queue),
            backend,
            sink,
            voice: config.voice.clone(),
            listener: None,
            cmd_tx: cmd_tx.downgrade(),
            state_tx,
            drain_waiters: Vec::new(),
        };
        tokio::spawn(worker.run(cmd_rx));

        tracing::info!(voice = %config.voice, "Speech pipeline started");

        Self {
            queue,
            cmd_tx,
            state_rx,
            closed: AtomicBool::new(false),
        }
    }

    /// Start a pipeline that synthesizes over HTTP and plays on the default
    /// output device.
    pub fn with_defaults(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let backend = HttpSynthesisClient::new(config)?;
        let sink = RodioSink::open()?;
        Ok(Self::spawn(config, Arc::new(backend), Box::new(sink)))
    }

    /// Queue `text` for speech under `utterance_id`.
    ///
    /// With [`QueueMode::Flush`], everything not yet picked up is discarded
    /// first; an utterance already synthesizing or playing still completes.
    pub fn speak(
        &self,
        text: impl Into<String>,
        mode: QueueMode,
        utterance_id: impl Into<String>,
    ) -> SpeakStatus {
        if self.closed.load(Ordering::SeqCst) {
            return SpeakStatus::Error;
        }

        let utterance = Utterance::new(utterance_id, text);
        tracing::debug!(utterance_id = utterance.id(), ?mode, "Utterance submitted");

        let discarded = self.queue.enqueue(utterance, mode);
        if discarded > 0 {
            tracing::debug!(discarded, "Flush discarded pending utterances");
        }

        match self.cmd_tx.send(Command::Wake) {
            Ok(()) => SpeakStatus::Success,
            Err(_) => SpeakStatus::Error,
        }
    }

    /// Discard everything queued and halt the active utterance without
    /// emitting a lifecycle event for it.
    pub fn stop(&self) -> SpeakStatus {
        if self.closed.load(Ordering::SeqCst) {
            return SpeakStatus::Error;
        }

        let (discarded, generation) = self.queue.cut();
        tracing::debug!(discarded, generation, "Stop requested");

        match self.cmd_tx.send(Command::Stop(generation)) {
            Ok(()) => SpeakStatus::Success,
            Err(_) => SpeakStatus::Error,
        }
    }

    /// Stop everything, release the audio output and wait for the pipeline
    /// task to exit. Later calls return immediately.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.queue.clear();
        let (done_tx, done_rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        tracing::info!("Speech pipeline shut down");
    }

    /// Install the lifecycle listener, replacing any previous one.
    pub fn set_lifecycle_listener(&self, listener: impl UtteranceListener + 'static) {
        let listener: Arc<dyn UtteranceListener> = Arc::new(listener);
        let _ = self.cmd_tx.send(Command::SetListener(Some(listener)));
    }

    /// Remove the lifecycle listener.
    pub fn clear_lifecycle_listener(&self) {
        let _ = self.cmd_tx.send(Command::SetListener(None));
    }

    /// Only one fixed voice is supported, so every locale reports available.
    pub fn set_language(&self, locale: &str) -> LanguageStatus {
        tracing::debug!(locale, "Language request ignored: single fixed voice");
        LanguageStatus::Available
    }

    /// Current state snapshot.
    pub fn state(&self) -> PlaybackState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state_rx.clone()
    }

    /// Number of utterances waiting behind the active one.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Wait until every utterance submitted before this call has finished
    /// (or the pipeline shut down).
    pub async fn wait_until_idle(&self) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::NotifyWhenDrained(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

// ── Worker ─────────────────────────────────────────────────────────

/// Owns the state machine. Runs on exactly one task.
struct PipelineWorker {
    phase: Phase,

    /// Bumped on every dequeue and every stop; tags synthesis requests.
    epoch: u64,

    queue: Arc<UtteranceQueue>,
    backend: Arc<dyn SynthesisBackend>,
    sink: Box<dyn PlaybackSink>,
    voice: String,
    listener: Option<Arc<dyn UtteranceListener>>,

    /// Weak so that dropping every handle ends the task.
    cmd_tx: mpsc::WeakUnboundedSender<Command>,

    state_tx: watch::Sender<PlaybackState>,
    drain_waiters: Vec<oneshot::Sender<()>>,
}

impl PipelineWorker {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        let mut shutdown_ack = None;

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Wake => {}
                Command::SynthesisFinished { epoch, result } => {
                    self.on_synthesis_finished(epoch, result);
                }
                Command::PlaybackFinished(ticket) => self.on_playback_finished(ticket),
                Command::SetListener(listener) => self.listener = listener,
                Command::Stop(generation) => self.stop_before(generation),
                Command::NotifyWhenDrained(waiter) => self.drain_waiters.push(waiter),
                Command::Shutdown(ack) => {
                    shutdown_ack = Some(ack);
                    break;
                }
            }

            self.advance();
            self.notify_if_drained();
        }

        self.halt();
        self.sink.release();
        self.drain_waiters.clear();
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
        tracing::debug!("Speech pipeline task exited");
    }

    /// Idle with work queued: dequeue the head and start synthesizing it.
    fn advance(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            return;
        }
        let Some(tx) = self.cmd_tx.upgrade() else {
            return;
        };
        let Some((utterance, generation)) = self.queue.dequeue_tagged() else {
            return;
        };

        self.epoch += 1;
        let epoch = self.epoch;
        tracing::debug!(utterance_id = utterance.id(), epoch, "Synthesizing utterance");

        let backend = Arc::clone(&self.backend);
        let text = utterance.text().to_string();
        let voice = self.voice.clone();
        tokio::spawn(async move {
            // Run the request in its own task so a panicking backend still
            // produces exactly one report.
            let request = tokio::spawn(async move { backend.synthesize(&text, &voice).await });
            let result = request.await.unwrap_or(Err(SynthesisError::Cancelled));
            let _ = tx.send(Command::SynthesisFinished { epoch, result });
        });

        self.set_phase(Phase::Synthesizing {
            utterance,
            epoch,
            generation,
        });
    }

    fn on_synthesis_finished(&mut self, epoch: u64, result: Result<AudioArtifact, SynthesisError>) {
        let (utterance, generation) = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Synthesizing {
                utterance,
                epoch: current,
                generation,
            } if current == epoch => (utterance, generation),
            other => {
                // Dropping a stale artifact deletes it.
                tracing::debug!(epoch, "Dropping stale synthesis result");
                self.phase = other;
                return;
            }
        };

        match result {
            Ok(artifact) => self.begin_playback(utterance, artifact, generation),
            Err(e) => {
                tracing::warn!(utterance_id = utterance.id(), error = %e, "Synthesis failed");
                self.emit_error(&utterance);
                self.set_phase(Phase::Idle);
            }
        }
    }

    fn begin_playback(&mut self, utterance: Utterance, artifact: AudioArtifact, generation: u64) {
        let started = self
            .sink
            .load(artifact.path())
            .and_then(|()| self.sink.start());

        match started {
            Ok(ticket) => {
                tracing::debug!(
                    utterance_id = utterance.id(),
                    ticket = ticket.get(),
                    "Playback started"
                );
                self.emit(|l, id| l.on_start(id), utterance.id());
                self.set_phase(Phase::Playing {
                    utterance,
                    artifact,
                    ticket,
                    generation,
                });
            }
            Err(e) => {
                tracing::warn!(utterance_id = utterance.id(), error = %e, "Playback failed to start");
                self.sink.stop();
                self.emit_error(&utterance);
                artifact.discard();
                self.set_phase(Phase::Idle);
            }
        }
    }

    fn on_playback_finished(&mut self, ticket: PlaybackTicket) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Playing {
                utterance,
                artifact,
                ticket: current,
                ..
            } if current == ticket => {
                tracing::debug!(utterance_id = utterance.id(), "Playback complete");
                self.emit(|l, id| l.on_done(id), utterance.id());
                artifact.discard();
                self.set_phase(Phase::Idle);
            }
            other => {
                tracing::debug!(ticket = ticket.get(), "Ignoring completion of superseded playback");
                self.phase = other;
            }
        }
    }

    /// Handle a caller's `stop()`. An utterance dequeued at or after
    /// `generation` was submitted after that call returned and keeps running.
    fn stop_before(&mut self, generation: u64) {
        if self.phase.generation().is_some_and(|active| active >= generation) {
            tracing::debug!(generation, "Active utterance postdates stop; keeping it");
            return;
        }
        self.halt();
    }

    /// Abandon the active utterance without notifying the listener.
    fn halt(&mut self) {
        self.epoch += 1;

        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                if self.sink.is_active() {
                    self.sink.stop();
                }
            }
            Phase::Synthesizing { utterance, .. } => {
                tracing::debug!(utterance_id = utterance.id(), "Abandoning in-flight synthesis");
                if self.sink.is_active() {
                    self.sink.stop();
                }
            }
            Phase::Playing {
                utterance,
                artifact,
                ..
            } => {
                tracing::debug!(utterance_id = utterance.id(), "Interrupting playback");
                self.sink.stop();
                artifact.discard();
            }
        }

        self.set_phase(Phase::Idle);
    }

    fn notify_if_drained(&mut self) {
        if matches!(self.phase, Phase::Idle) && self.queue.is_empty() {
            for waiter in self.drain_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    /// Transition and publish the new state.
    fn set_phase(&mut self, phase: Phase) {
        let old = self.phase.state();
        let new = phase.state();
        self.phase = phase;
        if old != new {
            tracing::debug!(?old, ?new, "Speech state transition");
        }
        self.state_tx.send_if_modified(|state| {
            let changed = *state != new;
            *state = new;
            changed
        });
    }

    fn emit_error(&self, utterance: &Utterance) {
        self.emit(|l, id| l.on_error(id), utterance.id());
    }

    fn emit(&self, event: impl FnOnce(&dyn UtteranceListener, &str), utterance_id: &str) {
        if let Some(listener) = &self.listener {
            event(listener.as_ref(), utterance_id);
        }
    }
}
