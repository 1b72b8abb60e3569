//! Pending-utterance buffer.
//!
//! Callers submit from any thread while the pipeline task pops from the head,
//! so the queue synchronizes internally. The utterance currently being
//! synthesized or played has already been popped and is never in here.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// One unit of text submitted for speech output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    id: String,
    text: String,
}

impl Utterance {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Caller-supplied id that lifecycle events are keyed by.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// How a submission interacts with what is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueMode {
    /// Append to the tail.
    #[default]
    Add,

    /// Discard everything still pending, then append.
    Flush,
}

/// FIFO of utterances waiting for the pipeline.
///
/// Every [`cut`](Self::cut) starts a new stop generation. Utterances are
/// dequeued together with the generation they were submitted under, so the
/// pipeline can tell work queued before a stop from work queued after it.
#[derive(Debug, Default)]
pub struct UtteranceQueue {
    state: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Utterance>,
    generation: u64,
}

impl UtteranceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an utterance. Returns how many pending utterances a flush discarded.
    pub fn enqueue(&self, utterance: Utterance, mode: QueueMode) -> usize {
        let mut state = self.lock();
        let discarded = match mode {
            QueueMode::Flush => {
                let n = state.pending.len();
                state.pending.clear();
                n
            }
            QueueMode::Add => 0,
        };
        state.pending.push_back(utterance);
        discarded
    }

    /// Pop the head, if any.
    pub fn dequeue_next(&self) -> Option<Utterance> {
        self.dequeue_tagged().map(|(utterance, _)| utterance)
    }

    /// Pop the head along with the stop generation it was dequeued under.
    pub fn dequeue_tagged(&self) -> Option<(Utterance, u64)> {
        let mut state = self.lock();
        let generation = state.generation;
        state.pending.pop_front().map(|u| (u, generation))
    }

    /// Drop everything pending. Returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let n = state.pending.len();
        state.pending.clear();
        n
    }

    /// Drop everything pending and open a new stop generation.
    ///
    /// Returns the number discarded and the new generation. Anything dequeued
    /// afterwards carries a generation at least this large.
    pub fn cut(&self) -> (usize, u64) {
        let mut state = self.lock();
        let n = state.pending.len();
        state.pending.clear();
        state.generation += 1;
        (n, state.generation)
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-modified,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
