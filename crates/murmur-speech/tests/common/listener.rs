//! Listener that records lifecycle events in arrival order.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use murmur_speech::UtteranceListener;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    Done(String),
    Error(String),
}

impl Event {
    pub fn start(id: &str) -> Self {
        Self::Start(id.to_string())
    }

    pub fn done(id: &str) -> Self {
        Self::Done(id.to_string())
    }

    pub fn error(id: &str) -> Self {
        Self::Error(id.to_string())
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl UtteranceListener for Recorder {
    fn on_start(&self, utterance_id: &str) {
        self.push(Event::Start(utterance_id.to_string()));
    }

    fn on_done(&self, utterance_id: &str) {
        self.push(Event::Done(utterance_id.to_string()));
    }

    fn on_error(&self, utterance_id: &str) {
        self.push(Event::Error(utterance_id.to_string()));
    }
}
