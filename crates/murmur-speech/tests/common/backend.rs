//! In-process [`SynthesisBackend`] with scripted outcomes.
//!
//! Every request is recorded. Texts registered with [`ScriptedBackend::fail_on`]
//! return a 500 status error; texts registered with [`ScriptedBackend::hold`]
//! block until the returned [`Release`] is triggered, which lets a test act
//! while a request is in flight.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use murmur_speech::{AudioArtifact, SynthesisBackend, SynthesisError};
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Unblocks a held synthesis request.
pub struct Release(oneshot::Sender<()>);

impl Release {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Default)]
struct Script {
    requests: Vec<(String, String)>,
    failing: HashSet<String>,
    holds: HashMap<String, oneshot::Receiver<()>>,
    produced: Vec<PathBuf>,
}

pub struct ScriptedBackend {
    dir: TempDir,
    script: Mutex<Script>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dir: tempfile::tempdir().unwrap(),
            script: Mutex::new(Script::default()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn fail_on(&self, text: &str) {
        self.script.lock().unwrap().failing.insert(text.to_string());
    }

    pub fn hold(&self, text: &str) -> Release {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().holds.insert(text.to_string(), rx);
        Release(tx)
    }

    /// `(text, voice)` of every request, in issue order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.requests().into_iter().map(|(text, _)| text).collect()
    }

    /// Paths of every artifact handed back to the pipeline.
    pub fn produced(&self) -> Vec<PathBuf> {
        self.script.lock().unwrap().produced.clone()
    }

    /// Audio files still present in the scratch directory.
    pub fn remaining_files(&self) -> usize {
        std::fs::read_dir(self.dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedBackend {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioArtifact, SynthesisError> {
        let (hold, fail) = {
            let mut script = self.script.lock().unwrap();
            script.requests.push((text.to_string(), voice.to_string()));
            (script.holds.remove(text), script.failing.contains(text))
        };

        if let Some(hold) = hold {
            let _ = hold.await;
        }

        if fail {
            return Err(SynthesisError::Status {
                status: 500,
                url: "http://scripted/api/tts".into(),
            });
        }

        let artifact = AudioArtifact::write(self.dir.path(), text.as_bytes().to_vec()).await?;
        self.script
            .lock()
            .unwrap()
            .produced
            .push(artifact.path().to_path_buf());
        Ok(artifact)
    }
}
