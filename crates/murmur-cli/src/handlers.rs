//! Command bodies for `murmur speak` and `murmur stdin`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use murmur_speech::{
    HttpSynthesisClient, LifecycleCallbacks, QueueMode, RodioSink, SpeakStatus, SpeechConfig,
    SpeechError, SpeechPipeline,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Wire the HTTP backend and the default audio device into a pipeline.
pub fn build_pipeline(config: &SpeechConfig, volume: f32) -> Result<SpeechPipeline> {
    let backend = HttpSynthesisClient::new(config).context("invalid synthesis configuration")?;
    let sink = RodioSink::open().context("failed to open audio output")?;
    sink.set_volume(volume);
    Ok(SpeechPipeline::spawn(config, Arc::new(backend), Box::new(sink)))
}

/// Print lifecycle events and count failed utterances.
pub fn report_events(pipeline: &SpeechPipeline) -> Arc<AtomicUsize> {
    let failures = Arc::new(AtomicUsize::new(0));
    let failed = Arc::clone(&failures);
    pipeline.set_lifecycle_listener(LifecycleCallbacks::new(
        |id: &str| println!("[{id}] speaking"),
        |id: &str| println!("[{id}] done"),
        move |id: &str| {
            failed.fetch_add(1, Ordering::SeqCst);
            eprintln!("[{id}] failed");
        },
    ));
    failures
}

fn submit(pipeline: &SpeechPipeline, text: &str, mode: QueueMode, id: usize) -> Result<()> {
    match pipeline.speak(text, mode, id.to_string()) {
        SpeakStatus::Success => Ok(()),
        SpeakStatus::Error => Err(SpeechError::ShutDown.into()),
    }
}

fn finish(submitted: usize, failures: &AtomicUsize) -> Result<usize> {
    let failed = failures.load(Ordering::SeqCst);
    if failed > 0 {
        bail!("{failed} of {submitted} utterance(s) failed");
    }
    Ok(submitted)
}

/// Queue mode for the `index`-th text of one command. A flush supersedes
/// earlier work, never the command's own texts.
pub const fn submission_mode(index: usize, flush: bool) -> QueueMode {
    if flush && index == 0 {
        QueueMode::Flush
    } else {
        QueueMode::Add
    }
}

/// Speak `texts` in order under ids `1..=n` and wait for all of them.
pub async fn speak(pipeline: &SpeechPipeline, texts: &[String], flush: bool) -> Result<usize> {
    let failures = report_events(pipeline);

    for (index, text) in texts.iter().enumerate() {
        submit(pipeline, text, submission_mode(index, flush), index + 1)?;
    }
    tracing::debug!(count = texts.len(), "Utterances submitted");

    pipeline.wait_until_idle().await;
    finish(texts.len(), &failures)
}

/// Speak each non-empty line from `reader` as it arrives; returns once the
/// input is exhausted and everything has been spoken.
pub async fn speak_lines<R>(pipeline: &SpeechPipeline, reader: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let failures = report_events(pipeline);
    let mut lines = reader.lines();
    let mut submitted = 0;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        submitted += 1;
        submit(pipeline, text, QueueMode::Add, submitted)?;
    }
    tracing::debug!(submitted, "End of input");

    pipeline.wait_until_idle().await;
    finish(submitted, &failures)
}
