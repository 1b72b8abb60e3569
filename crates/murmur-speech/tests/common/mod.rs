//! Common test utilities.
//!
//! Controllable stand-ins for the synthesis service, the audio device and
//! the host's lifecycle listener, plus a polling helper.

pub mod backend;
pub mod listener;
pub mod sink;

use std::time::Duration;

/// Poll `cond` until it holds, failing the test after five seconds.
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
