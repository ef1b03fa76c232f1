//! Shared helpers for session integration tests.

use std::sync::Arc;
use std::time::Duration;

use sshterm_core::models::{ConnectionParams, LogLine};
use sshterm_core::session::{ConnectionState, LogFeed, SessionController};
use sshterm_core::transport::SimulatedTransport;

/// Upper bound for any single wait in these tests
pub const WAIT: Duration = Duration::from_secs(5);

/// Password accepted by [`demo_transport`]
pub const PASSWORD: &str = "correct horse";

/// Simulated transport that only accepts [`PASSWORD`]
#[must_use]
pub fn demo_transport() -> Arc<SimulatedTransport> {
    Arc::new(
        SimulatedTransport::new()
            .with_password(PASSWORD)
            .with_banner(["Welcome to demo.local"]),
    )
}

/// Parameters for `alice@demo.local` with the given password
#[must_use]
pub fn params_with_password(password: &str) -> ConnectionParams {
    ConnectionParams::with_default_port("demo.local", "alice", password)
}

/// Receives lines until one has exactly `text`, returning everything seen
///
/// # Panics
///
/// Panics if no such line arrives within [`WAIT`].
pub async fn recv_until(feed: &mut LogFeed, text: &str) -> Vec<LogLine> {
    let mut seen = Vec::new();
    let found = tokio::time::timeout(WAIT, async {
        while let Some(line) = feed.recv().await {
            let done = line.text == text;
            seen.push(line);
            if done {
                return true;
            }
        }
        false
    })
    .await;
    assert_eq!(found, Ok(true), "line {text:?} not received; saw {seen:?}");
    seen
}

/// Waits for the controller to reach `expected`
///
/// # Panics
///
/// Panics if the state is not reached within [`WAIT`].
pub async fn wait_for_state(controller: &SessionController, expected: &ConnectionState) {
    let mut state = controller.watch_state();
    let reached = tokio::time::timeout(WAIT, state.wait_for(|s| s == expected)).await;
    assert!(
        matches!(reached, Ok(Ok(_))),
        "state {expected} not reached; now {}",
        controller.state()
    );
}

/// Texts of the controller's transcript
#[must_use]
pub fn transcript_texts(controller: &SessionController) -> Vec<String> {
    controller
        .transcript()
        .into_iter()
        .map(|line| line.text)
        .collect()
}
