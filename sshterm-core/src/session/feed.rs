//! Ordered line feed shared by the controller and the output pump.
//!
//! Every line, whatever its source, passes through one `FeedEmitter`, which
//! assigns the sequence number, records the line in the session transcript
//! and fans it out to subscribers while holding a single lock. That makes the
//! sequence gap-free and the delivery order identical for every subscriber.
//!
//! Subscriber queues are unbounded: a slow reader never causes lines to be
//! dropped, at the cost of memory while it lags.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::models::{LineSource, LogLine};

#[derive(Debug, Default)]
struct FeedState {
    next_seq: u64,
    transcript: Vec<LogLine>,
    subscribers: Vec<mpsc::UnboundedSender<LogLine>>,
}

/// Sequencing fan-out point for `LogLine`s
#[derive(Debug, Clone, Default)]
pub struct FeedEmitter {
    state: Arc<Mutex<FeedState>>,
}

impl FeedEmitter {
    /// Creates an emitter with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscriber that receives every line emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> LogFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        LogFeed { rx }
    }

    /// Sequences, records and delivers one line, returning its sequence number
    pub fn emit(&self, source: LineSource, text: impl Into<String>) -> u64 {
        let mut state = self.lock();
        state.next_seq += 1;
        let line = LogLine::new(state.next_seq, source, text);
        state.subscribers.retain(|tx| tx.send(line.clone()).is_ok());
        state.transcript.push(line);
        state.next_seq
    }

    /// Starts a new session: sequence restarts at 1 and the transcript is cleared
    pub fn reset(&self) {
        let mut state = self.lock();
        state.next_seq = 0;
        state.transcript.clear();
    }

    /// Returns a copy of the current session's lines
    #[must_use]
    pub fn transcript(&self) -> Vec<LogLine> {
        self.lock().transcript.clone()
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }
}

/// Receiving end of a line subscription
///
/// Lines arrive in sequence order. `recv()` returns `None` once the owning
/// controller has been dropped and the queue is drained.
#[derive(Debug)]
pub struct LogFeed {
    rx: mpsc::UnboundedReceiver<LogLine>,
}

impl LogFeed {
    /// Waits for the next line
    pub async fn recv(&mut self) -> Option<LogLine> {
        self.rx.recv().await
    }

    /// Returns the next line if one is queued
    pub fn try_recv(&mut self) -> Option<LogLine> {
        self.rx.try_recv().ok()
    }

    /// Takes every queued line without waiting
    pub fn drain(&mut self) -> Vec<LogLine> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
