//! Terminal output lines delivered to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    /// Lifecycle messages produced by the controller
    System,
    /// Output received from the remote shell
    RemoteOutput,
    /// Commands echoed locally when sent
    LocalEcho,
    /// The remote cleared the screen; the line text is empty
    Clear,
}

/// One decoded line of session output
///
/// Lines are immutable once created. Sequence numbers start at 1 for each
/// session and increase by exactly one per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Position of this line within its session
    pub seq: u64,
    /// Origin of the line
    pub source: LineSource,
    /// Text with control sequences removed
    pub text: String,
    /// When the line was produced
    pub timestamp: DateTime<Utc>,
}

impl LogLine {
    /// Creates a new line stamped with the current time
    #[must_use]
    pub fn new(seq: u64, source: LineSource, text: impl Into<String>) -> Self {
        Self {
            seq,
            source,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Returns true if the line came from the remote shell
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.source, LineSource::RemoteOutput)
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
