//! Saved session transcripts.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LineSource, LogLine};

/// A saved session transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Unique identifier assigned on creation
    pub id: Uuid,
    /// Host the session was connected to
    pub host: String,
    /// Save time in milliseconds since the Unix epoch
    pub timestamp_millis: i64,
    /// Newline-joined transcript text
    pub text: String,
}

impl TranscriptRecord {
    /// Creates a new record stamped with the current time
    #[must_use]
    pub fn new(host: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_timestamp(host, Utc::now().timestamp_millis(), text)
    }

    /// Creates a new record with an explicit timestamp
    #[must_use]
    pub fn with_timestamp(
        host: impl Into<String>,
        timestamp_millis: i64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            host: host.into(),
            timestamp_millis,
            text: text.into(),
        }
    }

    /// Builds a record from session lines
    #[must_use]
    pub fn from_lines(host: impl Into<String>, lines: &[LogLine]) -> Self {
        Self::new(host, join_lines(lines))
    }

    /// Returns the save time as a `DateTime`, if representable
    #[must_use]
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_millis).single()
    }

    /// Returns the number of lines in the transcript
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Joins line texts with `\n`, leaving out screen clears
#[must_use]
pub fn join_lines(lines: &[LogLine]) -> String {
    lines
        .iter()
        .filter(|line| line.source != LineSource::Clear)
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
