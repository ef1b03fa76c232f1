//! Pseudo-terminal request parameters.

use serde::{Deserialize, Serialize};

/// Terminal type and geometry requested when opening a shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtyRequest {
    /// Value for the remote `TERM` variable
    pub term: String,
    /// Terminal width in characters
    pub cols: u32,
    /// Terminal height in rows
    pub rows: u32,
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self {
            term: "xterm".to_string(),
            cols: 80,
            rows: 24,
        }
    }
}

impl PtyRequest {
    /// Creates a request with the given terminal type and geometry
    #[must_use]
    pub fn new(term: impl Into<String>, cols: u32, rows: u32) -> Self {
        Self {
            term: term.into(),
            cols,
            rows,
        }
    }
}
