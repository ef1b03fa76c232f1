//! Core data models for `sshterm`
//!
//! This module defines the data passed between the session controller and
//! its collaborators: connection parameters, terminal lines, PTY requests and
//! saved transcripts.

mod log_line;
mod params;
mod pty;
mod transcript;

pub use log_line::{LineSource, LogLine};
pub use params::{ConnectionParams, DEFAULT_SSH_PORT};
pub use pty::PtyRequest;
pub use transcript::{join_lines, TranscriptRecord};
