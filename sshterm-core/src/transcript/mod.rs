//! Session transcripts
//!
//! Two ways to keep a finished session: records in a `TranscriptStore`, and
//! plain-text `ssh_session_<millis>.txt` exports managed by
//! `TranscriptFiles`.

mod files;
mod store;

pub use files::{
    is_transcript_file_name, render_transcript, sanitize_filename, TranscriptFile,
    TranscriptFiles, FILE_PREFIX, FILE_SUFFIX,
};
pub use store::{FileTranscriptStore, InMemoryTranscriptStore, TranscriptStore};
