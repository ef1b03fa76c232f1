//! `sshterm` Core Library
//!
//! This crate provides the interactive remote-session client core: an
//! authenticated transport session, a PTY shell channel, an output pump that
//! turns shell bytes into an ordered line feed, and the `SessionController`
//! that owns the lifecycle. Configuration, logging setup and transcript
//! persistence live alongside.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod terminal;
pub mod transcript;
pub mod transport;

pub use config::{AppSettings, ConfigManager};
pub use error::{
    ChannelFailure, ConfigError, ConfigResult, ConnectFailure, ConnectFailureKind,
    ControllerError, ControllerResult, PumpEnded, SshTermError, TranscriptError,
    TranscriptResult, WriteFailure,
};
pub use models::{
    ConnectionParams, LineSource, LogLine, PtyRequest, TranscriptRecord, DEFAULT_SSH_PORT,
};
pub use session::{
    CommandSink, ConnectionState, LogFeed, SessionController, SessionInfo, SessionOptions,
};
pub use terminal::{LineDecoder, TextEncoding};
pub use transcript::{
    FileTranscriptStore, InMemoryTranscriptStore, TranscriptFiles, TranscriptStore,
};
#[cfg(feature = "ssh-transport")]
pub use transport::RusshTransport;
pub use transport::{
    CommandInterpreter, DemoInterpreter, HostKeyPolicy, ShellChannel, SimulatedTransport,
    Transport, TransportSession,
};
