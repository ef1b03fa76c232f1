//! Error types for `sshterm`
//!
//! This module defines the failure taxonomy of the session core (connect,
//! channel, write and pump outcomes) together with the ambient configuration
//! and transcript errors. Every error renders a single human-readable message
//! prefixed with its kind.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for `sshterm` operations
#[derive(Debug, Error)]
pub enum SshTermError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session controller errors
    #[error("Session error: {0}")]
    Controller(#[from] ControllerError),

    /// Transcript persistence errors
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a transport session could not be established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailureKind {
    /// The host could not be resolved or the TCP connection was refused
    Unreachable,
    /// Handshake or authentication did not complete in time
    Timeout,
    /// The server rejected the supplied credentials
    AuthRejected,
    /// The SSH handshake failed
    ProtocolError,
    /// The host key policy refused the server key
    HostKeyRejected,
}

impl ConnectFailureKind {
    /// Short label used in user-facing messages
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::Timeout => "timeout",
            Self::AuthRejected => "authentication rejected",
            Self::ProtocolError => "protocol error",
            Self::HostKeyRejected => "host key rejected",
        }
    }
}

impl std::fmt::Display for ConnectFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure to open a transport session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Connection failed ({kind}): {detail}")]
pub struct ConnectFailure {
    /// Classified reason
    pub kind: ConnectFailureKind,
    /// Detail from the transport
    pub detail: String,
}

impl ConnectFailure {
    /// Creates a new connect failure
    #[must_use]
    pub fn new(kind: ConnectFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Shorthand for a timeout failure
    #[must_use]
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::new(
            ConnectFailureKind::Timeout,
            format!("no session within {} ms", timeout.as_millis()),
        )
    }
}

/// Failure to open a shell channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelFailure {
    /// The transport session is not connected
    #[error("Channel failed (session closed)")]
    SessionClosed,

    /// The remote refused the PTY or shell request
    #[error("Channel failed (remote rejected): {0}")]
    RemoteRejected(String),
}

/// Failure to write a command to the channel
#[derive(Debug, Error)]
pub enum WriteFailure {
    /// The channel has been closed
    #[error("Write failed (channel closed)")]
    ChannelClosed,

    /// The underlying stream returned an error
    #[error("Write failed (I/O): {0}")]
    Io(#[from] std::io::Error),
}

/// Why the output pump stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEnded {
    /// The remote closed the stream
    Eof,
    /// The controller closed the channel
    Closed,
    /// Reading from the stream failed
    ReadError(String),
}

impl std::fmt::Display for PumpEnded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eof => f.write_str("remote closed the session"),
            Self::Closed => f.write_str("session closed locally"),
            Self::ReadError(e) => write!(f, "read error: {e}"),
        }
    }
}

/// Errors returned by the session controller
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Operation not allowed in the current state
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        /// The rejected operation
        operation: &'static str,
        /// The state at the time of the call
        state: String,
    },

    /// Connection parameters failed validation
    #[error("Invalid connection parameters for {field}: {reason}")]
    InvalidParams {
        /// The field that failed validation
        field: &'static str,
        /// The reason for validation failure
        reason: String,
    },

    /// Transport session could not be opened
    #[error(transparent)]
    Connect(#[from] ConnectFailure),

    /// Shell channel could not be opened
    #[error(transparent)]
    Channel(#[from] ChannelFailure),

    /// Command could not be written
    #[error(transparent)]
    Write(#[from] WriteFailure),

    /// The connection attempt was cancelled by `disconnect()`
    #[error("Connection cancelled")]
    Cancelled,
}

/// Errors related to configuration file operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// The reason for validation failure
        reason: String,
    },

    /// Configuration directory could not be determined
    #[error("Configuration directory not found: {0}")]
    NotFound(PathBuf),

    /// Failed to write configuration file
    #[error("Failed to write configuration: {0}")]
    Write(String),

    /// Failed to serialize configuration
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

/// Errors related to transcript persistence
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// No transcript with the given identifier
    #[error("Transcript not found: {0}")]
    NotFound(String),

    /// There is no session output to save
    #[error("No session transcript to save")]
    Empty,

    /// The backing store could not be read or written
    #[error("Transcript storage failed: {0}")]
    Storage(String),

    /// I/O error while handling transcript files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for TranscriptError {
    fn from(e: ConfigError) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Result type alias for `sshterm` operations
pub type Result<T> = std::result::Result<T, SshTermError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for controller operations
pub type ControllerResult<T> = std::result::Result<T, ControllerError>;

/// Result type alias for transcript operations
pub type TranscriptResult<T> = std::result::Result<T, TranscriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failure_message_has_kind_label() {
        let failure = ConnectFailure::new(ConnectFailureKind::AuthRejected, "bad password");
        assert_eq!(
            failure.to_string(),
            "Connection failed (authentication rejected): bad password"
        );
    }

    #[test]
    fn test_timeout_shorthand() {
        let failure = ConnectFailure::timeout(std::time::Duration::from_millis(250));
        assert_eq!(failure.kind, ConnectFailureKind::Timeout);
        assert!(failure.detail.contains("250"));
    }

    #[test]
    fn test_controller_error_is_transparent_for_connect() {
        let err: ControllerError =
            ConnectFailure::new(ConnectFailureKind::Unreachable, "refused").into();
        assert!(err.to_string().starts_with("Connection failed (unreachable)"));
    }

    #[test]
    fn test_pump_ended_display() {
        assert_eq!(PumpEnded::Eof.to_string(), "remote closed the session");
        assert_eq!(
            PumpEnded::ReadError("reset".to_string()).to_string(),
            "read error: reset"
        );
    }
}
