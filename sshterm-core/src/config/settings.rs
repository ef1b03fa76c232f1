//! Application settings model
//!
//! This module defines the application-wide settings stored in config.toml.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::models::{PtyRequest, DEFAULT_SSH_PORT};
use crate::session::SessionOptions;
use crate::terminal::TextEncoding;
use crate::transport::HostKeyPolicy;

/// Application-wide settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionSettings,
    /// Terminal settings
    #[serde(default)]
    pub terminal: TerminalSettings,
    /// Transcript export settings
    #[serde(default)]
    pub transcripts: TranscriptSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppSettings {
    /// Validates every section
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first invalid field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.connection.validate()?;
        self.terminal.validate()
    }

    /// Builds controller options from these settings
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_connect_timeout(self.connection.connect_timeout())
            .with_pty(self.terminal.pty())
            .with_encoding(self.terminal.encoding)
            .with_local_echo(self.terminal.local_echo)
    }
}

/// Connection-related settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Port used when none is given
    #[serde(default = "default_port")]
    pub default_port: u16,
    /// Handshake and authentication timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Server key verification
    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            default_port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            host_key_policy: HostKeyPolicy::default(),
        }
    }
}

impl ConnectionSettings {
    /// Returns the connect timeout as a `Duration`
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.default_port == 0 {
            return Err(ConfigError::Validation {
                field: "connection.default_port".to_string(),
                reason: "Port must be between 1 and 65535".to_string(),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "connection.connect_timeout_ms".to_string(),
                reason: "Timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Terminal-related settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// `TERM` value sent with the PTY request
    #[serde(default = "default_term")]
    pub term: String,
    /// PTY width in columns
    #[serde(default = "default_cols")]
    pub cols: u32,
    /// PTY height in rows
    #[serde(default = "default_rows")]
    pub rows: u32,
    /// Character encoding of the shell
    #[serde(default)]
    pub encoding: TextEncoding,
    /// Echo sent commands into the line feed
    #[serde(default = "default_true")]
    pub local_echo: bool,
}

fn default_term() -> String {
    "xterm".to_string()
}

const fn default_cols() -> u32 {
    80
}

const fn default_rows() -> u32 {
    24
}

const fn default_true() -> bool {
    true
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            term: default_term(),
            cols: default_cols(),
            rows: default_rows(),
            encoding: TextEncoding::default(),
            local_echo: true,
        }
    }
}

impl TerminalSettings {
    /// Returns the PTY request described by these settings
    #[must_use]
    pub fn pty(&self) -> PtyRequest {
        PtyRequest::new(self.term.clone(), self.cols, self.rows)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.term.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "terminal.term".to_string(),
                reason: "Terminal type cannot be empty".to_string(),
            });
        }
        if self.cols == 0 || self.rows == 0 {
            return Err(ConfigError::Validation {
                field: "terminal.cols/rows".to_string(),
                reason: "Terminal size must be at least 1x1".to_string(),
            });
        }
        Ok(())
    }
}

/// Transcript export settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSettings {
    /// Directory for exported `ssh_session_*.txt` files; `~` is expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl TranscriptSettings {
    /// Resolves the export directory
    ///
    /// Falls back to `<data dir>/sshterm/sessions` when unset. Returns `None`
    /// only if no data directory is known.
    #[must_use]
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        match &self.directory {
            Some(dir) => Some(PathBuf::from(
                shellexpand::tilde(&dir.to_string_lossy()).into_owned(),
            )),
            None => dirs::data_dir().map(|d| d.join("sshterm").join("sessions")),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default verbosity (0=error .. 4=trace) when no `-v` flag is given
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,
}

const fn default_verbosity() -> u8 {
    1
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            verbosity: default_verbosity(),
        }
    }
}
