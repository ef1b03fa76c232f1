//! Connection parameters for a single session attempt.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ControllerError, ControllerResult};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Parameters for one connection attempt
///
/// The credential is held as a `SecretString` and is redacted from `Debug`
/// output. Parameters are cloned into the controller when a connection
/// attempt starts and are not changed afterwards.
#[derive(Clone)]
pub struct ConnectionParams {
    /// Hostname or IP address
    pub host: String,
    /// TCP port (1-65535)
    pub port: u16,
    /// Remote user name
    pub username: String,
    /// Password or other secret credential
    credential: SecretString,
}

impl ConnectionParams {
    /// Creates new connection parameters
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            credential: SecretString::from(credential.into()),
        }
    }

    /// Creates parameters for the default SSH port
    #[must_use]
    pub fn with_default_port(
        host: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self::new(host, DEFAULT_SSH_PORT, username, credential)
    }

    /// Exposes the credential for authentication (should be used carefully)
    #[must_use]
    pub fn expose_credential(&self) -> &str {
        self.credential.expose_secret()
    }

    /// Returns `host:port`, bracketing IPv6 literals
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Returns `user@host:port` for display
    #[must_use]
    pub fn display_target(&self) -> String {
        format!("{}@{}", self.username, self.address())
    }

    /// Validates the parameters before use
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidParams` if the host or username is
    /// empty, contains whitespace, or the port is 0.
    pub fn validate(&self) -> ControllerResult<()> {
        if self.host.trim().is_empty() {
            return Err(ControllerError::InvalidParams {
                field: "host",
                reason: "Host cannot be empty".to_string(),
            });
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(ControllerError::InvalidParams {
                field: "host",
                reason: "Host cannot contain whitespace".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ControllerError::InvalidParams {
                field: "port",
                reason: "Port must be between 1 and 65535".to_string(),
            });
        }
        if self.username.trim().is_empty() {
            return Err(ControllerError::InvalidParams {
                field: "username",
                reason: "Username cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

// Manual PartialEq implementation since SecretString doesn't implement it
impl PartialEq for ConnectionParams {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.username == other.username
            && self.credential.expose_secret() == other.credential.expose_secret()
    }
}
