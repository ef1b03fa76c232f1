//! Connection state of a session controller.

/// Lifecycle state of a `SessionController`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session; `connect()` is allowed
    #[default]
    Disconnected,
    /// Handshake and shell setup in progress
    Connecting,
    /// Shell open and output pump running
    Connected,
    /// Session teardown in progress
    Disconnecting,
    /// Last connection attempt failed; `acknowledge()` or `disconnect()`
    /// returns to `Disconnected`
    Failed(String),
}

impl ConnectionState {
    /// Short lowercase name of the state
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns true if a shell is open
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true for states with no transition in flight
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Connected | Self::Failed(_))
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(
            ConnectionState::Failed("timeout".to_string()).to_string(),
            "failed: timeout"
        );
    }

    #[test]
    fn test_settled_states() {
        assert!(ConnectionState::default().is_settled());
        assert!(!ConnectionState::Connecting.is_settled());
        assert!(!ConnectionState::Disconnecting.is_settled());
        assert!(ConnectionState::Failed(String::new()).is_settled());
    }
}
