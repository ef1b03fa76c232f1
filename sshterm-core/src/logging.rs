//! Tracing setup for `sshterm` binaries
//!
//! The library itself only emits `tracing` events; a binary calls
//! [`init_logging`] once to install a formatting subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Result, SshTermError};

/// Span names used by the session core
pub mod span_names {
    /// A `SessionController::connect` call
    pub const CONNECT: &str = "sshterm.connect";
    /// The per-session worker running the output pump and teardown
    pub const SESSION_WORKER: &str = "sshterm.session_worker";
    /// A `SessionController::disconnect` call
    pub const DISCONNECT: &str = "sshterm.disconnect";
}

/// Maps a verbosity count to a level name
///
/// 0=error, 1=warn, 2=info, 3=debug, 4+=trace
#[must_use]
pub const fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// Installs a stderr subscriber filtered by `verbosity`
///
/// `RUST_LOG`, when set, takes precedence over `verbosity`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let level = level_for_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sshterm_core={level},sshterm={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3)
                .with_file(verbosity >= 4)
                .with_line_number(verbosity >= 4),
        )
        .try_init()
        .map_err(|e| SshTermError::Io(std::io::Error::other(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), "error");
        assert_eq!(level_for_verbosity(2), "info");
        assert_eq!(level_for_verbosity(9), "trace");
    }
}
