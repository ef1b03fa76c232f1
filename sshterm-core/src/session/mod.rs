//! Session management for `sshterm`
//!
//! This module provides the session controller and the pieces it drives for
//! each connection: the output pump that turns shell output into lines, the
//! command sink that writes commands, and the ordered line feed that
//! presentation layers subscribe to.

mod controller;
mod feed;
mod handle;
mod pump;
mod sink;
mod state;

pub use controller::{SessionController, SessionOptions, DEFAULT_CONNECT_TIMEOUT};
pub use feed::{FeedEmitter, LogFeed};
pub use handle::SessionInfo;
pub use pump::OutputPump;
pub use sink::{normalize_command, CommandSink};
pub use state::ConnectionState;

pub(crate) use handle::SessionHandle;
