//! Transport layer for `sshterm`
//!
//! This module provides the `Transport` and `TransportSession` traits that
//! the session controller drives, and two implementations:
//!
//! - `RusshTransport` (feature `ssh-transport`): a real SSH client built on
//!   `russh`, with host-key verification controlled by `HostKeyPolicy`.
//! - `SimulatedTransport`: an in-process shell answered by a pluggable
//!   `CommandInterpreter`, used for offline demos and tests.
//!
//! A transport session owns its socket and cryptographic state until
//! `close()`. A shell channel opened on it exposes two independent byte
//! streams, one per direction.

mod host_key;
mod interpreter;
#[cfg(feature = "ssh-transport")]
mod russh;
mod simulated;

pub use host_key::{fingerprints_match, HostKeyPolicy};
pub use interpreter::{CommandInterpreter, DemoInterpreter, ShellContext, ShellResponse};
#[cfg(feature = "ssh-transport")]
pub use self::russh::RusshTransport;
pub use simulated::SimulatedTransport;

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{ChannelFailure, ConnectFailure};
use crate::models::{ConnectionParams, PtyRequest};

/// Remote to local byte stream of a shell channel
pub type IncomingStream = Box<dyn AsyncRead + Send + Unpin>;

/// Local to remote byte stream of a shell channel
pub type OutgoingStream = Box<dyn AsyncWrite + Send + Unpin>;

/// An interactive shell multiplexed over a transport session
///
/// The two halves are independent: the output pump takes `incoming`, the
/// command sink takes `outgoing`.
pub struct ShellChannel {
    /// Bytes produced by the remote shell
    pub incoming: IncomingStream,
    /// Bytes sent to the remote shell
    pub outgoing: OutgoingStream,
}

impl ShellChannel {
    /// Creates a channel from its two stream halves
    pub fn new<R, W>(incoming: R, outgoing: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            incoming: Box::new(incoming),
            outgoing: Box::new(outgoing),
        }
    }

    /// Splits the channel into its incoming and outgoing halves
    #[must_use]
    pub fn into_split(self) -> (IncomingStream, OutgoingStream) {
        (self.incoming, self.outgoing)
    }
}

impl std::fmt::Debug for ShellChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellChannel").finish_non_exhaustive()
    }
}

/// Factory for authenticated transport sessions
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns a short identifier for logs (e.g. "ssh", "simulated")
    fn name(&self) -> &'static str;

    /// Opens an authenticated session to `params.host`
    ///
    /// Handshake and authentication must complete within `timeout`. Dropping
    /// the returned future cancels the attempt and releases its socket.
    ///
    /// # Errors
    ///
    /// Returns `ConnectFailure` classified as unreachable, timeout,
    /// authentication rejected, protocol error, or host key rejected.
    async fn open(
        &self,
        params: &ConnectionParams,
        timeout: Duration,
    ) -> Result<Box<dyn TransportSession>, ConnectFailure>;
}

/// One authenticated connection to a remote host
#[async_trait]
pub trait TransportSession: Send {
    /// Requests a PTY and an interactive shell
    ///
    /// # Errors
    ///
    /// Returns `ChannelFailure::SessionClosed` if the session is closed, or
    /// `ChannelFailure::RemoteRejected` if the remote refuses the request.
    async fn open_shell(&mut self, pty: &PtyRequest) -> Result<ShellChannel, ChannelFailure>;

    /// Closes the session and every channel opened on it
    ///
    /// Idempotent: closing a closed session does nothing.
    async fn close(&mut self);

    /// Returns true once `close()` has run
    fn is_closed(&self) -> bool;
}
