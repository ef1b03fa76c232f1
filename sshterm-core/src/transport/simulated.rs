//! In-process shell transport.
//!
//! `SimulatedTransport` authenticates against an optional fixed password and
//! serves each shell from a spawned task that reads command lines and answers
//! them through a `CommandInterpreter`. Both directions run over a
//! `tokio::io::duplex` pipe, so the controller sees the same byte-stream
//! contract as a real SSH channel.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{
    CommandInterpreter, DemoInterpreter, ShellChannel, ShellContext, ShellResponse, Transport,
    TransportSession,
};
use crate::error::{ChannelFailure, ConnectFailure, ConnectFailureKind};
use crate::models::{ConnectionParams, PtyRequest};

/// Pipe capacity between client and simulated shell
const SHELL_BUFFER: usize = 8 * 1024;

/// Hosts under this suffix are reported as unreachable
const UNREACHABLE_SUFFIX: &str = ".invalid";

/// Transport whose sessions are served by an in-process shell
pub struct SimulatedTransport {
    interpreter: Arc<dyn CommandInterpreter>,
    password: Option<SecretString>,
    handshake_delay: Duration,
    banner: Vec<String>,
    live: Arc<AtomicUsize>,
}

impl SimulatedTransport {
    /// Creates a transport backed by `DemoInterpreter` that accepts any password
    #[must_use]
    pub fn new() -> Self {
        Self {
            interpreter: Arc::new(DemoInterpreter),
            password: None,
            handshake_delay: Duration::ZERO,
            banner: Vec::new(),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Uses a custom interpreter
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: Arc<dyn CommandInterpreter>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Requires this password; any other is rejected
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Delays every handshake by `delay`
    #[must_use]
    pub const fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Lines written by the shell as soon as it opens
    #[must_use]
    pub fn with_banner<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.banner = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Number of handshakes in flight plus sessions not yet closed
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    async fn handshake(&self, params: &ConnectionParams) -> Result<(), ConnectFailure> {
        if !self.handshake_delay.is_zero() {
            tokio::time::sleep(self.handshake_delay).await;
        }
        if params.host.ends_with(UNREACHABLE_SUFFIX) {
            return Err(ConnectFailure::new(
                ConnectFailureKind::Unreachable,
                format!("{}: name does not resolve", params.address()),
            ));
        }
        if let Some(expected) = &self.password {
            if expected.expose_secret() != params.expose_credential() {
                return Err(ConnectFailure::new(
                    ConnectFailureKind::AuthRejected,
                    format!("password rejected for {}", params.username),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn open(
        &self,
        params: &ConnectionParams,
        timeout: Duration,
    ) -> Result<Box<dyn TransportSession>, ConnectFailure> {
        // Held from the first byte of the handshake; released on any exit path
        let guard = LiveGuard::acquire(&self.live);

        tokio::time::timeout(timeout, self.handshake(params))
            .await
            .map_err(|_| ConnectFailure::timeout(timeout))??;

        debug!(peer = %params.display_target(), "Simulated session opened");
        Ok(Box::new(SimulatedSession {
            interpreter: Arc::clone(&self.interpreter),
            ctx: ShellContext {
                username: params.username.clone(),
                host: params.host.clone(),
            },
            banner: self.banner.clone(),
            shell: None,
            guard: Some(guard),
        }))
    }
}

/// Decrements the live counter when dropped
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SimulatedSession {
    interpreter: Arc<dyn CommandInterpreter>,
    ctx: ShellContext,
    banner: Vec<String>,
    shell: Option<JoinHandle<()>>,
    guard: Option<LiveGuard>,
}

#[async_trait]
impl TransportSession for SimulatedSession {
    async fn open_shell(&mut self, pty: &PtyRequest) -> Result<ShellChannel, ChannelFailure> {
        if self.guard.is_none() {
            return Err(ChannelFailure::SessionClosed);
        }
        if self.shell.is_some() {
            return Err(ChannelFailure::RemoteRejected(
                "shell already open on this session".to_string(),
            ));
        }

        debug!(term = %pty.term, cols = pty.cols, rows = pty.rows, "Simulated PTY granted");
        let (client, server) = tokio::io::duplex(SHELL_BUFFER);
        self.shell = Some(tokio::spawn(run_shell(
            server,
            Arc::clone(&self.interpreter),
            self.ctx.clone(),
            self.banner.clone(),
        )));

        let (incoming, outgoing) = tokio::io::split(client);
        Ok(ShellChannel::new(incoming, outgoing))
    }

    async fn close(&mut self) {
        if let Some(shell) = self.shell.take() {
            shell.abort();
            let _ = shell.await;
        }
        if self.guard.take().is_some() {
            debug!(host = %self.ctx.host, "Simulated session closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.guard.is_none()
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        if let Some(shell) = self.shell.take() {
            shell.abort();
        }
    }
}

/// Serves one shell until the client hangs up or the interpreter exits
async fn run_shell(
    stream: DuplexStream,
    interpreter: Arc<dyn CommandInterpreter>,
    ctx: ShellContext,
    banner: Vec<String>,
) {
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    for line in &banner {
        if writer.write_all(format!("{line}\r\n").as_bytes()).await.is_err() {
            return;
        }
    }

    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let command = String::from_utf8_lossy(&buf);
        let command = command.trim_end_matches(['\r', '\n']);

        let reply = match interpreter.execute(&ctx, command) {
            ShellResponse::Output(text) => format!("{text}\r\n"),
            ShellResponse::Clear => "\x1b[H\x1b[2J\r\n".to_string(),
            ShellResponse::Silent => continue,
            ShellResponse::Exit => {
                let _ = writer.write_all(b"logout\r\n").await;
                break;
            }
        };
        if writer.write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}
