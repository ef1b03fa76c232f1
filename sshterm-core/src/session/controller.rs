//! Session controller
//!
//! `SessionController` owns the connection lifecycle. Callers drive it with
//! `connect`, `send` and `disconnect`, and observe it through a `LogFeed`
//! subscription and a `watch` channel of `ConnectionState`.
//!
//! State and the active `SessionHandle` sit behind one async mutex. The lock
//! is never held across the handshake or across the worker join, so a
//! `disconnect()` issued during a slow connect can still reach the pending
//! attempt and cancel it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::{
    CommandSink, ConnectionState, FeedEmitter, LogFeed, OutputPump, SessionHandle, SessionInfo,
};
use crate::error::{
    ConnectFailure, ControllerError, ControllerResult, PumpEnded, TranscriptError,
    TranscriptResult, WriteFailure,
};
use crate::logging::span_names;
use crate::models::{join_lines, ConnectionParams, LineSource, LogLine, PtyRequest, TranscriptRecord};
use crate::terminal::{LineDecoder, TextEncoding};
use crate::transcript::TranscriptStore;
use crate::transport::{IncomingStream, ShellChannel, Transport, TransportSession};

/// Default handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-controller session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Upper bound for handshake plus authentication
    pub connect_timeout: Duration,
    /// PTY requested for the shell
    pub pty: PtyRequest,
    /// Encoding of shell input and output
    pub encoding: TextEncoding,
    /// Emit a `$ <command>` line for each sent command
    pub local_echo: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            pty: PtyRequest::default(),
            encoding: TextEncoding::default(),
            local_echo: true,
        }
    }
}

impl SessionOptions {
    /// Sets the connect timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the PTY request
    #[must_use]
    pub fn with_pty(mut self, pty: PtyRequest) -> Self {
        self.pty = pty;
        self
    }

    /// Sets the text encoding
    #[must_use]
    pub const fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Enables or disables local echo
    #[must_use]
    pub const fn with_local_echo(mut self, enabled: bool) -> Self {
        self.local_echo = enabled;
        self
    }
}

#[derive(Default)]
struct Inner {
    handle: Option<SessionHandle>,
    cancel: Option<oneshot::Sender<()>>,
    last_host: Option<String>,
}

/// State shared between the controller and its session worker
struct Shared {
    inner: Mutex<Inner>,
    state: watch::Sender<ConnectionState>,
    feed: FeedEmitter,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Must be called with `inner` locked
    fn set_state(&self, state: ConnectionState) {
        debug!(state = %state, "Connection state changed");
        self.state.send_replace(state);
    }

    fn system(&self, text: impl std::fmt::Display) {
        self.feed.emit(LineSource::System, format!("System: {text}"));
    }
}

/// Lifecycle façade over a transport, shell channel, output pump and sink
///
/// At most one session is active per controller. Dropping the controller
/// signals the active session to shut down; its worker finishes the teardown
/// in the background.
pub struct SessionController {
    transport: Arc<dyn Transport>,
    options: SessionOptions,
    shared: Arc<Shared>,
}

impl SessionController {
    /// Creates a controller with default options
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_options(transport, SessionOptions::default())
    }

    /// Creates a controller with explicit options
    #[must_use]
    pub fn with_options(transport: Arc<dyn Transport>, options: SessionOptions) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            options,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                state,
                feed: FeedEmitter::new(),
            }),
        }
    }

    /// Returns the session options
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns the transport's name
    #[must_use]
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Returns the current state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Returns a receiver that observes every state change
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Subscribes to lines emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> LogFeed {
        self.shared.feed.subscribe()
    }

    /// Lines of the current or most recent session
    #[must_use]
    pub fn transcript(&self) -> Vec<LogLine> {
        self.shared.feed.transcript()
    }

    /// Newline-joined text of `transcript()`
    #[must_use]
    pub fn transcript_text(&self) -> String {
        join_lines(&self.transcript())
    }

    /// Summary of the active session, if connected
    pub async fn session_info(&self) -> Option<SessionInfo> {
        let inner = self.shared.inner.lock().await;
        inner.handle.as_ref().map(|h| h.info.clone())
    }

    /// Identifier of the active session, if connected
    pub async fn session_id(&self) -> Option<Uuid> {
        self.session_info().await.map(|info| info.id)
    }

    /// Opens a session and starts its output pump
    ///
    /// Suspends until the shell is open, the attempt fails, or `disconnect()`
    /// cancels it.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the controller is `Disconnected`; the current
    ///   session is left untouched.
    /// - `InvalidParams` if `params` fail validation.
    /// - `Connect` or `Channel` if the attempt fails; the controller is then
    ///   `Failed` until acknowledged.
    /// - `Cancelled` if `disconnect()` interrupted the attempt.
    pub async fn connect(&self, params: ConnectionParams) -> ControllerResult<()> {
        let span = tracing::info_span!(
            span_names::CONNECT,
            host = %params.host,
            port = params.port,
            transport = self.transport.name()
        );
        self.connect_inner(params).instrument(span).await
    }

    async fn connect_inner(&self, params: ConnectionParams) -> ControllerResult<()> {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut inner = self.shared.inner.lock().await;
            let state = self.shared.state();
            if state != ConnectionState::Disconnected {
                return Err(ControllerError::InvalidState {
                    operation: "connect",
                    state: state.to_string(),
                });
            }
            params.validate()?;

            inner.cancel = Some(cancel_tx);
            inner.last_host = Some(params.host.clone());
            self.shared.feed.reset();
            self.shared.set_state(ConnectionState::Connecting);
            self.shared.system(format_args!(
                "Connecting to {} as {}",
                params.host, params.username
            ));
        }

        let outcome = tokio::select! {
            result = self.establish(&params) => Some(result),
            _ = cancel_rx => None,
        };

        let mut inner = self.shared.inner.lock().await;
        inner.cancel = None;
        match outcome {
            None => {
                self.shared.set_state(ConnectionState::Disconnected);
                self.shared
                    .system(format_args!("Connection to {} cancelled", params.host));
                info!("Connection attempt cancelled");
                Err(ControllerError::Cancelled)
            }
            Some(Err(e)) => {
                warn!(error = %e, "Connection attempt failed");
                self.shared.set_state(ConnectionState::Failed(e.to_string()));
                self.shared.system(&e);
                Err(e)
            }
            Some(Ok((session, channel))) => {
                let info = SessionInfo::new(params.host.clone(), params.username.clone());
                inner.handle = Some(self.start_worker(info.clone(), session, channel));
                self.shared.set_state(ConnectionState::Connected);
                self.shared.system(format_args!(
                    "Connected to {} as {}",
                    info.host, info.username
                ));
                info!(session_id = %info.id, "Session connected");
                Ok(())
            }
        }
    }

    /// Opens the transport session and its shell
    ///
    /// One deadline covers both steps, so a server that authenticates but
    /// never answers the PTY or shell request still times out. Dropping this
    /// future (on cancel) drops the half-open session, which releases its
    /// socket.
    async fn establish(
        &self,
        params: &ConnectionParams,
    ) -> ControllerResult<(Box<dyn TransportSession>, ShellChannel)> {
        let timeout = self.options.connect_timeout;
        let deadline = Instant::now() + timeout;

        let mut session = self.transport.open(params, timeout).await?;
        let opened =
            tokio::time::timeout_at(deadline, session.open_shell(&self.options.pty)).await;
        match opened {
            Ok(Ok(channel)) => Ok((session, channel)),
            Ok(Err(e)) => {
                session.close().await;
                Err(e.into())
            }
            Err(_) => {
                session.close().await;
                Err(ConnectFailure::timeout(timeout).into())
            }
        }
    }

    /// Spawns the worker that runs the pump and then tears the session down
    ///
    /// Called with `inner` locked, so the worker cannot observe the handle
    /// before it is stored.
    fn start_worker(
        &self,
        info: SessionInfo,
        session: Box<dyn TransportSession>,
        channel: ShellChannel,
    ) -> SessionHandle {
        let (incoming, outgoing) = channel.into_split();
        let sink = CommandSink::from_boxed(outgoing, self.options.encoding);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let span = tracing::info_span!(span_names::SESSION_WORKER, session_id = %info.id);
        let worker = tokio::spawn(
            run_session_worker(
                Arc::clone(&self.shared),
                info.clone(),
                session,
                incoming,
                sink.clone(),
                LineDecoder::new(self.options.encoding),
                shutdown_rx,
            )
            .instrument(span),
        );

        SessionHandle::new(info, sink, shutdown_tx, worker)
    }

    /// Writes one command to the shell
    ///
    /// With local echo on, a `$ <command>` line is emitted first.
    ///
    /// # Errors
    ///
    /// Returns `Write(ChannelClosed)` when not connected, or the sink's
    /// `WriteFailure` if the write fails.
    pub async fn send(&self, command: &str) -> ControllerResult<()> {
        let sink = {
            let inner = self.shared.inner.lock().await;
            match (self.shared.state(), inner.handle.as_ref()) {
                (ConnectionState::Connected, Some(handle)) => handle.sink.clone(),
                _ => return Err(WriteFailure::ChannelClosed.into()),
            }
        };

        if self.options.local_echo {
            let echoed = command.strip_suffix('\n').unwrap_or(command);
            self.shared
                .feed
                .emit(LineSource::LocalEcho, format!("$ {echoed}"));
        }
        sink.send(command).await?;
        Ok(())
    }

    /// Ends the session, or cancels a pending connect
    ///
    /// Safe from any state and idempotent. Returns once the controller is
    /// `Disconnected`, with the transport closed and the worker finished.
    /// From `Failed` it acts as `acknowledge()`.
    pub async fn disconnect(&self) {
        let span = tracing::info_span!(span_names::DISCONNECT);
        self.disconnect_inner().instrument(span).await;
    }

    async fn disconnect_inner(&self) {
        let mut state_rx = self.shared.state.subscribe();
        loop {
            let mut inner = self.shared.inner.lock().await;
            match self.shared.state() {
                ConnectionState::Disconnected => return,
                ConnectionState::Failed(_) => {
                    self.shared.set_state(ConnectionState::Disconnected);
                    return;
                }
                ConnectionState::Connecting => {
                    if let Some(cancel) = inner.cancel.take() {
                        let _ = cancel.send(());
                    }
                    drop(inner);
                    let _ = state_rx
                        .wait_for(|s| *s != ConnectionState::Connecting)
                        .await;
                }
                ConnectionState::Disconnecting => {
                    drop(inner);
                    let _ = state_rx
                        .wait_for(|s| *s != ConnectionState::Disconnecting)
                        .await;
                }
                ConnectionState::Connected => {
                    let handle = inner.handle.take();
                    self.shared.set_state(ConnectionState::Disconnecting);
                    drop(inner);

                    let host = match handle {
                        Some(handle) => Some(handle.shutdown_and_join().await.host),
                        None => None,
                    };

                    let _inner = self.shared.inner.lock().await;
                    self.shared.set_state(ConnectionState::Disconnected);
                    if let Some(host) = host {
                        self.shared.system(format_args!("Disconnected from {host}"));
                        info!(%host, "Session disconnected");
                    }
                    return;
                }
            }
        }
    }

    /// Clears a `Failed` state
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` from `Connecting`, `Connected` or
    /// `Disconnecting`. From `Disconnected` it does nothing.
    pub async fn acknowledge(&self) -> ControllerResult<()> {
        let _inner = self.shared.inner.lock().await;
        match self.shared.state() {
            ConnectionState::Failed(_) => {
                self.shared.set_state(ConnectionState::Disconnected);
                Ok(())
            }
            ConnectionState::Disconnected => Ok(()),
            other => Err(ControllerError::InvalidState {
                operation: "acknowledge",
                state: other.to_string(),
            }),
        }
    }

    /// Saves the current transcript to `store`
    ///
    /// # Errors
    ///
    /// Returns `TranscriptError::Empty` if no session has produced lines, or
    /// the store's error.
    pub async fn save_transcript(&self, store: &dyn TranscriptStore) -> TranscriptResult<Uuid> {
        let host = self.shared.inner.lock().await.last_host.clone();
        let lines = self.transcript();
        let Some(host) = host.filter(|_| !lines.is_empty()) else {
            return Err(TranscriptError::Empty);
        };
        store.save(TranscriptRecord::from_lines(host, &lines))
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.try_lock() {
            if let Some(cancel) = inner.cancel.take() {
                let _ = cancel.send(());
            }
            if let Some(handle) = inner.handle.as_ref() {
                handle.signal_shutdown();
            }
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("transport", &self.transport.name())
            .field("options", &self.options)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Runs the output pump, then closes the session
///
/// If the handle is still registered when the pump ends, the remote ended
/// the session and this worker owns the transition through `Disconnecting`
/// to `Disconnected`. Otherwise `disconnect()` owns it and is waiting on
/// this task.
async fn run_session_worker(
    shared: Arc<Shared>,
    info: SessionInfo,
    mut session: Box<dyn TransportSession>,
    incoming: IncomingStream,
    sink: CommandSink,
    decoder: LineDecoder,
    shutdown: watch::Receiver<bool>,
) {
    let ended = OutputPump::new(incoming, decoder, shared.feed.clone())
        .run(shutdown)
        .await;

    let owns_transition = {
        let mut inner = shared.inner.lock().await;
        // Reported under the lock so it lands after `Connected` and before any
        // `Disconnected` line, whichever side ends the session
        if ended != PumpEnded::Closed {
            shared.system(format_args!("Session ended: {ended}"));
        }
        let registered = inner.handle.as_ref().is_some_and(|h| h.info.id == info.id);
        if registered {
            inner.handle = None;
            shared.set_state(ConnectionState::Disconnecting);
        }
        registered
    };
    info!(reason = %ended, "Session worker stopping");

    // Closing the session first unblocks any send still waiting on the sink
    session.close().await;
    sink.close().await;
    drop(session);
    drop(sink);

    // When the worker owns the transition its handle was dropped unjoined, so
    // publishing `Disconnected` must be the last thing it does
    if owns_transition {
        let _inner = shared.inner.lock().await;
        shared.set_state(ConnectionState::Disconnected);
        shared.system(format_args!("Disconnected from {}", info.host));
    }
}
