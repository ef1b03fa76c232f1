//! SSH transport backed by `russh`.

use async_trait::async_trait;
use russh::client::{self, AuthResult, Handle, Msg};
use russh::keys::ssh_key::{HashAlg, PublicKey};
use russh::{Channel, ChannelMsg, Disconnect};
use std::net::Shutdown;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{fingerprints_match, HostKeyPolicy, ShellChannel, Transport, TransportSession};
use crate::error::{ChannelFailure, ConnectFailure, ConnectFailureKind};
use crate::models::{ConnectionParams, PtyRequest};

/// Password-authenticated SSH client transport
pub struct RusshTransport {
    policy: HostKeyPolicy,
    config: Arc<client::Config>,
}

impl RusshTransport {
    /// Creates a transport that verifies server keys with `policy`
    #[must_use]
    pub fn new(policy: HostKeyPolicy) -> Self {
        Self {
            policy,
            config: Arc::new(client::Config::default()),
        }
    }

    /// Returns the host key policy
    #[must_use]
    pub const fn policy(&self) -> &HostKeyPolicy {
        &self.policy
    }

    async fn handshake(
        &self,
        stream: TcpStream,
        params: &ConnectionParams,
    ) -> Result<Handle<HostKeyCheck>, ConnectFailure> {
        let rejection = Arc::new(Mutex::new(None));
        let handler = HostKeyCheck {
            policy: self.policy.clone(),
            host: params.host.clone(),
            port: params.port,
            rejection: Arc::clone(&rejection),
        };

        let mut handle = client::connect_stream(Arc::clone(&self.config), stream, handler)
            .await
            .map_err(|e| {
                let rejected = rejection.lock().ok().and_then(|mut slot| slot.take());
                match rejected {
                    Some(reason) => ConnectFailure::new(ConnectFailureKind::HostKeyRejected, reason),
                    None => ConnectFailure::new(ConnectFailureKind::ProtocolError, e.to_string()),
                }
            })?;

        let auth = handle
            .authenticate_password(params.username.as_str(), params.expose_credential())
            .await
            .map_err(|e| ConnectFailure::new(ConnectFailureKind::ProtocolError, e.to_string()))?;

        if !matches!(auth, AuthResult::Success) {
            return Err(ConnectFailure::new(
                ConnectFailureKind::AuthRejected,
                format!("password rejected for {}", params.username),
            ));
        }
        Ok(handle)
    }
}

impl Default for RusshTransport {
    fn default() -> Self {
        Self::new(HostKeyPolicy::default())
    }
}

#[async_trait]
impl Transport for RusshTransport {
    fn name(&self) -> &'static str {
        "ssh"
    }

    async fn open(
        &self,
        params: &ConnectionParams,
        timeout: Duration,
    ) -> Result<Box<dyn TransportSession>, ConnectFailure> {
        let deadline = Instant::now() + timeout;
        if self.policy.is_insecure() {
            warn!(host = %params.host, "Host key verification disabled for this connection");
        }

        let stream = match tokio::time::timeout_at(
            deadline,
            TcpStream::connect((params.host.as_str(), params.port)),
        )
        .await
        {
            Err(_) => return Err(ConnectFailure::timeout(timeout)),
            Ok(Err(e)) => {
                return Err(ConnectFailure::new(
                    ConnectFailureKind::Unreachable,
                    format!("{}: {e}", params.address()),
                ))
            }
            Ok(Ok(stream)) => stream,
        };

        // The guard outlives russh's background task on every failure path
        let (stream, guard) = SocketGuard::attach(stream).map_err(|e| {
            ConnectFailure::new(ConnectFailureKind::ProtocolError, e.to_string())
        })?;

        let handle = tokio::time::timeout_at(deadline, self.handshake(stream, params))
            .await
            .map_err(|_| ConnectFailure::timeout(timeout))??;

        info!(peer = %params.display_target(), "SSH session authenticated");
        Ok(Box::new(RusshSession {
            handle,
            guard: Some(guard),
        }))
    }
}

/// Shuts the TCP socket down when dropped
///
/// Holds a duplicate of the descriptor handed to russh, so abandoning a
/// handshake or session closes the connection even while russh's own task
/// still owns the stream.
struct SocketGuard {
    socket: std::net::TcpStream,
}

impl SocketGuard {
    fn attach(stream: TcpStream) -> std::io::Result<(TcpStream, Self)> {
        let stream = stream.into_std()?;
        let socket = stream.try_clone()?;
        Ok((TcpStream::from_std(stream)?, Self { socket }))
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        let _ = self.socket.shutdown(Shutdown::Both);
    }
}

/// russh client handler that applies the host key policy
struct HostKeyCheck {
    policy: HostKeyPolicy,
    host: String,
    port: u16,
    rejection: Arc<Mutex<Option<String>>>,
}

impl HostKeyCheck {
    fn verify(&self, key: &PublicKey) -> Result<(), String> {
        match &self.policy {
            HostKeyPolicy::AcceptAll => Ok(()),
            HostKeyPolicy::Fingerprint { sha256 } => {
                let actual = key.fingerprint(HashAlg::Sha256).to_string();
                if fingerprints_match(sha256, &actual) {
                    Ok(())
                } else {
                    Err(format!("fingerprint {actual} does not match {sha256}"))
                }
            }
            HostKeyPolicy::KnownHosts { .. } => {
                let path = self
                    .policy
                    .known_hosts_path()
                    .ok_or_else(|| "home directory not found".to_string())?;
                match russh::keys::check_known_hosts_path(&self.host, self.port, key, &path) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(format!(
                        "{} is not in {} (fingerprint {})",
                        self.host,
                        path.display(),
                        key.fingerprint(HashAlg::Sha256)
                    )),
                    Err(e) => Err(format!("{}: {e}", path.display())),
                }
            }
        }
    }
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        match self.verify(server_public_key) {
            Ok(()) => {
                debug!(host = %self.host, "Server key accepted");
                Ok(true)
            }
            Err(reason) => {
                warn!(host = %self.host, %reason, "Server key rejected");
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(reason);
                }
                Ok(false)
            }
        }
    }
}

struct RusshSession {
    handle: Handle<HostKeyCheck>,
    guard: Option<SocketGuard>,
}

#[async_trait]
impl TransportSession for RusshSession {
    async fn open_shell(&mut self, pty: &PtyRequest) -> Result<ShellChannel, ChannelFailure> {
        if self.guard.is_none() {
            return Err(ChannelFailure::SessionClosed);
        }

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| ChannelFailure::RemoteRejected(e.to_string()))?;

        channel
            .request_pty(true, &pty.term, pty.cols, pty.rows, 0, 0, &[])
            .await
            .map_err(|_| ChannelFailure::SessionClosed)?;
        // Output may arrive before the shell reply; keep it for the pump
        let mut preamble = Vec::new();
        await_reply(&mut channel, "pty", &mut preamble).await?;

        channel
            .request_shell(true)
            .await
            .map_err(|_| ChannelFailure::SessionClosed)?;
        await_reply(&mut channel, "shell", &mut preamble).await?;

        let (reader, writer) = tokio::io::split(channel.into_stream());
        let incoming = std::io::Cursor::new(preamble).chain(reader);
        Ok(ShellChannel::new(incoming, writer))
    }

    async fn close(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!(error = %e, "Disconnect message not delivered");
        }
        drop(guard);
    }

    fn is_closed(&self) -> bool {
        self.guard.is_none()
    }
}

/// Waits for the reply to a `want_reply` channel request
async fn await_reply(
    channel: &mut Channel<Msg>,
    request: &str,
    preamble: &mut Vec<u8>,
) -> Result<(), ChannelFailure> {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => return Ok(()),
            Some(ChannelMsg::Failure) => {
                return Err(ChannelFailure::RemoteRejected(format!(
                    "{request} request refused"
                )))
            }
            Some(ChannelMsg::Data { data }) => preamble.extend_from_slice(&data),
            Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                return Err(ChannelFailure::SessionClosed)
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_refused_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = RusshTransport::new(HostKeyPolicy::AcceptAll);
        let params = ConnectionParams::new("127.0.0.1", port, "alice", "pw");
        let err = transport
            .open(&params, Duration::from_secs(2))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, ConnectFailureKind::Unreachable);
    }

    #[tokio::test]
    async fn test_silent_server_times_out_and_socket_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = RusshTransport::new(HostKeyPolicy::AcceptAll);
        let params = ConnectionParams::new("127.0.0.1", port, "alice", "pw");
        let err = transport
            .open(&params, Duration::from_millis(200))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, ConnectFailureKind::Timeout);

        // The server side must observe the client going away
        let (mut server, _) = listener.accept().await.unwrap();
        let mut sink = Vec::new();
        // FIN or RST both count; only a hang means the socket leaked
        let closed =
            tokio::time::timeout(Duration::from_secs(2), server.read_to_end(&mut sink)).await;
        assert!(closed.is_ok(), "client socket left open after timeout");
    }
}
