//! Command sink: writes command lines to a shell's outgoing stream.

use std::borrow::Cow;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::WriteFailure;
use crate::terminal::TextEncoding;
use crate::transport::OutgoingStream;

/// Appends `\n` unless the command already ends with one
#[must_use]
pub fn normalize_command(command: &str) -> Cow<'_, str> {
    if command.ends_with('\n') {
        Cow::Borrowed(command)
    } else {
        Cow::Owned(format!("{command}\n"))
    }
}

/// Cloneable writer for the outgoing half of a shell channel
///
/// Writes are serialized by an async mutex, so clones may send from
/// different tasks while the output pump reads the other half.
#[derive(Clone)]
pub struct CommandSink {
    outgoing: Arc<Mutex<Option<OutgoingStream>>>,
    encoding: TextEncoding,
}

impl CommandSink {
    /// Wraps an outgoing stream
    pub fn new<W>(outgoing: W, encoding: TextEncoding) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::from_boxed(Box::new(outgoing), encoding)
    }

    pub(crate) fn from_boxed(outgoing: OutgoingStream, encoding: TextEncoding) -> Self {
        Self {
            outgoing: Arc::new(Mutex::new(Some(outgoing))),
            encoding,
        }
    }

    /// Writes one newline-terminated command and flushes it
    ///
    /// # Errors
    ///
    /// Returns `WriteFailure::ChannelClosed` if the sink was closed or the
    /// remote end is gone, and `WriteFailure::Io` for other stream errors.
    pub async fn send(&self, command: &str) -> Result<(), WriteFailure> {
        let bytes = self.encoding.encode(&normalize_command(command));

        let mut outgoing = self.outgoing.lock().await;
        let stream = outgoing.as_mut().ok_or(WriteFailure::ChannelClosed)?;
        stream.write_all(&bytes).await.map_err(classify)?;
        stream.flush().await.map_err(classify)?;
        Ok(())
    }

    /// Shuts the stream down; later sends fail with `ChannelClosed`
    pub async fn close(&self) {
        if let Some(mut stream) = self.outgoing.lock().await.take() {
            let _ = stream.shutdown().await;
        }
    }

    /// Returns true once `close()` has run
    pub async fn is_closed(&self) -> bool {
        self.outgoing.lock().await.is_none()
    }
}

impl std::fmt::Debug for CommandSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSink")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

fn classify(e: std::io::Error) -> WriteFailure {
    match e.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::NotConnected
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted => WriteFailure::ChannelClosed,
        _ => WriteFailure::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("ls"), "ls\n");
        assert_eq!(normalize_command("ls\n"), "ls\n");
        assert_eq!(normalize_command(""), "\n");
        assert!(matches!(normalize_command("pwd\n"), Cow::Borrowed(_)));
    }

    #[tokio::test]
    async fn test_send_writes_exact_bytes() {
        let (local, mut remote) = tokio::io::duplex(64);
        let sink = CommandSink::new(local, TextEncoding::Utf8);
        sink.send("ls").await.unwrap();
        sink.send("ls\n").await.unwrap();
        sink.close().await;

        let mut written = Vec::new();
        remote.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, b"ls\nls\n");
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (local, _remote) = tokio::io::duplex(64);
        let sink = CommandSink::new(local, TextEncoding::Utf8);
        sink.close().await;
        assert!(sink.is_closed().await);
        assert!(matches!(
            sink.send("ls").await,
            Err(WriteFailure::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_is_channel_closed() {
        let (local, remote) = tokio::io::duplex(64);
        drop(remote);
        let sink = CommandSink::new(local, TextEncoding::Utf8);
        assert!(matches!(
            sink.send("ls").await,
            Err(WriteFailure::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_latin1_encoding_applied() {
        let (local, mut remote) = tokio::io::duplex(64);
        let sink = CommandSink::new(local, TextEncoding::Latin1);
        sink.send("café").await.unwrap();
        sink.close().await;

        let mut written = Vec::new();
        remote.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, vec![b'c', b'a', b'f', 0xe9, b'\n']);
    }
}
