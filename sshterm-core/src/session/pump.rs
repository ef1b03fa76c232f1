//! Output pump: drains a shell's incoming stream into the line feed.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tracing::debug;

use super::FeedEmitter;
use crate::error::PumpEnded;
use crate::models::LineSource;
use crate::terminal::{DecodedLine, LineDecoder};

/// Bytes requested per read
const READ_BUFFER: usize = 4096;

/// Turns raw shell output into `RemoteOutput` lines and `Clear` markers
pub struct OutputPump<R> {
    incoming: R,
    decoder: LineDecoder,
    feed: FeedEmitter,
}

impl<R: AsyncRead + Unpin> OutputPump<R> {
    /// Creates a pump over `incoming`
    pub const fn new(incoming: R, decoder: LineDecoder, feed: FeedEmitter) -> Self {
        Self {
            incoming,
            decoder,
            feed,
        }
    }

    /// Reads until end of stream, a read error, or `shutdown` turns true
    ///
    /// The read is raced against the shutdown signal, so a pump blocked on a
    /// silent remote stops as soon as the signal is raised. Any unterminated
    /// remainder is emitted before returning. The returned reason is the only
    /// report of the pump's end.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PumpEnded {
        let mut buf = vec![0u8; READ_BUFFER];

        let ended = loop {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break PumpEnded::Closed,
                read = self.incoming.read(&mut buf) => match read {
                    Ok(0) => break PumpEnded::Eof,
                    Ok(n) => {
                        let events = self.decoder.feed_events(&buf[..n]);
                        self.publish(events);
                    }
                    Err(e) => break PumpEnded::ReadError(e.to_string()),
                },
            }
        };

        let rest = self.decoder.finish_events();
        self.publish(rest);
        debug!(reason = %ended, "Output pump stopped");
        ended
    }

    fn publish(&self, events: Vec<DecodedLine>) {
        for event in events {
            match event {
                DecodedLine::Text(text) => self.feed.emit(LineSource::RemoteOutput, text),
                DecodedLine::ClearScreen => self.feed.emit(LineSource::Clear, String::new()),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::TextEncoding;
    use tokio::io::AsyncWriteExt;

    fn texts(feed: &FeedEmitter) -> Vec<String> {
        feed.transcript().into_iter().map(|l| l.text).collect()
    }

    #[tokio::test]
    async fn test_chunks_join_into_one_line() {
        let (mut remote, local) = tokio::io::duplex(64);
        let feed = FeedEmitter::new();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let pump = OutputPump::new(local, LineDecoder::default(), feed.clone());
        let task = tokio::spawn(pump.run(stop_rx));

        remote.write_all(b"abc").await.unwrap();
        remote.flush().await.unwrap();
        tokio::task::yield_now().await;
        remote.write_all(b"def\n").await.unwrap();
        drop(remote);

        assert_eq!(task.await.unwrap(), PumpEnded::Eof);
        assert_eq!(texts(&feed), vec!["abcdef".to_string()]);
    }

    #[tokio::test]
    async fn test_control_sequences_stripped() {
        let (mut remote, local) = tokio::io::duplex(64);
        let feed = FeedEmitter::new();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(OutputPump::new(local, LineDecoder::default(), feed.clone()).run(stop_rx));

        remote.write_all(b"\x1b[31mHello").await.unwrap();
        remote.write_all(b"\x1b[0m\n").await.unwrap();
        drop(remote);

        assert_eq!(task.await.unwrap(), PumpEnded::Eof);
        assert_eq!(texts(&feed), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_shutdown_unblocks_silent_stream_and_flushes() {
        let (mut remote, local) = tokio::io::duplex(64);
        let feed = FeedEmitter::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(
            OutputPump::new(local, LineDecoder::new(TextEncoding::Utf8), feed.clone()).run(stop_rx),
        );

        remote.write_all(b"partial").await.unwrap();
        tokio::task::yield_now().await;
        stop_tx.send(true).unwrap();

        // the remote end stays open; only the signal can end the pump
        let ended = tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ended, PumpEnded::Closed);
        drop(remote);
    }

    #[tokio::test]
    async fn test_remainder_flushed_on_eof() {
        let (mut remote, local) = tokio::io::duplex(64);
        let feed = FeedEmitter::new();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(OutputPump::new(local, LineDecoder::default(), feed.clone()).run(stop_rx));

        remote.write_all(b"one\nprompt$ ").await.unwrap();
        drop(remote);

        assert_eq!(task.await.unwrap(), PumpEnded::Eof);
        assert_eq!(
            texts(&feed),
            vec!["one".to_string(), "prompt$ ".to_string()]
        );
    }

    #[tokio::test]
    async fn test_clear_screen_published_in_order() {
        let (mut remote, local) = tokio::io::duplex(64);
        let feed = FeedEmitter::new();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(OutputPump::new(local, LineDecoder::default(), feed.clone()).run(stop_rx));

        remote.write_all(b"old\r\n\x1b[H\x1b[2J\r\nnew\r\n").await.unwrap();
        drop(remote);

        assert_eq!(task.await.unwrap(), PumpEnded::Eof);
        let sources: Vec<LineSource> = feed.transcript().iter().map(|l| l.source).collect();
        assert_eq!(
            sources,
            vec![LineSource::RemoteOutput, LineSource::Clear, LineSource::RemoteOutput]
        );
        assert_eq!(texts(&feed), vec!["old".to_string(), String::new(), "new".to_string()]);
    }
}
