//! Line splitting and control-sequence stripping.

use regex::Regex;
use std::sync::LazyLock;

use super::TextEncoding;

/// `ESC [`, parameters made of digits and semicolons, then a final letter
static CONTROL_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("Invalid regex pattern"));

/// Removes `ESC [ <digits;...> <letter>` sequences from `text`
#[must_use]
pub fn strip_control_sequences(text: &str) -> String {
    CONTROL_SEQUENCE.replace_all(text, "").into_owned()
}

/// Erase-display sequence sent by `clear`
const ERASE_DISPLAY: &str = "\x1b[2J";

/// One decoded unit of shell output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    /// A visible line of text
    Text(String),
    /// The remote erased the display
    ClearScreen,
}

/// Incremental decoder from raw shell bytes to display lines
///
/// Bytes are buffered until a `\n` arrives, so a line split across reads is
/// emitted once, whole. Decoding happens per completed line, which keeps
/// multi-byte characters that straddle a read boundary intact.
#[derive(Debug, Default)]
pub struct LineDecoder {
    encoding: TextEncoding,
    pending: Vec<u8>,
}

impl LineDecoder {
    /// Creates a decoder for the given encoding
    #[must_use]
    pub const fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    /// Returns the configured encoding
    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Number of buffered bytes not yet terminated by `\n`
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feeds one chunk and returns the text of every line it completed
    ///
    /// Blank lines (empty after stripping) are dropped, as are screen clears.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        only_text(self.feed_events(chunk))
    }

    /// Feeds one chunk and returns every line and screen clear it completed
    pub fn feed_events(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            self.render(&self.pending[start..end], &mut events);
            start = end + 1;
        }
        self.pending.drain(..start);
        events
    }

    /// Flushes the unterminated remainder as a final line
    ///
    /// Called when the channel closes.
    pub fn finish(&mut self) -> Option<String> {
        only_text(self.finish_events()).pop()
    }

    /// Flushes the unterminated remainder, keeping screen clears
    pub fn finish_events(&mut self) -> Vec<DecodedLine> {
        let rest = std::mem::take(&mut self.pending);
        let mut events = Vec::new();
        self.render(&rest, &mut events);
        events
    }

    fn render(&self, raw: &[u8], events: &mut Vec<DecodedLine>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let decoded = self.encoding.decode(raw);

        // Whatever preceded the last erase on this line is gone from the screen
        let visible = match decoded.rfind(ERASE_DISPLAY) {
            Some(at) => {
                events.push(DecodedLine::ClearScreen);
                &decoded[at + ERASE_DISPLAY.len()..]
            }
            None => decoded.as_str(),
        };

        let text = strip_control_sequences(visible);
        if !text.trim().is_empty() {
            events.push(DecodedLine::Text(text));
        }
    }
}

fn only_text(events: Vec<DecodedLine>) -> Vec<String> {
    events
        .into_iter()
        .filter_map(|event| match event {
            DecodedLine::Text(text) => Some(text),
            DecodedLine::ClearScreen => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_colour_sequences() {
        assert_eq!(strip_control_sequences("\x1b[31mHello\x1b[0m"), "Hello");
        assert_eq!(strip_control_sequences("\x1b[1;32mok\x1b[m"), "ok");
    }

    #[test]
    fn test_strip_keeps_other_escapes() {
        // private-mode parameters are outside the stripped pattern
        assert_eq!(strip_control_sequences("\x1b[?2004h$ "), "\x1b[?2004h$ ");
    }

    #[test]
    fn test_partial_line_across_reads() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.feed(b"abc").is_empty());
        assert_eq!(decoder.pending_len(), 3);
        assert_eq!(decoder.feed(b"def\n"), vec!["abcdef".to_string()]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_coloured_line_split_over_chunks() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.feed(b"\x1b[31mHello").is_empty());
        assert_eq!(decoder.feed(b"\x1b[0m\n"), vec!["Hello".to_string()]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let mut decoder = LineDecoder::default();
        let lines = decoder.feed(b"one\r\n\r\n   \n\x1b[0m\ntwo\n");
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_multibyte_char_split_across_reads() {
        let mut decoder = LineDecoder::default();
        let bytes = "héllo\n".as_bytes();
        assert!(decoder.feed(&bytes[..2]).is_empty());
        assert_eq!(decoder.feed(&bytes[2..]), vec!["héllo".to_string()]);
    }

    #[test]
    fn test_finish_flushes_remainder() {
        let mut decoder = LineDecoder::default();
        decoder.feed(b"prompt$ ");
        assert_eq!(decoder.finish(), Some("prompt$ ".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_finish_skips_blank_remainder() {
        let mut decoder = LineDecoder::default();
        decoder.feed(b"line\n\x1b[0m");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_latin1_decoding() {
        let mut decoder = LineDecoder::new(TextEncoding::Latin1);
        assert_eq!(decoder.feed(b"caf\xe9\n"), vec!["café".to_string()]);
    }

    #[test]
    fn test_erase_display_becomes_clear_event() {
        let mut decoder = LineDecoder::default();
        let events = decoder.feed_events(b"old\n\x1b[H\x1b[2J\r\nnew\n");
        assert_eq!(
            events,
            vec![
                DecodedLine::Text("old".to_string()),
                DecodedLine::ClearScreen,
                DecodedLine::Text("new".to_string()),
            ]
        );
    }

    #[test]
    fn test_text_after_erase_on_same_line_kept() {
        let mut decoder = LineDecoder::default();
        let events = decoder.feed_events(b"gone\x1b[2J\x1b[Halice\n");
        assert_eq!(
            events,
            vec![DecodedLine::ClearScreen, DecodedLine::Text("alice".to_string())]
        );
        // plain feed only reports the text
        assert_eq!(
            LineDecoder::default().feed(b"\x1b[2J\n"),
            Vec::<String>::new()
        );
    }
}
