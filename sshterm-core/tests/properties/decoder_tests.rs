//! Property-based tests for incremental line decoding
//!
//! A line split across reads must come out once, whole, no matter where the
//! read boundaries fall.

use proptest::prelude::*;
use sshterm_core::terminal::{strip_control_sequences, LineDecoder, TextEncoding};

/// Strategy for visible line content, including multi-byte characters
fn arb_line() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _./é漢ß-]{1,24}".prop_filter("line must not be blank", |s| !s.trim().is_empty())
}

fn arb_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_line(), 1..8)
}

fn decode_in_chunks(bytes: &[u8], cuts: &[usize]) -> Vec<String> {
    let mut decoder = LineDecoder::new(TextEncoding::Utf8);
    let mut lines = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        let cut = cut.min(bytes.len()).max(start);
        lines.extend(decoder.feed(&bytes[start..cut]));
        start = cut;
    }
    lines.extend(decoder.feed(&bytes[start..]));
    lines.extend(decoder.finish());
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Splitting the byte stream at arbitrary points never changes the lines
    #[test]
    fn prop_chunking_does_not_change_lines(
        lines in arb_lines(),
        mut cuts in prop::collection::vec(0usize..256, 0..6),
    ) {
        let bytes = lines.join("\n").into_bytes();
        cuts.sort_unstable();

        let whole = decode_in_chunks(&bytes, &[]);
        let chunked = decode_in_chunks(&bytes, &cuts);

        prop_assert_eq!(&whole, &lines);
        prop_assert_eq!(chunked, lines);
    }

    /// CRLF line endings decode to the same lines as LF
    #[test]
    fn prop_crlf_equivalent_to_lf(lines in arb_lines()) {
        let lf = lines.join("\n") + "\n";
        let crlf = lines.join("\r\n") + "\r\n";

        let mut a = LineDecoder::new(TextEncoding::Utf8);
        let mut b = LineDecoder::new(TextEncoding::Utf8);
        prop_assert_eq!(a.feed(lf.as_bytes()), b.feed(crlf.as_bytes()));
        prop_assert_eq!(a.pending_len(), 0);
        prop_assert_eq!(b.pending_len(), 0);
    }

    /// Colour sequences wrapped around text are removed completely
    #[test]
    fn prop_colour_sequences_stripped(
        text in arb_line(),
        codes in prop::collection::vec(0u8..108, 1..4),
    ) {
        let params = codes.iter().map(u8::to_string).collect::<Vec<_>>().join(";");
        let coloured = format!("\x1b[{params}m{text}\x1b[0m");
        prop_assert_eq!(strip_control_sequences(&coloured), text);
    }

    /// Feeding only blank lines yields nothing
    #[test]
    fn prop_blank_lines_dropped(spaces in prop::collection::vec("[ \t]{0,4}", 1..6)) {
        let input = spaces.join("\n") + "\n";
        let mut decoder = LineDecoder::new(TextEncoding::Utf8);
        prop_assert!(decoder.feed(input.as_bytes()).is_empty());
        prop_assert!(decoder.finish().is_none());
    }
}
