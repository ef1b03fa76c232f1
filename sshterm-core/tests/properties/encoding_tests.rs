//! Property-based tests for text encodings

use proptest::prelude::*;
use sshterm_core::terminal::{LineDecoder, TextEncoding};

fn arb_encoding() -> impl Strategy<Value = TextEncoding> {
    prop_oneof![Just(TextEncoding::Utf8), Just(TextEncoding::Latin1)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Arbitrary bytes decode without panicking under every encoding
    #[test]
    fn prop_decode_arbitrary_bytes(
        encoding in arb_encoding(),
        bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let _ = encoding.decode(&bytes);
        let mut decoder = LineDecoder::new(encoding);
        let _ = decoder.feed(&bytes);
        let _ = decoder.finish();
    }

    /// Latin-1 maps every byte to exactly one character
    #[test]
    fn prop_latin1_one_char_per_byte(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(TextEncoding::Latin1.decode(&bytes).chars().count(), bytes.len());
    }

    /// UTF-8 text encodes and decodes unchanged
    #[test]
    fn prop_utf8_text_preserved(text in "\\PC{0,64}") {
        let encoded = TextEncoding::Utf8.encode(&text);
        prop_assert_eq!(TextEncoding::Utf8.decode(&encoded), text);
    }
}
