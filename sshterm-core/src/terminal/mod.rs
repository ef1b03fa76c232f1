//! Terminal output decoding
//!
//! Turns raw shell bytes into display lines: partial-line buffering across
//! reads, character decoding, and removal of `ESC [ ... <letter>` control
//! sequences.
//! An erase-display sequence is reported as its own `ClearScreen` event.

mod decoder;
mod encoding;

pub use decoder::{strip_control_sequences, DecodedLine, LineDecoder};
pub use encoding::TextEncoding;
