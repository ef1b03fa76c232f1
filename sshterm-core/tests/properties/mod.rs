//! Property-based tests for the sshterm core library

mod decoder_tests;
mod encoding_tests;
mod feed_tests;
mod params_tests;
mod sink_tests;
