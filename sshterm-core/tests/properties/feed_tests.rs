//! Property-based tests for line feed ordering
//!
//! Every subscriber sees the same gap-free sequence, starting at 1.

use proptest::prelude::*;
use sshterm_core::models::LineSource;
use sshterm_core::session::FeedEmitter;

fn arb_source() -> impl Strategy<Value = LineSource> {
    prop_oneof![
        Just(LineSource::System),
        Just(LineSource::RemoteOutput),
        Just(LineSource::LocalEcho),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Sequence numbers are gap-free and identical across subscribers
    #[test]
    fn prop_sequence_gap_free(
        entries in prop::collection::vec((arb_source(), "[a-z ]{0,12}"), 1..40),
    ) {
        let emitter = FeedEmitter::new();
        let mut first = emitter.subscribe();
        let mut second = emitter.subscribe();

        for (source, text) in &entries {
            emitter.emit(*source, text.clone());
        }

        let a = first.drain();
        let b = second.drain();
        prop_assert_eq!(a.len(), entries.len());
        prop_assert_eq!(&a, &b);
        for (index, line) in a.iter().enumerate() {
            prop_assert_eq!(line.seq, index as u64 + 1);
            prop_assert_eq!(line.source, entries[index].0);
        }
        prop_assert_eq!(emitter.transcript(), a);
    }

    /// A late subscriber only sees lines emitted after it subscribed
    #[test]
    fn prop_late_subscriber_sees_suffix(before in 0usize..10, after in 0usize..10) {
        let emitter = FeedEmitter::new();
        for i in 0..before {
            emitter.emit(LineSource::System, format!("before {i}"));
        }
        let mut late = emitter.subscribe();
        for i in 0..after {
            emitter.emit(LineSource::RemoteOutput, format!("after {i}"));
        }

        let seen = late.drain();
        prop_assert_eq!(seen.len(), after);
        if let Some(first) = seen.first() {
            prop_assert_eq!(first.seq, before as u64 + 1);
        }
    }

    /// Reset restarts numbering at 1 and clears the transcript
    #[test]
    fn prop_reset_restarts_sequence(count in 1usize..20) {
        let emitter = FeedEmitter::new();
        for _ in 0..count {
            emitter.emit(LineSource::System, "line");
        }
        emitter.reset();
        prop_assert!(emitter.transcript().is_empty());
        prop_assert_eq!(emitter.emit(LineSource::System, "again"), 1);
    }
}
