//! Property-based tests for command framing

use proptest::prelude::*;
use sshterm_core::session::normalize_command;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every framed command ends with exactly the newlines it had, plus one
    /// if it had none
    #[test]
    fn prop_command_ends_with_newline(command in "[^\n]{0,40}", terminated in any::<bool>()) {
        let input = if terminated { format!("{command}\n") } else { command.clone() };
        let framed = normalize_command(&input);

        prop_assert!(framed.ends_with('\n'));
        prop_assert_eq!(framed.as_ref(), format!("{command}\n"));
    }

    /// Framing is idempotent
    #[test]
    fn prop_normalize_idempotent(command in "\\PC{0,40}") {
        let once = normalize_command(&command).into_owned();
        let twice = normalize_command(&once).into_owned();
        prop_assert_eq!(once, twice);
    }
}
