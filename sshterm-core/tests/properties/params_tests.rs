//! Property-based tests for connection parameter validation

use proptest::prelude::*;
use sshterm_core::error::ControllerError;
use sshterm_core::models::ConnectionParams;

/// Strategy for generating valid hostnames
fn arb_host() -> impl Strategy<Value = String> {
    "[a-z0-9]([a-z0-9-]{0,15}[a-z0-9])?(\\.[a-z0-9]([a-z0-9-]{0,15}[a-z0-9])?)*"
}

/// Strategy for generating valid usernames
fn arb_username() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_-]{0,15}"
}

/// Strategy for generating valid ports (non-zero)
fn arb_port() -> impl Strategy<Value = u16> {
    1u16..=65535u16
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Well-formed parameters always validate
    #[test]
    fn prop_valid_params_accepted(
        host in arb_host(),
        port in arb_port(),
        user in arb_username(),
        password in ".{0,32}",
    ) {
        let params = ConnectionParams::new(host, port, user, password);
        prop_assert!(params.validate().is_ok());
    }

    /// Port 0 is always rejected on the port field
    #[test]
    fn prop_zero_port_rejected(host in arb_host(), user in arb_username()) {
        let params = ConnectionParams::new(host, 0, user, "pw");
        let rejected = matches!(
            params.validate(),
            Err(ControllerError::InvalidParams { field: "port", .. })
        );
        prop_assert!(rejected);
    }

    /// Blank hosts are rejected whatever else is supplied
    #[test]
    fn prop_blank_host_rejected(
        host in "[ \t]{0,4}",
        port in arb_port(),
        user in arb_username(),
    ) {
        let params = ConnectionParams::new(host, port, user, "pw");
        let rejected = matches!(
            params.validate(),
            Err(ControllerError::InvalidParams { field: "host", .. })
        );
        prop_assert!(rejected);
    }

    /// The credential never appears in Debug output
    #[test]
    fn prop_debug_never_shows_credential(
        host in arb_host(),
        password in "[A-Z]{12,24}",
    ) {
        let params = ConnectionParams::new(host, 22, "user", password.clone());
        let debug = format!("{params:?}");
        prop_assert!(!debug.contains(&password));
    }
}
