//! Loopback availability for wiremock-backed tests.
//!
//! Sandboxes without loopback networking skip these tests. Setting
//! `EDL_REQUIRE_SOCKET_TESTS=1` makes them fail instead.
//!
//! Shared with the integration tests through a `#[path]` include.

use std::future::Future;
use std::net::{Ipv4Addr, TcpListener};
use std::panic::Location;

use wiremock::MockServer;

/// Turns a skipped socket test into a failure when set.
pub const REQUIRE_SOCKETS_ENV: &str = "EDL_REQUIRE_SOCKET_TESTS";

fn flag_enabled(value: &str) -> bool {
    ["1", "true", "yes"]
        .iter()
        .any(|on| value.trim().eq_ignore_ascii_case(on))
}

/// Starts a mock server, or yields `None` when no loopback socket can be bound.
///
/// # Panics
///
/// Panics instead of skipping when [`REQUIRE_SOCKETS_ENV`] is enabled.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let caller = Location::caller();
    let loopback_usable = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).is_ok();
    async move {
        if loopback_usable {
            return Some(MockServer::start().await);
        }
        let required = std::env::var(REQUIRE_SOCKETS_ENV).is_ok_and(|v| flag_enabled(&v));
        assert!(
            !required,
            "{caller}: no loopback socket available and {REQUIRE_SOCKETS_ENV} is set"
        );
        eprintln!("{caller}: skipping, no loopback socket (set {REQUIRE_SOCKETS_ENV}=1 to fail)");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::flag_enabled;

    #[test]
    fn test_require_flag_values() {
        for on in ["1", "true", "YES", " yes "] {
            assert!(flag_enabled(on), "{on:?}");
        }
        for off in ["", "0", "false", "no"] {
            assert!(!flag_enabled(off), "{off:?}");
        }
    }
}
