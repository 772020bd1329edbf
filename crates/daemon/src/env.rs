// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

/// Default TCP port for the loopback listener.
pub const DEFAULT_TCP_PORT: u16 = 31116;

/// Housekeeping timer period.
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Timeout for a single IPC dial attempt.
pub const DIAL_TIMEOUT: Duration = Duration::from_millis(500);

/// Maximum redial attempts after triggering autostart.
pub const AUTOSTART_DIAL_ATTEMPTS: usize = 10;

/// Spacing between autostart redial attempts.
pub const AUTOSTART_DIAL_INTERVAL: Duration = Duration::from_millis(100);

/// TCP port override: unset uses [`DEFAULT_TCP_PORT`], `0` requests a
/// kernel-chosen port. Values outside 0-65535 are a configuration error.
pub fn tcp_port() -> Result<u16, String> {
    match std::env::var("MUTAGEN_DAEMON_TCP_PORT") {
        Ok(value) => value
            .parse::<u16>()
            .map_err(|_| format!("invalid MUTAGEN_DAEMON_TCP_PORT: {value:?}")),
        Err(_) => Ok(DEFAULT_TCP_PORT),
    }
}

/// Whether client-side daemon autostart is disabled.
pub fn autostart_disabled() -> bool {
    std::env::var("MUTAGEN_DISABLE_AUTOSTART").is_ok_and(|value| value == "1")
}
