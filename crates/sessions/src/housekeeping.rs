// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic data-directory housekeeping.
//!
//! Each sweep removes entries older than its retention window. Sweeps
//! are best-effort: individual removal failures are logged and skipped
//! so one bad entry cannot wedge the housekeeping timer.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

/// Retention window for staged but never-applied files.
pub const MAXIMUM_STAGING_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Retention window for cache files.
pub const MAXIMUM_CACHE_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Retention window for idle agent binaries.
pub const MAXIMUM_AGENT_IDLE_PERIOD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Remove stale staging roots.
pub fn housekeep_staging(root: &Path) {
    remove_entries_older_than(root, MAXIMUM_STAGING_AGE);
}

/// Remove stale cache files.
pub fn housekeep_caches(root: &Path) {
    remove_entries_older_than(root, MAXIMUM_CACHE_AGE);
}

/// Remove agent binaries that have not been used recently.
pub fn housekeep_agents(root: &Path) {
    remove_entries_older_than(root, MAXIMUM_AGENT_IDLE_PERIOD);
}

/// Remove direct children of `root` whose modification time is older
/// than `age`.
pub(crate) fn remove_entries_older_than(root: &Path, age: Duration) {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        // A missing directory means there is nothing to clean.
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let stale = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|elapsed| elapsed > age);
        if !stale {
            continue;
        }

        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => debug!(path = %path.display(), "removed stale entry"),
            Err(error) => warn!(path = %path.display(), %error, "failed to remove stale entry"),
        }
    }
}

#[cfg(test)]
#[path = "housekeeping_tests.rs"]
mod tests;
