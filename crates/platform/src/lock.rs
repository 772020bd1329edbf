// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive advisory file locking.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Holder of an exclusive advisory lock on a file.
///
/// The lock is released on [`Locker::unlock`] or when the locker is
/// dropped (the OS releases advisory locks with the file handle). A
/// single process should hold at most one locker per lock file.
#[derive(Debug)]
pub struct Locker {
    path: PathBuf,
    file: File,
    held: bool,
}

impl Locker {
    /// Open (creating if necessary) the lock file.
    ///
    /// The file is opened without truncation so acquiring a lock never
    /// clobbers state owned by a current holder.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;
        set_owner_only(&file)?;
        Ok(Self { path: path.to_path_buf(), file, held: false })
    }

    /// Acquire the lock, blocking if requested.
    ///
    /// A non-blocking attempt on a contended lock fails immediately with
    /// a `WouldBlock` error.
    pub fn lock(&mut self, blocking: bool) -> io::Result<()> {
        if self.held {
            return Ok(());
        }
        if blocking {
            self.file.lock_exclusive()?;
        } else {
            self.file.try_lock_exclusive()?;
        }
        self.held = true;
        Ok(())
    }

    /// Release the lock.
    pub fn unlock(&mut self) -> io::Result<()> {
        if !self.held {
            return Ok(());
        }
        FileExt::unlock(&self.file)?;
        self.held = false;
        Ok(())
    }

    /// Whether this locker currently holds the lock.
    pub fn held(&self) -> bool {
        self.held
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn set_owner_only(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
