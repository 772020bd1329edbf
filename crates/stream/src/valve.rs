// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writer shut-off valve.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle used to shut a [`ValveWriter`] from another owner.
#[derive(Debug, Clone, Default)]
pub struct Valve {
    shut: Arc<AtomicBool>,
}

impl Valve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shut the valve. Subsequent writes fail.
    pub fn shut(&self) {
        self.shut.store(true, Ordering::SeqCst);
    }

    pub fn is_shut(&self) -> bool {
        self.shut.load(Ordering::SeqCst)
    }
}

/// Writer that fails once its [`Valve`] has been shut.
pub struct ValveWriter<W: Write> {
    inner: W,
    valve: Valve,
}

impl<W: Write> ValveWriter<W> {
    pub fn new(inner: W, valve: Valve) -> Self {
        Self { inner, valve }
    }
}

impl<W: Write> Write for ValveWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.valve.is_shut() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "valve shut"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.valve.is_shut() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "valve shut"));
        }
        self.inner.flush()
    }
}

#[cfg(test)]
#[path = "valve_tests.rs"]
mod tests;
