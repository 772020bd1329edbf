// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preemptable writer for cancellable transmit loops.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle that preempts an in-flight write loop.
#[derive(Debug, Clone, Default)]
pub struct Preemption {
    preempted: Arc<AtomicBool>,
}

impl Preemption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preempt(&self) {
        self.preempted.store(true, Ordering::SeqCst);
    }

    pub fn is_preempted(&self) -> bool {
        self.preempted.load(Ordering::SeqCst)
    }
}

/// Writer that checks for preemption before every write.
///
/// Preempted writes fail permanently. `Interrupted` is deliberately not
/// used: `write_all` retries it, which would spin instead of aborting.
pub struct PreemptableWriter<W: Write> {
    inner: W,
    preemption: Preemption,
}

impl<W: Write> PreemptableWriter<W> {
    pub fn new(inner: W, preemption: Preemption) -> Self {
        Self { inner, preemption }
    }
}

impl<W: Write> Write for PreemptableWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.preemption.is_preempted() {
            return Err(io::Error::other("write preempted"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[path = "preempt_tests.rs"]
mod tests;
