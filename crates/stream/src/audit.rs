// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-counting writer for progress reporting.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Writer that records the number of bytes accepted by the inner writer.
///
/// The counter is shared, so a status reporter can observe progress while
/// the transfer loop owns the writer.
pub struct AuditWriter<W: Write> {
    inner: W,
    written: Arc<AtomicU64>,
}

impl<W: Write> AuditWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: Arc::new(AtomicU64::new(0)) }
    }

    /// Shared counter of bytes written so far.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.written)
    }

    /// Total bytes written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for AuditWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.written.fetch_add(written as u64, Ordering::SeqCst);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
