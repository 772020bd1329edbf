// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared writer with serialized access.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// Cloneable writer that serializes writes to a shared inner writer.
///
/// Individual writes are atomic with respect to each other; callers that
/// need multi-write framing must batch into a single write.
pub struct ConcurrentWriter<W: Write> {
    inner: Arc<Mutex<W>>,
}

impl<W: Write> ConcurrentWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Arc::new(Mutex::new(inner)) }
    }
}

impl<W: Write> Clone for ConcurrentWriter<W> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<W: Write> Write for ConcurrentWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

#[cfg(test)]
#[path = "concurrent_tests.rs"]
mod tests;
