// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-stream to line adapter.

use std::io::{self, Write};

/// Maximum buffered length before a partial line is force-emitted.
const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Adapts an `io::Write` byte stream into per-line callbacks.
///
/// Carriage returns preceding a newline are stripped. Any unterminated
/// remainder is emitted when the writer is dropped.
pub struct LineWriter<F: FnMut(&str)> {
    callback: F,
    buffer: Vec<u8>,
}

impl<F: FnMut(&str)> LineWriter<F> {
    pub fn new(callback: F) -> Self {
        Self { callback, buffer: Vec::new() }
    }

    fn emit(&mut self, line: &[u8]) {
        let line = match line.split_last() {
            Some((b'\r', rest)) => rest,
            _ => line,
        };
        (self.callback)(&String::from_utf8_lossy(line));
    }
}

impl<F: FnMut(&str)> Write for LineWriter<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.buffer);
                self.emit(&line);
            } else {
                self.buffer.push(byte);
                if self.buffer.len() >= MAX_LINE_LENGTH {
                    let line = std::mem::take(&mut self.buffer);
                    self.emit(&line);
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<F: FnMut(&str)> Drop for LineWriter<F> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.emit(&line);
        }
    }
}

#[cfg(test)]
#[path = "line_tests.rs"]
mod tests;
