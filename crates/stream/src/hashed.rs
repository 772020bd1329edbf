// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digest-tracking writer.

use std::io::{self, Write};

use digest::Digest;

/// Writer that updates a digest with every byte successfully written.
///
/// Short writes only feed the accepted prefix into the digest, so the
/// digest always reflects exactly what reached the inner writer.
pub struct HashedWriter<W: Write, D: Digest> {
    inner: W,
    digest: D,
}

impl<W: Write, D: Digest> HashedWriter<W, D> {
    pub fn new(inner: W) -> Self {
        Self { inner, digest: D::new() }
    }

    /// Consume the writer, returning the inner writer and final digest.
    pub fn finalize(self) -> (W, digest::Output<D>) {
        (self.inner, self.digest.finalize())
    }
}

impl<W: Write, D: Digest> Write for HashedWriter<W, D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.digest.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[path = "hashed_tests.rs"]
mod tests;
