// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compressor/decompressor stream construction.
//!
//! DEFLATE streams are raw (no zlib header or trailer); Zstandard uses
//! the standard frame format. `close` finishes the stream, writing any
//! trailer the format requires, without closing the underlying writer.

use std::io::{self, Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use mutagen_stream::Close;

use crate::algorithm::{Algorithm, AlgorithmError};

/// Writer with explicit flush and close steps, as produced by
/// [`compress`].
pub trait WriteFlushClose: Write + Close + Send {}

impl<T: Write + Close + Send> WriteFlushClose for T {}

struct Passthrough<W: Write>(W);

impl<W: Write> Write for Passthrough<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Close for Passthrough<W> {
    fn close(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

struct DeflateStream<W: Write> {
    encoder: Option<DeflateEncoder<W>>,
}

impl<W: Write> Write for DeflateStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.write(buf),
            None => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Err(closed()),
        }
    }
}

impl<W: Write> Close for DeflateStream<W> {
    fn close(&mut self) -> io::Result<()> {
        match self.encoder.take() {
            Some(encoder) => {
                let mut inner = encoder.finish()?;
                inner.flush()
            }
            None => Ok(()),
        }
    }
}

struct ZstandardStream<W: Write> {
    encoder: Option<zstd::stream::write::Encoder<'static, W>>,
}

impl<W: Write> Write for ZstandardStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.write(buf),
            None => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Err(closed()),
        }
    }
}

impl<W: Write> Close for ZstandardStream<W> {
    fn close(&mut self) -> io::Result<()> {
        match self.encoder.take() {
            Some(encoder) => {
                let mut inner = encoder.finish()?;
                inner.flush()
            }
            None => Ok(()),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "compressor closed")
}

/// Wrap a writer in a compressor for the resolved algorithm.
pub fn compress<'a, W: Write + Send + 'a>(
    algorithm: Algorithm,
    writer: W,
) -> Result<Box<dyn WriteFlushClose + 'a>, AlgorithmError> {
    match algorithm {
        Algorithm::Default => Err(AlgorithmError::Unresolved),
        Algorithm::None => Ok(Box::new(Passthrough(writer))),
        Algorithm::Deflate => Ok(Box::new(DeflateStream {
            encoder: Some(DeflateEncoder::new(writer, Compression::default())),
        })),
        Algorithm::Zstandard => {
            let encoder = zstd::stream::write::Encoder::new(writer, 0).map_err(|_| {
                // Level 0 is the library default and cannot fail; treat a
                // failure as an unusable build of the algorithm.
                AlgorithmError::Unknown("zstandard".to_string())
            })?;
            Ok(Box::new(ZstandardStream { encoder: Some(encoder) }))
        }
    }
}

/// Wrap a reader in a decompressor for the resolved algorithm.
pub fn decompress<'a, R: Read + Send + 'a>(
    algorithm: Algorithm,
    reader: R,
) -> Result<Box<dyn Read + Send + 'a>, AlgorithmError> {
    match algorithm {
        Algorithm::Default => Err(AlgorithmError::Unresolved),
        Algorithm::None => Ok(Box::new(reader)),
        Algorithm::Deflate => Ok(Box::new(DeflateDecoder::new(reader))),
        Algorithm::Zstandard => {
            let decoder = zstd::stream::read::Decoder::new(reader)
                .map_err(|_| AlgorithmError::Unknown("zstandard".to_string()))?;
            Ok(Box::new(decoder))
        }
    }
}

#[cfg(test)]
#[path = "streams_tests.rs"]
mod tests;
