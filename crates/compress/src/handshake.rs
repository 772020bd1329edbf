// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-byte compression negotiation.
//!
//! The client writes its resolved algorithm identifier; the server
//! answers with 1 (supported) or 0 (unsupported). Unsupported algorithms
//! terminate the connection rather than silently downgrading. The
//! handshake runs over the raw connection halves, before any compression
//! wrapping.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::algorithm::{Algorithm, AlgorithmError};

/// Errors from the negotiation handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    #[error("algorithm rejected by server")]
    Rejected,

    #[error("malformed handshake response: {0}")]
    MalformedResponse(u8),
}

/// Propose a resolved algorithm and await the server's verdict.
pub fn client_handshake<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    algorithm: Algorithm,
) -> Result<(), HandshakeError> {
    writer.write_all(&[algorithm.identifier()?])?;
    writer.flush()?;

    let mut response = [0u8; 1];
    reader.read_exact(&mut response)?;
    match response[0] {
        1 => Ok(()),
        0 => Err(HandshakeError::Rejected),
        other => Err(HandshakeError::MalformedResponse(other)),
    }
}

/// Accept or reject the client's proposed algorithm.
pub fn server_handshake<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    supported: &[Algorithm],
) -> Result<Algorithm, HandshakeError> {
    let mut proposal = [0u8; 1];
    reader.read_exact(&mut proposal)?;

    match Algorithm::from_identifier(proposal[0]) {
        Ok(algorithm) if supported.contains(&algorithm) => {
            writer.write_all(&[1])?;
            writer.flush()?;
            Ok(algorithm)
        }
        Ok(_) | Err(AlgorithmError::UnknownIdentifier(_)) => {
            writer.write_all(&[0])?;
            writer.flush()?;
            Err(HandshakeError::Rejected)
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
#[path = "handshake_tests.rs"]
mod tests;
