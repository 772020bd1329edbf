// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client/server staging protocol.
//!
//! A request envelope (`paths` + matching `signatures`) precedes one
//! transmission stream per path. Per-path failures terminate that path's
//! stream with `done { error }` and the batch continues; stream-level
//! failures terminate the connection. A client that fails locally burns
//! the remainder of that path's transmissions so the connection stays in
//! lock-step.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::Path;

use mutagen_stream::{Preemption, PreemptableWriter};
use mutagen_wire::{read_frame, write_frame, ProtocolError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{Engine, EngineError};
use crate::types::{Signature, Transmission, TransmissionError};

/// Request envelope opening a staging exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageRequest {
    pub paths: Vec<String>,
    pub signatures: Vec<Signature>,
}

impl StageRequest {
    /// Validate the envelope: paths and signatures must correspond.
    pub fn ensure_valid(&self) -> Result<(), StageError> {
        if self.paths.len() != self.signatures.len() {
            return Err(StageError::MismatchedRequest {
                paths: self.paths.len(),
                signatures: self.signatures.len(),
            });
        }
        for signature in &self.signatures {
            signature.ensure_valid().map_err(EngineError::from)?;
        }
        Ok(())
    }
}

/// Destination opener for staged files.
pub trait Stager {
    type Sink: Write;

    /// Open the staging destination for a path.
    fn sink(&mut self, path: &str) -> io::Result<Self::Sink>;

    /// Finish a path: `error` is `None` on success. Implementations
    /// typically fsync and move the staged file into place, or discard
    /// it on failure.
    fn commit(&mut self, path: &str, sink: Self::Sink, error: Option<&str>) -> io::Result<()>;
}

/// Errors from the staging transport.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("request has {paths} paths but {signatures} signatures")]
    MismatchedRequest { paths: usize, signatures: usize },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid transmission: {0}")]
    InvalidTransmission(#[from] TransmissionError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("staging I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Serve one staging exchange: deltafy each requested path against the
/// client's signature and stream the transmissions back.
///
/// The preemption handle aborts the transmit loop at the next write,
/// failing the connection rather than an individual path.
pub fn serve<R, W>(
    mut reader: R,
    writer: W,
    root: &Path,
    preemption: &Preemption,
) -> Result<(), StageError>
where
    R: Read,
    W: Write,
{
    let mut writer = PreemptableWriter::new(writer, preemption.clone());

    let request: StageRequest = read_frame(&mut reader)?;
    request.ensure_valid()?;

    let mut engine = Engine::new();
    for (path, signature) in request.paths.iter().zip(&request.signatures) {
        let file = match File::open(root.join(path)) {
            Ok(file) => file,
            Err(error) => {
                write_frame(&mut writer, &Transmission::failed(error.to_string()))?;
                continue;
            }
        };

        // Distinguish transport failures (fatal) from local read errors
        // (terminate this path, continue the batch).
        let mut stream_failed = false;
        let mut target = BufReader::new(file);
        let result = engine.deltafy(&mut target, signature, |operation| {
            write_frame(&mut writer, &Transmission::operation(operation)).map_err(|error| {
                stream_failed = true;
                io::Error::other(error)
            })
        });

        match result {
            Ok(()) => write_frame(&mut writer, &Transmission::done())?,
            Err(error) if stream_failed => {
                return Err(StageError::Io(io::Error::other(error.to_string())));
            }
            Err(error) => write_frame(&mut writer, &Transmission::failed(error.to_string()))?,
        }
    }
    Ok(())
}

/// Send the staging request envelope that opens an exchange.
///
/// The client-to-server direction carries nothing further, so callers
/// may close their write half once the request is flushed.
pub fn send_request<W: Write>(writer: &mut W, request: &StageRequest) -> Result<(), StageError> {
    request.ensure_valid()?;
    write_frame(writer, request)?;
    Ok(())
}

/// Run the client side of a staging exchange after [`send_request`]:
/// patch each path's transmissions into the stager's sinks.
///
/// Bases are opened beneath `root`; an unopenable base patches against an
/// empty one. The per-path outcome list matches the request's path order,
/// with `None` for success.
pub fn receive<R, G>(
    mut reader: R,
    root: &Path,
    request: &StageRequest,
    stager: &mut G,
) -> Result<Vec<Option<String>>, StageError>
where
    R: Read,
    G: Stager,
{
    request.ensure_valid()?;

    let mut engine = Engine::new();
    let mut outcomes = Vec::with_capacity(request.paths.len());
    for (path, signature) in request.paths.iter().zip(&request.signatures) {
        let outcome = receive_path(&mut reader, root, path, signature, stager, &mut engine)?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

fn receive_path<R, G>(
    reader: &mut R,
    root: &Path,
    path: &str,
    signature: &Signature,
    stager: &mut G,
    engine: &mut Engine,
) -> Result<Option<String>, StageError>
where
    R: Read,
    G: Stager,
{
    let mut base: Box<dyn ReadSeek> = match File::open(root.join(path)) {
        Ok(file) => Box::new(file),
        Err(_) => Box::new(io::Cursor::new(Vec::new())),
    };

    let mut sink = match stager.sink(path) {
        Ok(sink) => Some(sink),
        Err(error) => {
            // Local failure: burn this path's transmissions to stay in
            // lock-step, then report.
            let remote = drain_path(reader)?;
            return Ok(Some(remote.unwrap_or_else(|| error.to_string())));
        }
    };

    let mut failure: Option<String> = None;
    loop {
        let transmission: Transmission = read_frame(reader)?;
        transmission.ensure_valid()?;

        if transmission.done {
            if let Some(error) = transmission.error {
                failure.get_or_insert(error);
            }
            break;
        }

        // Operation presence is guaranteed by ensure_valid.
        let Some(operation) = transmission.operation else { continue };
        if failure.is_some() {
            continue;
        }
        if let Some(destination) = sink.as_mut() {
            if let Err(error) = engine.apply(destination, &mut base, signature, &operation) {
                failure = Some(error.to_string());
            }
        }
    }

    if let Some(sink) = sink.take() {
        let result = stager.commit(path, sink, failure.as_deref());
        if let Err(error) = result {
            failure.get_or_insert(error.to_string());
        }
    }
    Ok(failure)
}

/// Consume transmissions for a path until its terminal message, returning
/// any remote error.
fn drain_path<R: Read>(reader: &mut R) -> Result<Option<String>, StageError> {
    loop {
        let transmission: Transmission = read_frame(reader)?;
        transmission.ensure_valid()?;
        if transmission.done {
            return Ok(transmission.error);
        }
    }
}

trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
