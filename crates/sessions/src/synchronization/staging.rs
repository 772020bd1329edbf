// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File staging over a compression-wrapped connection.
//!
//! The client negotiates compression, sends the staging request, and
//! patches incoming transmissions into per-path staging files. Staged
//! files are named by the hex digest of their session path so a later
//! apply step can locate them without directory walks.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use mutagen_compress::{
    client_handshake, compress, decompress, server_handshake, Algorithm, AlgorithmError,
    HandshakeError,
};
use mutagen_rsync::{serve, StageError, StageRequest, Stager};
use mutagen_stream::{AuditWriter, Close, HashedWriter, Preemption};
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::debug;

/// Errors from staging exchanges.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("compression negotiation failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("staging I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Stager writing received files into a staging directory.
pub struct StagingCoordinator {
    root: PathBuf,
}

impl StagingCoordinator {
    /// Open (creating if necessary) a staging directory.
    pub fn new(root: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Where a successfully staged file for `path` lives.
    pub fn staged_path(&self, path: &str) -> PathBuf {
        self.root.join(path_digest(path))
    }

    fn partial_path(&self, path: &str) -> PathBuf {
        self.root.join(format!("{}.partial", path_digest(path)))
    }
}

impl Stager for StagingCoordinator {
    type Sink = HashedWriter<AuditWriter<File>, Sha1>;

    fn sink(&mut self, path: &str) -> io::Result<Self::Sink> {
        let file = File::create(self.partial_path(path))?;
        Ok(HashedWriter::new(AuditWriter::new(file)))
    }

    fn commit(&mut self, path: &str, sink: Self::Sink, error: Option<&str>) -> io::Result<()> {
        let (audit, digest) = sink.finalize();
        let staged_bytes = audit.written();
        let file = audit.into_inner();

        if error.is_some() {
            drop(file);
            let _ = std::fs::remove_file(self.partial_path(path));
            return Ok(());
        }

        file.sync_all()?;
        drop(file);
        std::fs::rename(self.partial_path(path), self.staged_path(path))?;
        debug!(path, staged_bytes, digest = %hex(digest.as_slice()), "staged file");
        Ok(())
    }
}

/// Client side of one staging cycle: negotiate compression, then run the
/// rsync receive loop through the (de)compression wrappers.
pub fn stage_files<R, W>(
    mut reader: R,
    mut writer: W,
    algorithm: Algorithm,
    bases: &Path,
    request: &StageRequest,
    coordinator: &mut StagingCoordinator,
) -> Result<Vec<Option<String>>, StagingError>
where
    R: Read + Send,
    W: Write + Send,
{
    client_handshake(&mut reader, &mut writer, algorithm)?;

    // The request is the only client-to-server payload, so that
    // direction's compressor closes as soon as it is flushed.
    {
        let mut writer = compress(algorithm, writer)?;
        mutagen_rsync::send_request(&mut writer, request)?;
        writer.close()?;
    }

    let reader = decompress(algorithm, reader)?;
    let outcomes = mutagen_rsync::receive(reader, bases, request, coordinator)?;
    Ok(outcomes)
}

/// Server side of one staging cycle.
pub fn serve_staging<R, W>(
    mut reader: R,
    mut writer: W,
    root: &Path,
    supported: &[Algorithm],
    preemption: &Preemption,
) -> Result<(), StagingError>
where
    R: Read + Send,
    W: Write + Send,
{
    let algorithm = server_handshake(&mut reader, &mut writer, supported)?;

    let reader = decompress(algorithm, reader)?;
    let mut writer = compress(algorithm, writer)?;

    serve(reader, &mut writer, root, preemption)?;
    // Every transmission was flushed frame-by-frame; the compressor
    // trailer carries nothing the client waits for, and the client may
    // already have departed after its final frame.
    writer.close().ok();
    Ok(())
}

fn path_digest(path: &str) -> String {
    hex(Sha1::digest(path.as_bytes()).as_slice())
}

fn hex(digest: &[u8]) -> String {
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
