// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The delta-transfer engine: signature, deltafy, and patch.
//!
//! The weak hash is the two-component rolling checksum
//! `weak = r1 + 2^16 * r2`, with `r1` the byte sum and `r2` the
//! positionally weighted sum, both mod 2^16. Strong hashes are SHA-1.
//! A short final block never participates in the rolling search (the
//! weak map indexes full blocks only); it is matched by a single
//! end-of-stream check.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};

use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::types::{
    BlockHash, Operation, OperationError, Signature, SignatureError, STRONG_HASH_LENGTH,
};

/// Lower clamp for derived block sizes.
pub const MINIMUM_BLOCK_SIZE: u64 = 1024;

/// Upper clamp for derived block sizes.
pub const MAXIMUM_BLOCK_SIZE: u64 = 64 * 1024;

/// Maximum payload of a single data operation.
pub const MAXIMUM_DATA_OPERATION_SIZE: usize = 64 * 1024;

/// Multiplier in the optimal-block-size heuristic.
const OPTIMAL_BLOCK_SIZE_FACTOR: f64 = 24.0;

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] OperationError),

    #[error("invalid block size")]
    InvalidBlockSize,

    #[error("block operation at {start} for {count} blocks exceeds signature with {blocks} blocks")]
    BlockOutOfRange { start: u64, count: u64, blocks: u64 },

    #[error("base truncated at block {index}")]
    BaseTruncated { index: u64 },

    #[error("short write to destination")]
    ShortWrite,
}

/// Choose a block size for a base of the given length:
/// `clamp(round(sqrt(24 * length)), 1 KiB, 64 KiB)`.
pub fn optimal_block_size(base_length: u64) -> u64 {
    let derived = (OPTIMAL_BLOCK_SIZE_FACTOR * base_length as f64).sqrt().round() as u64;
    derived.clamp(MINIMUM_BLOCK_SIZE, MAXIMUM_BLOCK_SIZE)
}

/// Compute the weak hash components of a block. The weight base is the
/// block's own length, so signature and delta sides agree for both full
/// and short blocks.
fn weak_hash(block: &[u8]) -> (u32, u32, u32) {
    let length = block.len() as u32;
    let mut r1: u32 = 0;
    let mut r2: u32 = 0;
    for (index, &byte) in block.iter().enumerate() {
        r1 = r1.wrapping_add(u32::from(byte));
        r2 = r2.wrapping_add((length - index as u32).wrapping_mul(u32::from(byte)));
    }
    r1 &= 0xffff;
    r2 &= 0xffff;
    (r1, r2, r1 | (r2 << 16))
}

/// Roll the weak hash one byte forward.
fn roll_weak_hash(r1: u32, r2: u32, outgoing: u8, incoming: u8, block_size: u64) -> (u32, u32, u32) {
    let r1 = r1.wrapping_sub(u32::from(outgoing)).wrapping_add(u32::from(incoming)) & 0xffff;
    let r2 = r2
        .wrapping_sub((block_size as u32).wrapping_mul(u32::from(outgoing)))
        .wrapping_add(r1)
        & 0xffff;
    (r1, r2, r1 | (r2 << 16))
}

fn strong_hash(block: &[u8]) -> [u8; STRONG_HASH_LENGTH] {
    Sha1::digest(block).into()
}

/// Read until the buffer is full or the reader is exhausted, returning
/// the number of bytes read. Bytes beyond the returned count are left
/// untouched.
fn read_fill<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

/// Collapses adjacent block operations before transmission.
///
/// Data operations arrive pre-chunked and are never merged; they flush
/// any pending block run. Call [`OperationCoalescer::finalize`] to flush
/// the final run.
pub struct OperationCoalescer<F> {
    transmit: F,
    pending: Option<(u64, u64)>,
}

impl<F: FnMut(Operation) -> io::Result<()>> OperationCoalescer<F> {
    pub fn new(transmit: F) -> Self {
        Self { transmit, pending: None }
    }

    pub fn transmit(&mut self, operation: Operation) -> io::Result<()> {
        match operation {
            Operation::Block { start, count } => {
                if let Some((pending_start, pending_count)) = self.pending {
                    if pending_start + pending_count == start {
                        self.pending = Some((pending_start, pending_count + count));
                        return Ok(());
                    }
                    (self.transmit)(Operation::Block {
                        start: pending_start,
                        count: pending_count,
                    })?;
                }
                self.pending = Some((start, count));
                Ok(())
            }
            data => {
                self.flush()?;
                (self.transmit)(data)
            }
        }
    }

    pub fn finalize(mut self) -> io::Result<()> {
        self.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some((start, count)) = self.pending.take() {
            (self.transmit)(Operation::Block { start, count })?;
        }
        Ok(())
    }
}

/// Delta-transfer engine with a reusable scratch buffer.
///
/// Engines are single-owner; construct one per task or pool behind a
/// mutex.
pub struct Engine {
    buffer: Vec<u8>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn buffer_with_size(&mut self, size: usize) -> &mut [u8] {
        if self.buffer.len() < size {
            self.buffer.resize(size, 0);
        }
        &mut self.buffer[..size]
    }

    /// Compute a signature over a seekable base, deriving the block size
    /// from the base's length.
    pub fn signature<R: Read + Seek>(&mut self, base: &mut R) -> Result<Signature, EngineError> {
        let length = base.seek(SeekFrom::End(0))?;
        base.seek(SeekFrom::Start(0))?;
        if length == 0 {
            return Ok(Signature::empty());
        }
        self.signature_with_block_size(base, optimal_block_size(length))
    }

    /// Compute a signature with an explicit block size.
    pub fn signature_with_block_size<R: Read>(
        &mut self,
        base: &mut R,
        block_size: u64,
    ) -> Result<Signature, EngineError> {
        if block_size == 0 || block_size > MAXIMUM_BLOCK_SIZE {
            return Err(EngineError::InvalidBlockSize);
        }
        let block_size_usize = block_size as usize;
        let buffer = self.buffer_with_size(block_size_usize);

        let mut hashes = Vec::new();
        let mut last_block_size = 0u64;
        loop {
            let read = read_fill(base, buffer)?;
            if read == 0 {
                break;
            }
            let block = &buffer[..read];
            let (_, _, weak) = weak_hash(block);
            hashes.push(BlockHash { weak, strong: strong_hash(block) });
            last_block_size = read as u64;
            if read < block_size_usize {
                break;
            }
        }

        if hashes.is_empty() {
            return Ok(Signature::empty());
        }
        Ok(Signature { block_size, last_block_size, hashes })
    }

    /// Generate a delta from `target` against a base signature, invoking
    /// `transmit` for each operation. Adjacent block operations are
    /// coalesced; data operations never exceed
    /// [`MAXIMUM_DATA_OPERATION_SIZE`].
    pub fn deltafy<R, F>(
        &mut self,
        target: &mut R,
        signature: &Signature,
        transmit: F,
    ) -> Result<(), EngineError>
    where
        R: Read,
        F: FnMut(Operation) -> io::Result<()>,
    {
        signature.ensure_valid()?;
        let mut coalescer = OperationCoalescer::new(transmit);
        self.deltafy_uncoalesced(target, signature, &mut coalescer)?;
        coalescer.finalize()?;
        Ok(())
    }

    fn deltafy_uncoalesced<R, F>(
        &mut self,
        target: &mut R,
        signature: &Signature,
        coalescer: &mut OperationCoalescer<F>,
    ) -> Result<(), EngineError>
    where
        R: Read,
        F: FnMut(Operation) -> io::Result<()>,
    {
        // Empty base: the entire target streams as data operations.
        if signature.is_empty() {
            let buffer = self.buffer_with_size(MAXIMUM_DATA_OPERATION_SIZE);
            loop {
                let read = read_fill(target, buffer)?;
                if read == 0 {
                    return Ok(());
                }
                coalescer.transmit(Operation::Data { data: buffer[..read].to_vec() })?;
            }
        }

        let block_size = signature.block_size as usize;
        let last_block_size = signature.last_block_size as usize;
        let block_count = signature.hashes.len();

        // Index full blocks only; matching prefers the first index in a
        // bucket whose strong hash matches.
        let mut weak_to_blocks: HashMap<u32, Vec<usize>> = HashMap::new();
        let full_blocks =
            if last_block_size == block_size { block_count } else { block_count - 1 };
        for (index, hash) in signature.hashes.iter().take(full_blocks).enumerate() {
            weak_to_blocks.entry(hash.weak).or_default().push(index);
        }

        let capacity = MAXIMUM_DATA_OPERATION_SIZE + block_size;
        let buffer = self.buffer_with_size(capacity);
        let mut occupancy = 0usize;
        let (mut r1, mut r2, mut weak) = (0u32, 0u32, 0u32);

        'refill: loop {
            // Phase I: read one block's worth of target data.
            let read = read_fill(target, &mut buffer[occupancy..occupancy + block_size])?;
            occupancy += read;
            if read < block_size {
                break 'refill;
            }
            (r1, r2, weak) = weak_hash(&buffer[occupancy - block_size..occupancy]);

            // Phase II: slide the window byte by byte.
            loop {
                if let Some(indices) = weak_to_blocks.get(&weak) {
                    let window = &buffer[occupancy - block_size..occupancy];
                    let strong = strong_hash(window);
                    if let Some(&index) =
                        indices.iter().find(|&&i| signature.hashes[i].strong == strong)
                    {
                        transmit_data(&buffer[..occupancy - block_size], coalescer)?;
                        coalescer.transmit(Operation::Block { start: index as u64, count: 1 })?;
                        occupancy = 0;
                        continue 'refill;
                    }
                }

                if occupancy == capacity {
                    // No match and no room: flush the data prefix and
                    // shift the trailing block to the front.
                    transmit_data(&buffer[..occupancy - block_size], coalescer)?;
                    buffer.copy_within(occupancy - block_size..occupancy, 0);
                    occupancy = block_size;
                }

                let mut incoming = [0u8; 1];
                if read_fill(target, &mut incoming)? == 0 {
                    break 'refill;
                }
                let outgoing = buffer[occupancy - block_size];
                buffer[occupancy] = incoming[0];
                occupancy += 1;
                (r1, r2, weak) =
                    roll_weak_hash(r1, r2, outgoing, incoming[0], signature.block_size);
            }
        }

        // End of stream: a short final block can only match here.
        if last_block_size < block_size && occupancy >= last_block_size {
            let tail = &buffer[occupancy - last_block_size..occupancy];
            let last_index = block_count - 1;
            let last_hash = &signature.hashes[last_index];
            let (_, _, tail_weak) = weak_hash(tail);
            if tail_weak == last_hash.weak && strong_hash(tail) == last_hash.strong {
                transmit_data(&buffer[..occupancy - last_block_size], coalescer)?;
                coalescer.transmit(Operation::Block { start: last_index as u64, count: 1 })?;
                occupancy = 0;
            }
        }

        transmit_data(&buffer[..occupancy], coalescer)?;
        Ok(())
    }

    /// Apply a stream of operations to a base, writing the reconstructed
    /// target to `destination`. Operations are pulled from `receive`
    /// until it yields `None`.
    pub fn patch<W, R, F>(
        &mut self,
        destination: &mut W,
        base: &mut R,
        signature: &Signature,
        mut receive: F,
    ) -> Result<(), EngineError>
    where
        W: Write,
        R: Read + Seek,
        F: FnMut() -> Result<Option<Operation>, EngineError>,
    {
        signature.ensure_valid()?;
        while let Some(operation) = receive()? {
            self.apply(destination, base, signature, &operation)?;
        }
        Ok(())
    }

    /// Apply a single operation to the destination.
    pub fn apply<W, R>(
        &mut self,
        destination: &mut W,
        base: &mut R,
        signature: &Signature,
        operation: &Operation,
    ) -> Result<(), EngineError>
    where
        W: Write,
        R: Read + Seek,
    {
        operation.ensure_valid()?;
        match operation {
            Operation::Data { data } => write_checked(destination, data),
            Operation::Block { start, count } => {
                let blocks = signature.hashes.len() as u64;
                let end = start.checked_add(*count).filter(|&end| end <= blocks).ok_or(
                    EngineError::BlockOutOfRange { start: *start, count: *count, blocks },
                )?;

                base.seek(SeekFrom::Start(start * signature.block_size))?;
                let block_size = signature.block_size as usize;
                let buffer = self.buffer_with_size(block_size);
                for index in *start..end {
                    let expected = if index == blocks - 1 {
                        signature.last_block_size as usize
                    } else {
                        block_size
                    };
                    let read = read_fill(base, &mut buffer[..expected])?;
                    if read < expected {
                        return Err(EngineError::BaseTruncated { index });
                    }
                    write_checked(destination, &buffer[..expected])?;
                }
                Ok(())
            }
        }
    }
}

/// Transmit a byte span as data operations of bounded size.
fn transmit_data<F>(mut data: &[u8], coalescer: &mut OperationCoalescer<F>) -> io::Result<()>
where
    F: FnMut(Operation) -> io::Result<()>,
{
    while !data.is_empty() {
        let chunk = data.len().min(MAXIMUM_DATA_OPERATION_SIZE);
        coalescer.transmit(Operation::Data { data: data[..chunk].to_vec() })?;
        data = &data[chunk..];
    }
    Ok(())
}

fn write_checked<W: Write>(destination: &mut W, data: &[u8]) -> Result<(), EngineError> {
    destination.write_all(data).map_err(|error| {
        if error.kind() == io::ErrorKind::WriteZero {
            EngineError::ShortWrite
        } else {
            EngineError::Io(error)
        }
    })
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
