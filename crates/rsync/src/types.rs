// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire and in-memory types for delta transfer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length in bytes of a strong block hash (SHA-1).
pub const STRONG_HASH_LENGTH: usize = 20;

/// Weak and strong hashes for one block of a base file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHash {
    pub weak: u32,
    pub strong: [u8; STRONG_HASH_LENGTH],
}

/// Errors from signature validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("zero block size with hashes present")]
    ZeroBlockSizeWithHashes,

    #[error("zero block size with non-zero last block size")]
    ZeroBlockSizeWithLastBlockSize,

    #[error("zero last block size with hashes present")]
    ZeroLastBlockSize,

    #[error("last block size exceeds block size")]
    LastBlockSizeTooLarge,

    #[error("non-zero block size without hashes")]
    NoHashes,
}

/// Per-block hash table describing a base file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub block_size: u64,
    pub last_block_size: u64,
    pub hashes: Vec<BlockHash>,
}

impl Signature {
    /// The signature of an empty base.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this signature describes an empty base.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Validate structural invariants.
    pub fn ensure_valid(&self) -> Result<(), SignatureError> {
        if self.block_size == 0 {
            if self.last_block_size != 0 {
                return Err(SignatureError::ZeroBlockSizeWithLastBlockSize);
            }
            if !self.hashes.is_empty() {
                return Err(SignatureError::ZeroBlockSizeWithHashes);
            }
            return Ok(());
        }
        if self.last_block_size == 0 {
            return Err(SignatureError::ZeroLastBlockSize);
        }
        if self.last_block_size > self.block_size {
            return Err(SignatureError::LastBlockSizeTooLarge);
        }
        if self.hashes.is_empty() {
            return Err(SignatureError::NoHashes);
        }
        Ok(())
    }
}

/// Errors from operation validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("empty data operation")]
    EmptyData,

    #[error("data operation of {0} bytes exceeds maximum size")]
    DataTooLarge(usize),

    #[error("block operation with zero count")]
    ZeroCount,
}

/// One unit of a delta: either literal data or a base block range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Data {
        #[serde(with = "mutagen_wire::base64_bytes")]
        data: Vec<u8>,
    },
    Block {
        start: u64,
        count: u64,
    },
}

impl Operation {
    /// Validate the operation envelope.
    pub fn ensure_valid(&self) -> Result<(), OperationError> {
        match self {
            Operation::Data { data } => {
                if data.is_empty() {
                    return Err(OperationError::EmptyData);
                }
                if data.len() > crate::engine::MAXIMUM_DATA_OPERATION_SIZE {
                    return Err(OperationError::DataTooLarge(data.len()));
                }
                Ok(())
            }
            Operation::Block { count, .. } => {
                if *count == 0 {
                    return Err(OperationError::ZeroCount);
                }
                Ok(())
            }
        }
    }
}

/// Errors from transmission validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransmissionError {
    #[error("done transmission carries an operation")]
    OperationWithDone,

    #[error("transmission carries neither completion nor operation")]
    MissingOperation,

    #[error("error on a non-final transmission")]
    PrematureError,

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// One framed message in a per-path delta stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transmission {
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Transmission {
    pub fn operation(operation: Operation) -> Self {
        Self { done: false, operation: Some(operation), error: None }
    }

    pub fn done() -> Self {
        Self { done: true, operation: None, error: None }
    }

    pub fn failed(error: String) -> Self {
        Self { done: true, operation: None, error: Some(error) }
    }

    /// Validate the transmission envelope.
    pub fn ensure_valid(&self) -> Result<(), TransmissionError> {
        if self.done {
            if self.operation.is_some() {
                return Err(TransmissionError::OperationWithDone);
            }
            return Ok(());
        }
        if self.error.is_some() {
            return Err(TransmissionError::PrematureError);
        }
        match &self.operation {
            Some(operation) => Ok(operation.ensure_valid()?),
            None => Err(TransmissionError::MissingOperation),
        }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
