// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rsync-style delta transfer: block signatures, delta generation,
//! patching, and the client/server staging protocol.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod engine;
mod transport;
mod types;

pub use engine::{
    optimal_block_size, Engine, EngineError, OperationCoalescer, MAXIMUM_BLOCK_SIZE,
    MAXIMUM_DATA_OPERATION_SIZE, MINIMUM_BLOCK_SIZE,
};
pub use transport::{receive, send_request, serve, StageError, StageRequest, Stager};
pub use types::{
    BlockHash, Operation, OperationError, Signature, SignatureError, Transmission,
    TransmissionError, STRONG_HASH_LENGTH,
};
