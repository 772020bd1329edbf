// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable connection compression: algorithm selection, stream
//! construction, and the one-byte negotiation handshake.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod algorithm;
mod handshake;
mod streams;

pub use algorithm::{Algorithm, AlgorithmError};
pub use handshake::{client_handshake, server_handshake, HandshakeError};
pub use streams::{compress, decompress, WriteFlushClose};
