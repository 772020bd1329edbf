// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message framing for daemon connections.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod base64_bytes;
mod frame;

pub use frame::{
    decode, encode, read_frame, read_message, write_frame, write_message, ProtocolError,
    MAXIMUM_MESSAGE_SIZE,
};
