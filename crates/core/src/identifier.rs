// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collision-resistant identifier generation and validation.
//!
//! Identifiers are a short lowercase type prefix, an underscore, and a
//! base62 encoding of 256 bits of CSPRNG entropy (always 43 characters).
//! Legacy records identified by bare UUID strings are still accepted on
//! read paths via [`is_valid`].

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

/// Prefix for synchronization session identifiers.
pub const PREFIX_SYNCHRONIZATION: &str = "sync";
/// Prefix for forwarding session identifiers.
pub const PREFIX_FORWARDING: &str = "fwrd";
/// Prefix for tunnel identifiers.
pub const PREFIX_TUNNEL: &str = "tunl";
/// Prefix for API token identifiers.
pub const PREFIX_TOKEN: &str = "tokn";
/// Prefix for prompter handles.
pub const PREFIX_PROMPTER: &str = "prmt";

/// Number of random bytes backing an identifier.
const ENTROPY_LENGTH: usize = 32;

/// Length of the base62 encoding of [`ENTROPY_LENGTH`] bytes
/// (ceil(256 / log2(62))).
const ENCODED_LENGTH: usize = 43;

/// Maximum accepted prefix length.
const MAX_PREFIX_LENGTH: usize = 10;

const BASE62_ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Errors from identifier generation.
#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("empty prefix")]
    EmptyPrefix,

    #[error("prefix exceeds {MAX_PREFIX_LENGTH} characters")]
    PrefixTooLong,

    #[error("prefix contains non-lowercase-ASCII character")]
    InvalidPrefix,
}

/// Generate a new identifier with the given type prefix.
pub fn new_identifier(prefix: &str) -> Result<String, IdentifierError> {
    ensure_prefix_valid(prefix)?;
    let mut entropy = [0u8; ENTROPY_LENGTH];
    OsRng.fill_bytes(&mut entropy);
    Ok(format!("{}_{}", prefix, base62_encode(&entropy)))
}

/// Check whether a string is a valid identifier.
///
/// Accepts `<prefix>_<43 base62 chars>` for any well-formed prefix. When
/// `allow_legacy` is set, bare UUID strings from older data directories
/// are also accepted.
pub fn is_valid(identifier: &str, allow_legacy: bool) -> bool {
    if let Some((prefix, value)) = identifier.split_once('_') {
        if ensure_prefix_valid(prefix).is_ok()
            && value.len() == ENCODED_LENGTH
            && value.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return true;
        }
    }
    allow_legacy && Uuid::parse_str(identifier).is_ok()
}

fn ensure_prefix_valid(prefix: &str) -> Result<(), IdentifierError> {
    if prefix.is_empty() {
        return Err(IdentifierError::EmptyPrefix);
    }
    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(IdentifierError::PrefixTooLong);
    }
    if !prefix.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(IdentifierError::InvalidPrefix);
    }
    Ok(())
}

/// Encode bytes as base62, zero-padded to [`ENCODED_LENGTH`].
fn base62_encode(value: &[u8]) -> String {
    let mut scratch = value.to_vec();
    let mut digits = Vec::with_capacity(ENCODED_LENGTH);

    while scratch.iter().any(|&b| b != 0) {
        let mut remainder: u32 = 0;
        for byte in scratch.iter_mut() {
            let accumulator = (remainder << 8) | u32::from(*byte);
            *byte = (accumulator / 62) as u8;
            remainder = accumulator % 62;
        }
        digits.push(BASE62_ALPHABET[remainder as usize]);
    }

    while digits.len() < ENCODED_LENGTH {
        digits.push(BASE62_ALPHABET[0]);
    }
    digits.reverse();

    // Digits are drawn from a static ASCII alphabet.
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
#[path = "identifier_tests.rs"]
mod tests;
