// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation for user-supplied object names.

use thiserror::Error;
use uuid::Uuid;

/// The name reserved for default-configuration sections.
const RESERVED_NAME: &str = "defaults";

/// Errors from name validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name does not start with a letter")]
    StartsWithNonLetter,

    #[error("name contains invalid character: {0:?}")]
    InvalidCharacter(char),

    #[error("name is reserved")]
    Reserved,

    #[error("name is ambiguous with identifier format")]
    AmbiguousWithIdentifier,
}

/// Validate a user-supplied name.
///
/// Empty names are allowed (the object is unnamed). Non-empty names must
/// start with a Unicode letter and contain only letters and digits. The
/// literal `defaults` is reserved, and anything that parses as a UUID is
/// rejected so names can never shadow legacy identifiers.
pub fn ensure_name_valid(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Ok(());
    }
    for (index, character) in name.chars().enumerate() {
        if index == 0 {
            if !character.is_alphabetic() {
                return Err(NameError::StartsWithNonLetter);
            }
        } else if !character.is_alphanumeric() {
            return Err(NameError::InvalidCharacter(character));
        }
    }
    if name == RESERVED_NAME {
        return Err(NameError::Reserved);
    }
    if Uuid::parse_str(name).is_ok() {
        return Err(NameError::AmbiguousWithIdentifier);
    }
    Ok(())
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
