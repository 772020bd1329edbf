// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Label key/value validation.
//!
//! Keys follow the DNS-subdomain-prefix/name grammar used by cluster
//! orchestrators; values are short restricted alphanumeric strings.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Maximum length of a label key's name segment and of a label value.
const MAX_NAME_LENGTH: usize = 63;

/// Maximum length of a label key's DNS-subdomain prefix.
const MAX_PREFIX_LENGTH: usize = 253;

static KEY_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$"));

static KEY_PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$"));

static VALUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?)?$"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(pattern) => pattern,
        Err(_) => unreachable!("static validation pattern failed to compile"),
    }
}

/// Errors from label validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("empty label key")]
    EmptyKey,

    #[error("label key name segment exceeds {MAX_NAME_LENGTH} characters")]
    KeyNameTooLong,

    #[error("label key prefix exceeds {MAX_PREFIX_LENGTH} characters")]
    KeyPrefixTooLong,

    #[error("invalid label key name segment: {0:?}")]
    InvalidKeyName(String),

    #[error("invalid label key prefix: {0:?}")]
    InvalidKeyPrefix(String),

    #[error("label value exceeds {MAX_NAME_LENGTH} characters")]
    ValueTooLong,

    #[error("invalid label value: {0:?}")]
    InvalidValue(String),
}

/// Validate a label key.
pub fn ensure_label_key_valid(key: &str) -> Result<(), LabelError> {
    if key.is_empty() {
        return Err(LabelError::EmptyKey);
    }
    let (prefix, name) = match key.rsplit_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix {
        if prefix.len() > MAX_PREFIX_LENGTH {
            return Err(LabelError::KeyPrefixTooLong);
        }
        if !KEY_PREFIX_PATTERN.is_match(prefix) {
            return Err(LabelError::InvalidKeyPrefix(prefix.to_string()));
        }
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(LabelError::KeyNameTooLong);
    }
    if !KEY_NAME_PATTERN.is_match(name) {
        return Err(LabelError::InvalidKeyName(name.to_string()));
    }
    Ok(())
}

/// Validate a label value. Empty values are allowed.
pub fn ensure_label_value_valid(value: &str) -> Result<(), LabelError> {
    if value.len() > MAX_NAME_LENGTH {
        return Err(LabelError::ValueTooLong);
    }
    if !VALUE_PATTERN.is_match(value) {
        return Err(LabelError::InvalidValue(value.to_string()));
    }
    Ok(())
}

/// Extract label keys in sorted order.
pub fn extract_and_sort_label_keys(labels: &HashMap<String, String>) -> Vec<&str> {
    let mut keys: Vec<&str> = labels.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
