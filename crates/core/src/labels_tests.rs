// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "env" },
    mixed = { "appTier" },
    dotted = { "release.channel" },
    underscored = { "build_id" },
    prefixed = { "example.com/env" },
    nested_prefix = { "sub.example.com/env" },
)]
fn accepts_valid_keys(key: &str) {
    assert_eq!(ensure_label_key_valid(key), Ok(()));
}

#[parameterized(
    empty = { "" },
    leading_dash = { "-env" },
    trailing_dot = { "env." },
    bad_prefix = { "Example.Com/env" },
    empty_name = { "example.com/" },
    spaced = { "en v" },
)]
fn rejects_invalid_keys(key: &str) {
    assert!(ensure_label_key_valid(key).is_err(), "key {key:?}");
}

#[test]
fn rejects_overlong_key_name() {
    let key = "a".repeat(64);
    assert_eq!(ensure_label_key_valid(&key), Err(LabelError::KeyNameTooLong));
}

#[test]
fn rejects_overlong_key_prefix() {
    let key = format!("{}/env", "a".repeat(254));
    assert_eq!(ensure_label_key_valid(&key), Err(LabelError::KeyPrefixTooLong));
}

#[parameterized(
    empty = { "" },
    simple = { "dev" },
    dashed = { "us-west-2" },
    dotted = { "v1.2.3" },
    underscored = { "a_b" },
)]
fn accepts_valid_values(value: &str) {
    assert_eq!(ensure_label_value_valid(value), Ok(()));
}

#[parameterized(
    leading_dash = { "-dev" },
    trailing_underscore = { "dev_" },
    spaced = { "de v" },
)]
fn rejects_invalid_values(value: &str) {
    assert!(ensure_label_value_valid(value).is_err(), "value {value:?}");
}

#[test]
fn rejects_overlong_value() {
    let value = "a".repeat(64);
    assert_eq!(ensure_label_value_valid(&value), Err(LabelError::ValueTooLong));
}

#[test]
fn extract_and_sort_label_keys_sorts() {
    let mut labels = HashMap::new();
    labels.insert("env".to_string(), "dev".to_string());
    labels.insert("app".to_string(), "web".to_string());
    labels.insert("tier".to_string(), "2".to_string());
    assert_eq!(extract_and_sort_label_keys(&labels), vec!["app", "env", "tier"]);
}
