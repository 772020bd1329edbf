// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Equality- and set-based label selector expressions.
//!
//! Grammar: `key`, `!key`, `key=v`, `key==v`, `key!=v`, `key in (v1,v2)`,
//! `key notin (v1)`, joined by commas (AND).

use std::collections::HashMap;

use thiserror::Error;

use crate::labels::{ensure_label_key_valid, ensure_label_value_valid, LabelError};

/// Comparison operator in a selector requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Exists,
    NotExists,
    Equals,
    NotEquals,
    In,
    NotIn,
}

/// A single parsed requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
    pub values: Vec<String>,
}

impl Requirement {
    fn matches(&self, labels: &HashMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::Exists => value.is_some(),
            Operator::NotExists => value.is_none(),
            Operator::Equals => value.is_some_and(|v| self.values.iter().any(|c| c == v)),
            Operator::NotEquals => !value.is_some_and(|v| self.values.iter().any(|c| c == v)),
            Operator::In => value.is_some_and(|v| self.values.iter().any(|c| c == v)),
            Operator::NotIn => !value.is_some_and(|v| self.values.iter().any(|c| c == v)),
        }
    }
}

/// A parsed label selector: the conjunction of its requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// Check whether a label map satisfies every requirement.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    /// The parsed requirements.
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

/// Errors from selector parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector clause")]
    EmptyClause,

    #[error("invalid key: {0}")]
    InvalidKey(#[source] LabelError),

    #[error("invalid value: {0}")]
    InvalidValue(#[source] LabelError),

    #[error("malformed value set: {0:?}")]
    MalformedValueSet(String),

    #[error("empty value set")]
    EmptyValueSet,

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
}

/// Parse a label selector expression.
///
/// An empty (or all-whitespace) expression yields a selector that matches
/// every label map.
pub fn parse_label_selector(expression: &str) -> Result<LabelSelector, SelectorError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(LabelSelector::default());
    }

    let mut requirements = Vec::new();
    for clause in split_top_level(expression)? {
        requirements.push(parse_requirement(clause.trim())?);
    }
    Ok(LabelSelector { requirements })
}

/// Split on commas that are not inside a parenthesized value set.
fn split_top_level(expression: &str) -> Result<Vec<&str>, SelectorError> {
    let mut clauses = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, character) in expression.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or(SelectorError::UnbalancedParentheses)?;
            }
            ',' if depth == 0 => {
                clauses.push(&expression[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SelectorError::UnbalancedParentheses);
    }
    clauses.push(&expression[start..]);
    Ok(clauses)
}

fn parse_requirement(clause: &str) -> Result<Requirement, SelectorError> {
    if clause.is_empty() {
        return Err(SelectorError::EmptyClause);
    }

    if let Some(key) = clause.strip_prefix('!') {
        let key = key.trim();
        ensure_label_key_valid(key).map_err(SelectorError::InvalidKey)?;
        return Ok(Requirement {
            key: key.to_string(),
            operator: Operator::NotExists,
            values: Vec::new(),
        });
    }

    if let Some((key, value)) = clause.split_once("!=") {
        return equality_requirement(key, value, Operator::NotEquals);
    }
    if let Some((key, value)) = clause.split_once("==") {
        return equality_requirement(key, value, Operator::Equals);
    }
    if let Some((key, value)) = clause.split_once('=') {
        return equality_requirement(key, value, Operator::Equals);
    }

    if let Some(index) = clause.find(" notin ") {
        return set_requirement(&clause[..index], &clause[index + " notin ".len()..], Operator::NotIn);
    }
    if let Some(index) = clause.find(" in ") {
        return set_requirement(&clause[..index], &clause[index + " in ".len()..], Operator::In);
    }

    ensure_label_key_valid(clause).map_err(SelectorError::InvalidKey)?;
    Ok(Requirement { key: clause.to_string(), operator: Operator::Exists, values: Vec::new() })
}

fn equality_requirement(
    key: &str,
    value: &str,
    operator: Operator,
) -> Result<Requirement, SelectorError> {
    let key = key.trim();
    let value = value.trim();
    ensure_label_key_valid(key).map_err(SelectorError::InvalidKey)?;
    ensure_label_value_valid(value).map_err(SelectorError::InvalidValue)?;
    Ok(Requirement { key: key.to_string(), operator, values: vec![value.to_string()] })
}

fn set_requirement(
    key: &str,
    values: &str,
    operator: Operator,
) -> Result<Requirement, SelectorError> {
    let key = key.trim();
    ensure_label_key_valid(key).map_err(SelectorError::InvalidKey)?;

    let values = values.trim();
    let inner = values
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| SelectorError::MalformedValueSet(values.to_string()))?;

    let mut parsed = Vec::new();
    for value in inner.split(',') {
        let value = value.trim();
        if value.is_empty() {
            return Err(SelectorError::EmptyValueSet);
        }
        ensure_label_value_valid(value).map_err(SelectorError::InvalidValue)?;
        parsed.push(value.to_string());
    }
    if parsed.is_empty() {
        return Err(SelectorError::EmptyValueSet);
    }
    Ok(Requirement { key: key.to_string(), operator, values: parsed })
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
