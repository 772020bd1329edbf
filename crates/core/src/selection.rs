// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object addressing for list and action operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a request addresses tunnels or sessions.
///
/// Exactly one addressing mode applies: everything, an explicit list of
/// identifiers or names, or a label selector expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Selection {
    All,
    Specifications { specifications: Vec<String> },
    LabelSelector { selector: String },
}

/// Errors from selection validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("empty specification list")]
    EmptySpecifications,

    #[error("empty specification entry")]
    EmptySpecificationEntry,
}

impl Selection {
    /// Validate the selection envelope.
    ///
    /// The selector expression itself is validated at resolution time,
    /// where parse errors can be attributed to the requesting operation.
    pub fn ensure_valid(&self) -> Result<(), SelectionError> {
        match self {
            Selection::All | Selection::LabelSelector { .. } => Ok(()),
            Selection::Specifications { specifications } => {
                if specifications.is_empty() {
                    return Err(SelectionError::EmptySpecifications);
                }
                if specifications.iter().any(String::is_empty) {
                    return Err(SelectionError::EmptySpecificationEntry);
                }
                Ok(())
            }
        }
    }
}
