// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compression algorithm selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compression algorithms recognised by the daemon.
///
/// `Default` defers the choice until the connection's locality is known:
/// local connections skip compression, remote connections use DEFLATE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Default,
    None,
    Deflate,
    Zstandard,
}

/// Errors from algorithm parsing and negotiation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlgorithmError {
    #[error("unknown compression algorithm: {0:?}")]
    Unknown(String),

    #[error("unknown compression algorithm identifier: {0}")]
    UnknownIdentifier(u8),

    #[error("algorithm not resolved before use")]
    Unresolved,
}

impl Algorithm {
    /// Resolve `Default` against the connection's locality.
    #[must_use]
    pub fn resolve(self, remote: bool) -> Algorithm {
        match self {
            Algorithm::Default => {
                if remote {
                    Algorithm::Deflate
                } else {
                    Algorithm::None
                }
            }
            other => other,
        }
    }

    /// The wire identifier used in the negotiation handshake.
    ///
    /// Only resolved algorithms have identifiers.
    pub fn identifier(self) -> Result<u8, AlgorithmError> {
        match self {
            Algorithm::Default => Err(AlgorithmError::Unresolved),
            Algorithm::None => Ok(0),
            Algorithm::Deflate => Ok(1),
            Algorithm::Zstandard => Ok(2),
        }
    }

    /// Decode a wire identifier.
    pub fn from_identifier(identifier: u8) -> Result<Algorithm, AlgorithmError> {
        match identifier {
            0 => Ok(Algorithm::None),
            1 => Ok(Algorithm::Deflate),
            2 => Ok(Algorithm::Zstandard),
            other => Err(AlgorithmError::UnknownIdentifier(other)),
        }
    }
}

impl FromStr for Algorithm {
    type Err = AlgorithmError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "default" => Ok(Algorithm::Default),
            "none" => Ok(Algorithm::None),
            "deflate" => Ok(Algorithm::Deflate),
            "zstandard" => Ok(Algorithm::Zstandard),
            other => Err(AlgorithmError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Default => "default",
            Algorithm::None => "none",
            Algorithm::Deflate => "deflate",
            Algorithm::Zstandard => "zstandard",
        };
        write!(formatter, "{name}")
    }
}

#[cfg(test)]
#[path = "algorithm_tests.rs"]
mod tests;
