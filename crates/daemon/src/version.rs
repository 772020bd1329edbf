// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build version identification and matching.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pre-release tag for the current build. Empty for release builds.
const VERSION_TAG: &str = "";

/// A daemon or client build version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    #[serde(default)]
    pub tag: String,
}

impl Version {
    /// The version of the current build.
    pub fn current() -> Self {
        let mut components = env!("CARGO_PKG_VERSION").splitn(3, '.');
        let mut next = || {
            components
                .next()
                .and_then(|component| component.parse::<u64>().ok())
                .unwrap_or(0)
        };
        Self { major: next(), minor: next(), patch: next(), tag: VERSION_TAG.to_string() }
    }

    /// Whether this version exactly matches another, including tags.
    pub fn matches(&self, other: &Version) -> bool {
        self == other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.tag.is_empty() {
            write!(formatter, "-{}", self.tag)?;
        }
        Ok(())
    }
}
