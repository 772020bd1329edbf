// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarding session records and their manager.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mutagen_core::{new_identifier, PREFIX_FORWARDING};
use serde::{Deserialize, Serialize};

use crate::manager::{Manager, ManagerError};
use crate::prompting::Prompter;
use crate::registry::Record;

/// Endpoint pair forwarded by a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardingConfiguration {
    /// Listener endpoint URL.
    pub source: String,
    /// Target endpoint URL.
    pub destination: String,
}

/// A persistent forwarding session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardingSession {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub configuration: ForwardingConfiguration,
    pub created_at: DateTime<Utc>,
    pub paused: bool,
    pub version: u64,
}

impl Record for ForwardingSession {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}

/// Parameters for forwarding session creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardingCreateSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub configuration: ForwardingConfiguration,
    #[serde(default)]
    pub paused: bool,
}

/// Manager for forwarding sessions.
pub type ForwardingManager = Manager<ForwardingSession>;

impl Manager<ForwardingSession> {
    /// Create a forwarding session.
    pub async fn create_session(
        &self,
        spec: ForwardingCreateSpec,
        prompter: &dyn Prompter,
    ) -> Result<ForwardingSession, ManagerError> {
        let session = ForwardingSession {
            identifier: new_identifier(PREFIX_FORWARDING)?,
            name: spec.name.filter(|name| !name.is_empty()),
            labels: spec.labels,
            configuration: spec.configuration,
            created_at: Utc::now(),
            paused: spec.paused,
            version: 1,
        };
        self.create(session, prompter).await
    }
}

#[cfg(test)]
#[path = "forwarding_tests.rs"]
mod tests;
