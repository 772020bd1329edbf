// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronization session records, their manager, and file staging.

mod staging;

pub use staging::{serve_staging, stage_files, StagingCoordinator, StagingError};

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mutagen_compress::Algorithm;
use mutagen_core::{new_identifier, PREFIX_SYNCHRONIZATION};
use serde::{Deserialize, Serialize};

use crate::manager::{Manager, ManagerError};
use crate::prompting::Prompter;
use crate::registry::Record;

/// Endpoint pair and transfer options for a synchronization session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynchronizationConfiguration {
    /// First endpoint URL.
    pub alpha: String,
    /// Second endpoint URL.
    pub beta: String,
    /// Compression for staging connections. `default` resolves against
    /// the connection's locality at staging time.
    #[serde(default)]
    pub compression: Algorithm,
}

/// A persistent synchronization session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynchronizationSession {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub configuration: SynchronizationConfiguration,
    pub created_at: DateTime<Utc>,
    pub paused: bool,
    pub version: u64,
}

impl Record for SynchronizationSession {
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

/// Parameters for synchronization session creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynchronizationCreateSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub configuration: SynchronizationConfiguration,
    #[serde(default)]
    pub paused: bool,
}

/// Manager for synchronization sessions.
pub type SynchronizationManager = Manager<SynchronizationSession>;

impl Manager<SynchronizationSession> {
    /// Create a synchronization session.
    pub async fn create_session(
        &self,
        spec: SynchronizationCreateSpec,
        prompter: &dyn Prompter,
    ) -> Result<SynchronizationSession, ManagerError> {
        let session = SynchronizationSession {
            identifier: new_identifier(PREFIX_SYNCHRONIZATION)?,
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
