// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared record plumbing: the on-disk store, in-memory entries, and
//! selection resolution.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mutagen_core::{parse_label_selector, Selection, Tracker, TrackingLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::manager::ManagerError;

/// Persistent object managed by a [`crate::Manager`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn identifier(&self) -> &str;
    fn name(&self) -> Option<&str>;
    fn labels(&self) -> &HashMap<String, String>;
    fn created_at(&self) -> DateTime<Utc>;
    fn paused(&self) -> bool;
    fn set_paused(&mut self, paused: bool);
    /// Bump the record's version counter before persisting a mutation.
    fn bump_version(&mut self);
}

/// Runtime connection status of a tunnel or session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Paused,
}

impl fmt::Display for Status {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Disconnected => "disconnected",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Disconnecting => "disconnecting",
            Status::Paused => "paused",
        };
        write!(formatter, "{name}")
    }
}

/// Point-in-time snapshot of one managed object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct State<T> {
    pub object: T,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub active_sessions: u64,
    pub total_sessions: u64,
    pub state_index: u64,
}

/// In-memory entry for one record plus its runtime state.
pub(crate) struct Entry<T> {
    pub record: T,
    pub status: Status,
    pub last_error: Option<String>,
    pub active_sessions: u64,
    pub total_sessions: u64,
    pub cancellation: Option<CancellationToken>,
    pub task: Option<JoinHandle<()>>,
}

impl<T> Entry<T> {
    pub fn new(record: T, status: Status) -> Self {
        Self {
            record,
            status,
            last_error: None,
            active_sessions: 0,
            total_sessions: 0,
            cancellation: None,
            task: None,
        }
    }
}

/// On-disk and in-memory record registry.
pub(crate) struct Registry<T: Record> {
    directory: PathBuf,
    pub state: Arc<TrackingLock<HashMap<String, Entry<T>>>>,
}

impl<T: Record> Registry<T> {
    /// Open the registry, loading every record in the directory.
    /// Unreadable records are skipped with a warning rather than failing
    /// the daemon.
    pub fn open(directory: PathBuf, tracker: Arc<Tracker>) -> Result<Self, ManagerError> {
        std::fs::create_dir_all(&directory).map_err(ManagerError::Io)?;

        let mut entries = HashMap::new();
        for entry in std::fs::read_dir(&directory).map_err(ManagerError::Io)? {
            let path = entry.map_err(ManagerError::Io)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record: T = match std::fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|data| serde_json::from_slice(&data).map_err(|e| e.to_string()))
            {
                Ok(record) => record,
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable record");
                    continue;
                }
            };
            let status =
                if record.paused() { Status::Paused } else { Status::Disconnected };
            entries.insert(record.identifier().to_string(), Entry::new(record, status));
        }

        let state = Arc::new(TrackingLock::new(tracker, entries));
        Ok(Self { directory, state })
    }

    /// Persist a record atomically.
    pub fn write_record(&self, record: &T) -> Result<(), ManagerError> {
        let contents = serde_json::to_vec_pretty(record)?;
        let path = self.record_path(record.identifier());
        mutagen_platform::write_file_atomic(&path, &contents, 0o600).map_err(ManagerError::Io)
    }

    /// Remove a record from disk.
    pub fn delete_record(&self, identifier: &str) -> Result<(), ManagerError> {
        let path = self.record_path(identifier);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ManagerError::Io(error)),
        }
    }

    fn record_path(&self, identifier: &str) -> PathBuf {
        self.directory.join(format!("{identifier}.json"))
    }

    /// Resolve a selection to identifiers, ordered by creation time with
    /// identifier tiebreak.
    pub fn resolve(&self, selection: &Selection) -> Result<Vec<String>, ManagerError> {
        selection.ensure_valid()?;

        let guard = self.state.lock();
        let mut matched: Vec<(DateTime<Utc>, String)> = match selection {
            Selection::All => guard
                .values()
                .map(|entry| {
                    (entry.record.created_at(), entry.record.identifier().to_string())
                })
                .collect(),
            Selection::Specifications { specifications } => {
                let mut matched = Vec::new();
                for entry in guard.values() {
                    let record = &entry.record;
                    let hit = specifications.iter().any(|specification| {
                        record.identifier() == specification
                            || record.name() == Some(specification.as_str())
                    });
                    if hit {
                        matched.push((record.created_at(), record.identifier().to_string()));
                    }
                }
                matched
            }
            Selection::LabelSelector { selector } => {
                let selector = parse_label_selector(selector)?;
                guard
                    .values()
                    .filter(|entry| selector.matches(entry.record.labels()))
                    .map(|entry| {
                        (entry.record.created_at(), entry.record.identifier().to_string())
                    })
                    .collect()
            }
        };
        guard.unlock_without_notify();

        matched.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(matched.into_iter().map(|(_, identifier)| identifier).collect())
    }
}
