// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic lifecycle manager for tunnels and sessions.
//!
//! The manager owns the record registry and one reconnect loop per
//! unpaused record. Mutations are all-or-nothing: the record is written
//! atomically to disk and the in-memory map updated, or neither.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use mutagen_core::{
    ensure_label_key_valid, ensure_label_value_valid, ensure_name_valid, IdentifierError,
    LabelError, NameError, Selection, SelectionError, SelectorError, Tracker, TrackerError,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::prompting::{Prompter, PromptingError};
use crate::registry::{Entry, Record, Registry, State, Status};
use crate::runloop::{spawn_run_loop, Activity, TransportError};

/// Transport seam run by the manager's reconnect loop.
#[async_trait]
pub trait Connector<T: Record>: Send + Sync {
    /// Run one connection for the record until it fails or the token is
    /// cancelled. Report status transitions through `activity`.
    async fn run(
        &self,
        cancellation: CancellationToken,
        record: T,
        activity: watch::Sender<Activity>,
    ) -> Result<(), TransportError>;

    /// Drive one explicit staging cycle for the record. Only meaningful
    /// for synchronization sessions.
    async fn flush(&self, _record: T) -> Result<(), TransportError> {
        Err(TransportError::unrecoverable("flush not supported by this transport"))
    }
}

/// Errors from manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    #[error("name already in use: {0}")]
    DuplicateName(String),

    #[error("invalid label: {0}")]
    InvalidLabel(#[from] LabelError),

    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    #[error("invalid label selector: {0}")]
    InvalidSelector(#[from] SelectorError),

    #[error("no matching objects")]
    NoMatches,

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object not paused: {0}")]
    NotPaused(String),

    #[error("identifier generation failed: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("prompting failed: {0}")]
    Prompting(#[from] PromptingError),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("state tracking failed: {0}")]
    Tracker(#[from] TrackerError),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle manager for one record type.
pub struct Manager<T: Record> {
    connector: Arc<dyn Connector<T>>,
    registry: Registry<T>,
    tracker: Arc<Tracker>,
}

impl<T: Record> Manager<T> {
    /// Open the manager over a record directory, spawning reconnect
    /// loops for every unpaused record found on disk.
    pub fn open(
        directory: PathBuf,
        connector: Arc<dyn Connector<T>>,
    ) -> Result<Self, ManagerError> {
        let tracker = Tracker::new();
        let registry = Registry::open(directory, Arc::clone(&tracker))?;
        let manager = Self { connector, registry, tracker };

        let resumable: Vec<T> = {
            let guard = manager.registry.state.lock();
            let records = guard
                .values()
                .filter(|entry| !entry.record.paused())
                .map(|entry| entry.record.clone())
                .collect();
            guard.unlock_without_notify();
            records
        };
        for record in resumable {
            manager.spawn_loop(record);
        }
        Ok(manager)
    }

    /// The manager's state tracker.
    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Validate and register a new record, write it to disk, and start
    /// its connection loop unless it is paused.
    pub async fn create(&self, record: T, prompter: &dyn Prompter) -> Result<T, ManagerError> {
        if let Some(name) = record.name() {
            ensure_name_valid(name)?;
        }
        for (key, value) in record.labels() {
            ensure_label_key_valid(key)?;
            ensure_label_value_valid(value)?;
        }

        prompter.message("Creating and validating record").await?;

        // Write to disk under the manager's lock, rolling back the file
        // if registration cannot complete.
        {
            let mut guard = self.registry.state.lock();
            if let Some(name) = record.name() {
                let duplicate = guard
                    .values()
                    .any(|entry| entry.record.name() == Some(name));
                if duplicate {
                    guard.unlock_without_notify();
                    return Err(ManagerError::DuplicateName(name.to_string()));
                }
            }
            self.registry.write_record(&record)?;
            let status = if record.paused() { Status::Paused } else { Status::Disconnected };
            guard.insert(record.identifier().to_string(), Entry::new(record.clone(), status));
        }

        if !record.paused() {
            self.spawn_loop(record.clone());
        }
        info!(identifier = record.identifier(), "created record");
        Ok(record)
    }

    /// List states for a selection, blocking while the caller's previous
    /// state index is still current.
    pub async fn list(
        &self,
        selection: &Selection,
        previous_state_index: u64,
    ) -> Result<(u64, Vec<State<T>>), ManagerError> {
        if previous_state_index == self.tracker.index() {
            self.tracker.wait_for_change(previous_state_index).await?;
        }

        let identifiers = self.registry.resolve(selection)?;
        let state_index = self.tracker.index();

        let guard = self.registry.state.lock();
        let states = identifiers
            .iter()
            .filter_map(|identifier| guard.get(identifier))
            .map(|entry| State {
                object: entry.record.clone(),
                status: entry.status,
                last_error: entry.last_error.clone(),
                active_sessions: entry.active_sessions,
                total_sessions: entry.total_sessions,
                state_index,
            })
            .collect();
        guard.unlock_without_notify();

        Ok((state_index, states))
    }

    /// Pause matching records: stop their loops, mark them paused, and
    /// persist.
    pub async fn pause(
        &self,
        selection: &Selection,
        prompter: &dyn Prompter,
    ) -> Result<(), ManagerError> {
        let identifiers = self.resolve_for_action(selection)?;
        for identifier in identifiers {
            prompter.message(&format!("Pausing {identifier}")).await?;
            self.halt(&identifier, Status::Disconnecting).await;

            let record = {
                let mut guard = self.registry.state.lock();
                let entry = guard
                    .get_mut(&identifier)
                    .ok_or_else(|| ManagerError::NotFound(identifier.clone()))?;
                entry.record.set_paused(true);
                entry.record.bump_version();
                entry.status = Status::Paused;
                entry.record.clone()
            };
            self.registry.write_record(&record)?;
            info!(identifier, "paused");
        }
        Ok(())
    }

    /// Resume matching records. Resuming is only valid from the paused
    /// state.
    pub async fn resume(
        &self,
        selection: &Selection,
        prompter: &dyn Prompter,
    ) -> Result<(), ManagerError> {
        let identifiers = self.resolve_for_action(selection)?;
        for identifier in identifiers {
            prompter.message(&format!("Resuming {identifier}")).await?;

            {
                let guard = self.registry.state.lock();
                let paused = guard.get(&identifier).map(|entry| entry.record.paused());
                guard.unlock_without_notify();
                match paused {
                    Some(true) => {}
                    Some(false) => return Err(ManagerError::NotPaused(identifier.clone())),
                    None => return Err(ManagerError::NotFound(identifier.clone())),
                }
            }

            let record = {
                let mut guard = self.registry.state.lock();
                let entry = guard
                    .get_mut(&identifier)
                    .ok_or_else(|| ManagerError::NotFound(identifier.clone()))?;
                entry.record.set_paused(false);
                entry.record.bump_version();
                entry.status = Status::Connecting;
                entry.record.clone()
            };
            self.registry.write_record(&record)?;
            self.spawn_loop(record);
            info!(identifier, "resumed");
        }
        Ok(())
    }

    /// Terminate matching records: stop their loops and remove them
    /// permanently.
    pub async fn terminate(
        &self,
        selection: &Selection,
        prompter: &dyn Prompter,
    ) -> Result<(), ManagerError> {
        let identifiers = self.resolve_for_action(selection)?;
        for identifier in identifiers {
            prompter.message(&format!("Terminating {identifier}")).await?;
            self.halt(&identifier, Status::Disconnecting).await;

            {
                let mut guard = self.registry.state.lock();
                guard.remove(&identifier);
            }
            self.registry.delete_record(&identifier)?;
            info!(identifier, "terminated");
        }
        Ok(())
    }

    /// Drive one explicit staging cycle for matching records.
    pub async fn flush(
        &self,
        selection: &Selection,
        prompter: &dyn Prompter,
    ) -> Result<(), ManagerError> {
        let identifiers = self.resolve_for_action(selection)?;
        for identifier in identifiers {
            prompter.message(&format!("Flushing {identifier}")).await?;
            let record = {
                let guard = self.registry.state.lock();
                let record = guard
                    .get(&identifier)
                    .map(|entry| entry.record.clone())
                    .ok_or_else(|| ManagerError::NotFound(identifier.clone()))?;
                guard.unlock_without_notify();
                record
            };
            self.connector.flush(record).await?;
        }
        Ok(())
    }

    /// Stop every connection loop without touching records, for daemon
    /// shutdown.
    pub async fn shutdown(&self) {
        let halting: Vec<String> = {
            let guard = self.registry.state.lock();
            let identifiers = guard.keys().cloned().collect();
            guard.unlock_without_notify();
            identifiers
        };
        for identifier in halting {
            self.halt(&identifier, Status::Disconnected).await;
        }
        self.tracker.poison();
    }

    fn resolve_for_action(&self, selection: &Selection) -> Result<Vec<String>, ManagerError> {
        let identifiers = self.registry.resolve(selection)?;
        if identifiers.is_empty() {
            return Err(ManagerError::NoMatches);
        }
        Ok(identifiers)
    }

    fn spawn_loop(&self, record: T) {
        let cancellation = CancellationToken::new();
        let task = spawn_run_loop(
            Arc::clone(&self.registry.state),
            Arc::clone(&self.connector),
            record.clone(),
            cancellation.clone(),
        );

        let mut guard = self.registry.state.lock();
        if let Some(entry) = guard.get_mut(record.identifier()) {
            entry.cancellation = Some(cancellation);
            entry.task = Some(task);
            entry.status = Status::Connecting;
        }
    }

    /// Stop a record's connection loop and wait for it to exit.
    async fn halt(&self, identifier: &str, transitional: Status) {
        let (cancellation, task) = {
            let mut guard = self.registry.state.lock();
            match guard.get_mut(identifier) {
                Some(entry) => {
                    entry.status = transitional;
                    (entry.cancellation.take(), entry.task.take())
                }
                None => (None, None),
            }
        };
        if let Some(cancellation) = cancellation {
            cancellation.cancel();
        }
        if let Some(task) = task {
            task.await.ok();
        }
    }
}
