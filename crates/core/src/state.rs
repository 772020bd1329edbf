// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change tracking for polled state.
//!
//! A [`Tracker`] carries a strictly monotonic state index. List callers
//! pass the last index they observed and block until it advances; write
//! paths bump the index through a [`TrackingLock`] whose guard notifies
//! on release.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy)]
struct TrackerState {
    index: u64,
    poisoned: bool,
}

/// Errors from tracker waits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("tracker poisoned")]
    Poisoned,
}

/// Monotonic state-version counter with async change notification.
#[derive(Debug)]
pub struct Tracker {
    channel: watch::Sender<TrackerState>,
}

impl Tracker {
    /// Create a tracker. The initial index is 1 so that callers passing a
    /// zero "never observed" index return immediately.
    pub fn new() -> Arc<Self> {
        let (channel, _) = watch::channel(TrackerState { index: 1, poisoned: false });
        Arc::new(Self { channel })
    }

    /// The current state index.
    pub fn index(&self) -> u64 {
        self.channel.borrow().index
    }

    /// Increment the state index and wake all waiters.
    pub fn notify_of_change(&self) {
        self.channel.send_modify(|state| state.index += 1);
    }

    /// Unblock all current and future waiters with an error.
    pub fn poison(&self) {
        self.channel.send_modify(|state| state.poisoned = true);
    }

    /// Wait until the index differs from `previous`, returning the new
    /// index. Cancellation is the caller's responsibility (drop the
    /// future or race it against a cancellation token).
    pub async fn wait_for_change(&self, previous: u64) -> Result<u64, TrackerError> {
        let mut receiver = self.channel.subscribe();
        loop {
            let state = *receiver.borrow_and_update();
            if state.poisoned {
                return Err(TrackerError::Poisoned);
            }
            if state.index != previous {
                return Ok(state.index);
            }
            if receiver.changed().await.is_err() {
                return Err(TrackerError::Poisoned);
            }
        }
    }
}

/// A mutex whose guard notifies the tracker when released.
///
/// Write-side mutations release normally (notify); read-only snapshots
/// release via [`TrackingGuard::unlock_without_notify`].
#[derive(Debug)]
pub struct TrackingLock<T> {
    tracker: Arc<Tracker>,
    state: Mutex<T>,
}

impl<T> TrackingLock<T> {
    pub fn new(tracker: Arc<Tracker>, value: T) -> Self {
        Self { tracker, state: Mutex::new(value) }
    }

    /// The tracker driven by this lock.
    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Acquire the lock. Dropping the guard notifies the tracker.
    pub fn lock(&self) -> TrackingGuard<'_, T> {
        TrackingGuard { guard: Some(self.state.lock()), tracker: &self.tracker, notify: true }
    }
}

/// Guard returned by [`TrackingLock::lock`].
pub struct TrackingGuard<'a, T> {
    guard: Option<MutexGuard<'a, T>>,
    tracker: &'a Tracker,
    notify: bool,
}

impl<T> TrackingGuard<'_, T> {
    /// Release without bumping the state index.
    pub fn unlock_without_notify(mut self) {
        self.notify = false;
    }
}

impl<T> Deref for TrackingGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Invariant: guard is only None after drop has begun.
        match self.guard.as_deref() {
            Some(value) => value,
            None => unreachable!("tracking guard used after release"),
        }
    }
}

impl<T> DerefMut for TrackingGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.guard.as_deref_mut() {
            Some(value) => value,
            None => unreachable!("tracking guard used after release"),
        }
    }
}

impl<T> Drop for TrackingGuard<'_, T> {
    fn drop(&mut self) {
        // Release the mutex before waking waiters so they can acquire it.
        self.guard.take();
        if self.notify {
            self.tracker.notify_of_change();
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
