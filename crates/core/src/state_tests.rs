// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn wait_returns_immediately_for_stale_index() {
    let tracker = Tracker::new();
    // Index starts at 1, so a "never observed" zero returns at once.
    assert_eq!(tracker.wait_for_change(0).await, Ok(1));
}

#[tokio::test]
async fn wait_blocks_until_notified() {
    let tracker = Tracker::new();
    let current = tracker.index();

    let waiter = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.wait_for_change(current).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    tracker.notify_of_change();
    let observed = waiter.await.unwrap().unwrap();
    assert!(observed > current);
}

#[tokio::test]
async fn indices_are_strictly_monotonic() {
    let tracker = Tracker::new();
    let mut previous = tracker.index();
    for _ in 0..100 {
        tracker.notify_of_change();
        let current = tracker.index();
        assert!(current > previous);
        previous = current;
    }
}

#[tokio::test]
async fn poison_unblocks_waiters() {
    let tracker = Tracker::new();
    let current = tracker.index();

    let waiter = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.wait_for_change(current).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    tracker.poison();
    assert_eq!(waiter.await.unwrap(), Err(TrackerError::Poisoned));

    // Later waits fail immediately.
    assert_eq!(tracker.wait_for_change(0).await, Err(TrackerError::Poisoned));
}

#[tokio::test]
async fn tracking_lock_notifies_on_release() {
    let tracker = Tracker::new();
    let lock = TrackingLock::new(Arc::clone(&tracker), 0u32);
    let before = tracker.index();

    {
        let mut guard = lock.lock();
        *guard += 1;
    }
    assert_eq!(tracker.index(), before + 1);
}

#[tokio::test]
async fn tracking_lock_snapshot_release_is_silent() {
    let tracker = Tracker::new();
    let lock = TrackingLock::new(Arc::clone(&tracker), 0u32);
    let before = tracker.index();

    let guard = lock.lock();
    assert_eq!(*guard, 0);
    guard.unlock_without_notify();
    assert_eq!(tracker.index(), before);
}

#[tokio::test]
async fn tracking_lock_wait_observes_write() {
    let tracker = Tracker::new();
    let lock = Arc::new(TrackingLock::new(Arc::clone(&tracker), 0u32));
    let observed = tracker.index();

    let waiter = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.wait_for_change(observed).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    *lock.lock() = 42;
    assert!(waiter.await.unwrap().unwrap() > observed);
    assert_eq!(*lock.lock(), 42);
}
