// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System service registration contract.
//!
//! Platform packages (launchd, systemd) provide real implementations;
//! this build carries the contract only, so registration operations
//! report unsupported and the start/stop paths fall back to direct
//! process management.

use thiserror::Error;

/// Errors from registration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("registration not supported on this platform")]
    Unsupported,
}

/// Register the daemon with the system service manager.
pub fn register() -> Result<(), RegistrationError> {
    Err(RegistrationError::Unsupported)
}

/// Remove the daemon's system service registration.
pub fn unregister() -> Result<(), RegistrationError> {
    Err(RegistrationError::Unsupported)
}

/// Attempt to start the daemon via its system service registration.
/// Returns false when no registration exists, in which case the caller
/// starts the daemon directly.
pub fn registered_start() -> Result<bool, RegistrationError> {
    Ok(false)
}

/// Attempt to stop the daemon via its system service registration.
pub fn registered_stop() -> Result<bool, RegistrationError> {
    Ok(false)
}
