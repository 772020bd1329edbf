// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user data directory resolution and creation.

use std::path::PathBuf;

use thiserror::Error;

/// Environment variable overriding the data directory root.
pub const DATA_DIRECTORY_ENVIRONMENT_VARIABLE: &str = "MUTAGEN_DATA_DIRECTORY";

/// Name of the data directory under the user's home directory.
const DATA_DIRECTORY_NAME: &str = ".mutagen";

/// Errors from data directory resolution.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("unable to determine home directory")]
    NoHomeDirectory,

    #[error("unable to create directory: {0}")]
    Create(#[from] std::io::Error),
}

/// Resolve (and optionally create) a path under the data directory.
///
/// The root is `~/.mutagen` unless `MUTAGEN_DATA_DIRECTORY` overrides it.
/// With `create`, each component is created with mode 0700, and the root
/// is marked hidden on platforms where the dot prefix is not enough.
pub fn data_directory(create: bool, subpaths: &[&str]) -> Result<PathBuf, DirectoryError> {
    let root = match std::env::var_os(DATA_DIRECTORY_ENVIRONMENT_VARIABLE) {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => dirs::home_dir().ok_or(DirectoryError::NoHomeDirectory)?.join(DATA_DIRECTORY_NAME),
    };

    if create && !root.exists() {
        create_private_directory(&root)?;
        hide_directory(&root);
    }

    let mut path = root;
    for subpath in subpaths {
        path.push(subpath);
        if create && !path.exists() {
            create_private_directory(&path)?;
        }
    }
    Ok(path)
}

#[cfg(unix)]
fn create_private_directory(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_directory(path: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Best-effort hidden attribute. The dot prefix suffices on POSIX; on
/// Windows the attribute is applied via `attrib` and failure is ignored.
fn hide_directory(path: &std::path::Path) {
    #[cfg(windows)]
    {
        let _ = std::process::Command::new("attrib").arg("+h").arg(path).status();
    }
    #[cfg(not(windows))]
    let _ = path;
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
