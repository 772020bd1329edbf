// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn writes_contents_and_mode() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("record.json");

    write_file_atomic(&path, b"{\"ok\":true}", 0o600).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"{\"ok\":true}");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn replaces_existing_file() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("record.json");

    write_file_atomic(&path, b"first", 0o600).unwrap();
    write_file_atomic(&path, b"second", 0o600).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"second");
}

#[test]
fn leaves_no_temp_file_behind() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("record.json");

    write_file_atomic(&path, b"contents", 0o600).unwrap();

    let entries: Vec<_> = std::fs::read_dir(directory.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn fails_without_parent_directory() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("missing").join("record.json");
    assert!(write_file_atomic(&path, b"contents", 0o600).is_err());
}
