// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn clones_share_the_inner_writer() {
    let mut a = ConcurrentWriter::new(Vec::new());
    let mut b = a.clone();
    a.write_all(b"one ").unwrap();
    b.write_all(b"two").unwrap();
    assert_eq!(&*a.inner.lock(), b"one two");
}

#[test]
fn concurrent_writes_are_serialized() {
    let writer = ConcurrentWriter::new(Vec::new());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let mut writer = writer.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..100 {
                writer.write_all(b"chunk").unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(writer.inner.lock().len(), 4 * 100 * 5);
}
