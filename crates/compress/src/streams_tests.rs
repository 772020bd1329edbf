// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn round_trip(algorithm: Algorithm, payload: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    {
        let mut compressor = compress(algorithm, &mut compressed).unwrap();
        compressor.write_all(payload).unwrap();
        compressor.close().unwrap();
    }

    let mut decompressor = decompress(algorithm, io::Cursor::new(compressed)).unwrap();
    let mut output = Vec::new();
    decompressor.read_to_end(&mut output).unwrap();
    output
}

#[parameterized(
    none = { Algorithm::None },
    deflate = { Algorithm::Deflate },
    zstandard = { Algorithm::Zstandard },
)]
fn compress_decompress_round_trip(algorithm: Algorithm) {
    let payload: Vec<u8> = (0u32..4096).flat_map(|v| v.to_le_bytes()).collect();
    assert_eq!(round_trip(algorithm, &payload), payload);
}

#[parameterized(
    none = { Algorithm::None },
    deflate = { Algorithm::Deflate },
    zstandard = { Algorithm::Zstandard },
)]
fn empty_payload_round_trips(algorithm: Algorithm) {
    assert_eq!(round_trip(algorithm, b""), b"");
}

#[test]
fn deflate_actually_compresses() {
    let payload = vec![b'a'; 64 * 1024];
    let mut compressed = Vec::new();
    {
        let mut compressor = compress(Algorithm::Deflate, &mut compressed).unwrap();
        compressor.write_all(&payload).unwrap();
        compressor.close().unwrap();
    }
    assert!(compressed.len() < payload.len() / 10);
}

#[test]
fn unresolved_default_cannot_construct_streams() {
    assert!(compress(Algorithm::Default, Vec::new()).is_err());
    assert!(decompress(Algorithm::Default, io::Cursor::new(Vec::new())).is_err());
}

#[test]
fn write_after_close_fails() {
    let mut compressor = compress(Algorithm::Deflate, Vec::new()).unwrap();
    compressor.write_all(b"data").unwrap();
    compressor.close().unwrap();
    assert!(compressor.write(b"more").is_err());
}
