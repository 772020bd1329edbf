// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Ping {
    sequence: u64,
    payload: String,
}

#[test]
fn encode_prefixes_payload_length() {
    let frame = encode(&Ping { sequence: 1, payload: "x".into() }).unwrap();
    let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    assert_eq!(length, frame.len() - 4);
}

#[test]
fn sync_round_trip() {
    let message = Ping { sequence: 7, payload: "hello".into() };
    let mut buffer = Vec::new();
    write_frame(&mut buffer, &message).unwrap();

    let mut reader = std::io::Cursor::new(buffer);
    let decoded: Ping = read_frame(&mut reader).unwrap();
    assert_eq!(decoded, message);
}

#[tokio::test]
async fn async_round_trip() {
    let message = Ping { sequence: 9, payload: "hello".into() };
    let (mut client, mut server) = tokio::io::duplex(1024);

    write_message(&mut client, &message).await.unwrap();
    let decoded: Ping = read_message(&mut server).await.unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn multiple_frames_in_sequence() {
    let mut buffer = Vec::new();
    for sequence in 0..3u64 {
        write_frame(&mut buffer, &Ping { sequence, payload: String::new() }).unwrap();
    }

    let mut reader = std::io::Cursor::new(buffer);
    for sequence in 0..3u64 {
        let decoded: Ping = read_frame(&mut reader).unwrap();
        assert_eq!(decoded.sequence, sequence);
    }
    assert!(matches!(
        read_frame::<_, Ping>(&mut reader),
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[test]
fn eof_at_frame_boundary_is_connection_closed() {
    let mut reader = std::io::Cursor::new(Vec::<u8>::new());
    assert!(matches!(
        read_frame::<_, Ping>(&mut reader),
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[test]
fn truncated_payload_is_an_io_error() {
    let mut frame = encode(&Ping { sequence: 1, payload: "hello".into() }).unwrap();
    frame.truncate(frame.len() - 2);
    let mut reader = std::io::Cursor::new(frame);
    assert!(matches!(read_frame::<_, Ping>(&mut reader), Err(ProtocolError::Io(_))));
}

#[test]
fn oversize_length_prefix_is_fatal() {
    let mut frame = Vec::new();
    frame.extend_from_slice(&((MAXIMUM_MESSAGE_SIZE as u32) + 1).to_be_bytes());
    let mut reader = std::io::Cursor::new(frame);
    assert!(matches!(
        read_frame::<_, Ping>(&mut reader),
        Err(ProtocolError::MessageTooLarge(_))
    ));
}

#[test]
fn malformed_payload_is_rejected() {
    let payload = b"not json";
    let mut frame = Vec::new();
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    let mut reader = std::io::Cursor::new(frame);
    assert!(matches!(read_frame::<_, Ping>(&mut reader), Err(ProtocolError::Malformed(_))));
}
