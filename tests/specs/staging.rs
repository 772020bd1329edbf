// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end staging specs: the rsync engine driven through the
//! compression-wrapped transport over a real socket pair.

use std::io::Cursor;
use std::net::{TcpListener, TcpStream};

use mutagen_compress::Algorithm;
use mutagen_rsync::{Engine, Signature, StageRequest};
use mutagen_sessions::synchronization::{serve_staging, stage_files, StagingCoordinator};
use mutagen_stream::Preemption;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn prng_data(seed: u64, length: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; length];
    rng.fill(&mut data[..]);
    data
}

const SUPPORTED: &[Algorithm] = &[Algorithm::None, Algorithm::Deflate, Algorithm::Zstandard];

/// Run a staging exchange over loopback TCP, returning the per-path
/// outcomes and the staging coordinator for inspection.
fn exchange(
    server_root: &std::path::Path,
    client_root: &std::path::Path,
    staging_root: std::path::PathBuf,
    algorithm: Algorithm,
    request: &StageRequest,
) -> (Vec<Option<String>>, StagingCoordinator) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let server_root = server_root.to_path_buf();
    let server = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let reader = stream.try_clone().unwrap();
        serve_staging(reader, stream, &server_root, SUPPORTED, &Preemption::new())
    });

    let stream = TcpStream::connect(address).unwrap();
    let reader = stream.try_clone().unwrap();
    let mut coordinator = StagingCoordinator::new(staging_root).unwrap();
    let outcomes =
        stage_files(reader, stream, algorithm, client_root, request, &mut coordinator).unwrap();
    server.join().unwrap().unwrap();
    (outcomes, coordinator)
}

#[test]
fn identical_one_mebibyte_file_stages_as_a_single_block_run() {
    // Identical base and target: the delta collapses to one coalesced
    // block operation and the patched output is byte-identical.
    let base = prng_data(473, 1024 * 1024);
    let mut engine = Engine::new();
    let signature = engine
        .signature_with_block_size(&mut Cursor::new(base.clone()), 2400)
        .unwrap();

    let mut operations = Vec::new();
    engine
        .deltafy(&mut Cursor::new(base.clone()), &signature, |operation| {
            operations.push(operation);
            Ok(())
        })
        .unwrap();
    assert_eq!(operations.len(), 1);
    match &operations[0] {
        mutagen_rsync::Operation::Block { start, count } => {
            assert_eq!(*start, 0);
            assert!(*count >= 2);
        }
        other => panic!("expected a block operation, got {other:?}"),
    }

    // The same exchange over the transport stages the identical file.
    let server_root = tempfile::tempdir().unwrap();
    let client_root = tempfile::tempdir().unwrap();
    let staging_root = tempfile::tempdir().unwrap();
    std::fs::write(server_root.path().join("artifact"), &base).unwrap();
    std::fs::write(client_root.path().join("artifact"), &base).unwrap();

    let request =
        StageRequest { paths: vec!["artifact".into()], signatures: vec![signature] };
    let (outcomes, coordinator) = exchange(
        server_root.path(),
        client_root.path(),
        staging_root.path().join("staging"),
        Algorithm::Deflate,
        &request,
    );
    assert_eq!(outcomes, vec![None]);
    assert_eq!(std::fs::read(coordinator.staged_path("artifact")).unwrap(), base);
}

#[test]
fn two_byte_mutation_stages_mostly_block_references() {
    let base = prng_data(473, 64 * 1024);
    let mut target = base.clone();
    target[10_000] = target[10_000].wrapping_add(1);
    target[50_000] = target[50_000].wrapping_add(1);

    let mut engine = Engine::new();
    let signature = engine.signature(&mut Cursor::new(base.clone())).unwrap();

    let mut operations = Vec::new();
    engine
        .deltafy(&mut Cursor::new(target.clone()), &signature, |operation| {
            operations.push(operation);
            Ok(())
        })
        .unwrap();
    let data_operations = operations
        .iter()
        .filter(|operation| matches!(operation, mutagen_rsync::Operation::Data { .. }))
        .count();
    assert!(data_operations <= 2, "operations: {}", operations.len());
    assert!(operations.len() > data_operations);

    // Stage the mutated file against the stale base over the transport.
    let server_root = tempfile::tempdir().unwrap();
    let client_root = tempfile::tempdir().unwrap();
    let staging_root = tempfile::tempdir().unwrap();
    std::fs::write(server_root.path().join("artifact"), &target).unwrap();
    std::fs::write(client_root.path().join("artifact"), &base).unwrap();

    let request =
        StageRequest { paths: vec!["artifact".into()], signatures: vec![signature] };
    let (outcomes, coordinator) = exchange(
        server_root.path(),
        client_root.path(),
        staging_root.path().join("staging"),
        Algorithm::Zstandard,
        &request,
    );
    assert_eq!(outcomes, vec![None]);
    assert_eq!(std::fs::read(coordinator.staged_path("artifact")).unwrap(), target);
}

#[test]
fn empty_signature_stages_whole_files() {
    let payload = prng_data(9, 200_000);

    let server_root = tempfile::tempdir().unwrap();
    let client_root = tempfile::tempdir().unwrap();
    let staging_root = tempfile::tempdir().unwrap();
    std::fs::write(server_root.path().join("fresh"), &payload).unwrap();

    let request =
        StageRequest { paths: vec!["fresh".into()], signatures: vec![Signature::empty()] };
    let (outcomes, coordinator) = exchange(
        server_root.path(),
        client_root.path(),
        staging_root.path().join("staging"),
        Algorithm::None,
        &request,
    );
    assert_eq!(outcomes, vec![None]);
    assert_eq!(std::fs::read(coordinator.staged_path("fresh")).unwrap(), payload);
}
