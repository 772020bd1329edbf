// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Cursor;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use yare::parameterized;

fn prng_data(seed: u64, length: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; length];
    rng.fill(&mut data[..]);
    data
}

fn signature_of(base: &[u8], block_size: Option<u64>) -> Signature {
    let mut engine = Engine::new();
    match block_size {
        Some(block_size) => engine
            .signature_with_block_size(&mut Cursor::new(base.to_vec()), block_size)
            .unwrap(),
        None => engine.signature(&mut Cursor::new(base.to_vec())).unwrap(),
    }
}

fn delta_of(target: &[u8], signature: &Signature) -> Vec<Operation> {
    let mut engine = Engine::new();
    let mut operations = Vec::new();
    engine
        .deltafy(&mut Cursor::new(target.to_vec()), signature, |operation| {
            operations.push(operation);
            Ok(())
        })
        .unwrap();
    operations
}

fn patch_of(base: &[u8], signature: &Signature, operations: &[Operation]) -> Vec<u8> {
    try_patch(base, signature, operations).unwrap()
}

fn try_patch(
    base: &[u8],
    signature: &Signature,
    operations: &[Operation],
) -> Result<Vec<u8>, EngineError> {
    let mut engine = Engine::new();
    let mut destination = Vec::new();
    let mut base = Cursor::new(base.to_vec());
    let mut pending = operations.iter().cloned();
    engine.patch(&mut destination, &mut base, signature, || Ok(pending.next()))?;
    Ok(destination)
}

/// Check the structural delta invariants: bounded data operations, no
/// zero-count blocks, and full coalescing of adjacent block operations.
fn assert_delta_invariants(operations: &[Operation]) {
    let mut previous_block: Option<(u64, u64)> = None;
    for operation in operations {
        operation.ensure_valid().unwrap();
        match operation {
            Operation::Data { data } => {
                assert!(data.len() <= MAXIMUM_DATA_OPERATION_SIZE);
                previous_block = None;
            }
            Operation::Block { start, count } => {
                if let Some((previous_start, previous_count)) = previous_block {
                    assert_ne!(
                        previous_start + previous_count,
                        *start,
                        "adjacent block operations were not coalesced"
                    );
                }
                previous_block = Some((*start, *count));
            }
        }
    }
}

// --- block size selection ---

#[parameterized(
    empty = { 0, 1024 },
    tiny = { 100, 1024 },
    at_lower_clamp = { 43_690, 1024 },
    mid = { 240_000, 2400 },
    one_mebibyte = { 1_048_576, 5017 },
    huge = { 1 << 40, 65_536 },
)]
fn optimal_block_size_clamps(length: u64, expected: u64) {
    assert_eq!(optimal_block_size(length), expected);
}

// --- signature ---

#[test]
fn signature_of_empty_base_is_empty() {
    let signature = signature_of(&[], None);
    assert!(signature.is_empty());
    assert!(signature.ensure_valid().is_ok());
}

#[test]
fn signature_block_accounting() {
    let base = prng_data(1, 10 * 1024 + 100);
    let signature = signature_of(&base, Some(1024));
    assert_eq!(signature.block_size, 1024);
    assert_eq!(signature.hashes.len(), 11);
    assert_eq!(signature.last_block_size, 100);
    assert!(signature.ensure_valid().is_ok());
}

#[test]
fn signature_with_aligned_length_has_full_last_block() {
    let base = prng_data(2, 8 * 1024);
    let signature = signature_of(&base, Some(1024));
    assert_eq!(signature.hashes.len(), 8);
    assert_eq!(signature.last_block_size, 1024);
}

#[test]
fn signature_rejects_bad_block_sizes() {
    let mut engine = Engine::new();
    assert!(matches!(
        engine.signature_with_block_size(&mut Cursor::new(vec![1u8]), 0),
        Err(EngineError::InvalidBlockSize)
    ));
    assert!(matches!(
        engine.signature_with_block_size(&mut Cursor::new(vec![1u8]), MAXIMUM_BLOCK_SIZE + 1),
        Err(EngineError::InvalidBlockSize)
    ));
}

// --- deltafy boundary behaviors ---

#[test]
fn empty_base_and_target_produce_no_operations() {
    let signature = Signature::empty();
    let operations = delta_of(&[], &signature);
    assert!(operations.is_empty());
    assert_eq!(patch_of(&[], &signature, &operations), Vec::<u8>::new());
}

#[test]
fn empty_base_streams_bounded_data_operations() {
    let target = prng_data(3, 5 * MAXIMUM_DATA_OPERATION_SIZE + 1);
    let operations = delta_of(&target, &Signature::empty());

    assert_eq!(operations.len(), 6);
    assert!(operations.iter().all(|op| matches!(op, Operation::Data { .. })));
    assert_delta_invariants(&operations);
    assert_eq!(patch_of(&[], &Signature::empty(), &operations), target);
}

#[test]
fn identical_files_coalesce_to_one_block_operation() {
    let base = prng_data(4, 4096);
    let signature = signature_of(&base, Some(1024));
    let operations = delta_of(&base, &signature);
    assert_eq!(operations, vec![Operation::Block { start: 0, count: 4 }]);
}

#[test]
fn truncation_on_block_boundary_is_a_single_block_operation() {
    let base = prng_data(5, 4096);
    let signature = signature_of(&base, Some(1024));
    let target = &base[..2048];

    let operations = delta_of(target, &signature);
    assert_eq!(operations, vec![Operation::Block { start: 0, count: 2 }]);
    assert_eq!(patch_of(&base, &signature, &operations), target);
}

#[test]
fn single_flipped_byte_needs_one_data_operation() {
    let base = prng_data(6, 8192);
    let mut target = base.clone();
    target[4000] ^= 0xff;

    let signature = signature_of(&base, Some(1024));
    let operations = delta_of(&target, &signature);
    assert_delta_invariants(&operations);

    let data_operations =
        operations.iter().filter(|op| matches!(op, Operation::Data { .. })).count();
    let block_operations = operations.len() - data_operations;
    assert!(data_operations <= 1, "operations: {operations:?}");
    assert!(block_operations >= 1);
    assert_eq!(patch_of(&base, &signature, &operations), target);
}

#[test]
fn short_last_block_matches_at_end_of_stream() {
    // Base length deliberately misaligned so the final block is short.
    let base = prng_data(7, 3 * 1024 + 300);
    let signature = signature_of(&base, Some(1024));
    let operations = delta_of(&base, &signature);
    assert_eq!(operations, vec![Operation::Block { start: 0, count: 4 }]);
}

// --- literal scenarios ---

#[test]
fn identical_one_mebibyte_files() {
    let base = prng_data(473, 1024 * 1024);
    let signature = signature_of(&base, Some(2400));
    let operations = delta_of(&base, &signature);

    assert_eq!(operations.len(), 1);
    match &operations[0] {
        Operation::Block { start, count } => {
            assert_eq!(*start, 0);
            assert!(*count >= 2);
        }
        other => panic!("expected a block operation, got {other:?}"),
    }
    assert_eq!(patch_of(&base, &signature, &operations), base);
}

#[test]
fn two_incremented_bytes() {
    let base = prng_data(473, MAXIMUM_DATA_OPERATION_SIZE);
    let mut target = base.clone();
    target[10_000] = target[10_000].wrapping_add(1);
    target[50_000] = target[50_000].wrapping_add(1);

    let signature = signature_of(&base, None);
    let operations = delta_of(&target, &signature);
    assert_delta_invariants(&operations);

    let data_operations =
        operations.iter().filter(|op| matches!(op, Operation::Data { .. })).count();
    assert!(data_operations <= 2, "operations: {operations:?}");
    assert!(operations.len() > data_operations);
    assert_eq!(patch_of(&base, &signature, &operations), target);
}

// --- patch failure taxonomy ---

#[test]
fn patch_rejects_out_of_range_block_references() {
    let base = prng_data(8, 2048);
    let signature = signature_of(&base, Some(1024));
    let result = try_patch(&base, &signature, &[Operation::Block { start: 1, count: 5 }]);
    assert!(matches!(result, Err(EngineError::BlockOutOfRange { .. })));
}

#[test]
fn patch_detects_truncated_base() {
    let base = prng_data(9, 4096);
    let signature = signature_of(&base, Some(1024));
    // The base lost its tail after the signature was taken.
    let result = try_patch(&base[..2048], &signature, &[Operation::Block { start: 0, count: 4 }]);
    assert!(matches!(result, Err(EngineError::BaseTruncated { .. })));
}

#[test]
fn patch_reports_short_writes() {
    struct Limited(usize);

    impl std::io::Write for Limited {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let accepted = buf.len().min(self.0);
            self.0 -= accepted;
            Ok(accepted)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let base = prng_data(10, 2048);
    let signature = signature_of(&base, Some(1024));
    let mut engine = Engine::new();
    let mut destination = Limited(100);
    let mut pending = [Operation::Block { start: 0, count: 2 }].into_iter();
    let result = engine.patch(
        &mut destination,
        &mut Cursor::new(base.clone()),
        &signature,
        || Ok(pending.next()),
    );
    assert!(matches!(result, Err(EngineError::ShortWrite)));
}

#[test]
fn patch_rejects_invalid_operations() {
    let base = prng_data(11, 2048);
    let signature = signature_of(&base, Some(1024));
    let result = try_patch(&base, &signature, &[Operation::Block { start: 0, count: 0 }]);
    assert!(matches!(result, Err(EngineError::InvalidOperation(_))));
}

// --- coalescer ---

#[test]
fn coalescer_merges_adjacent_runs() {
    let mut output = Vec::new();
    let mut coalescer = OperationCoalescer::new(|operation| {
        output.push(operation);
        Ok(())
    });
    coalescer.transmit(Operation::Block { start: 0, count: 1 }).unwrap();
    coalescer.transmit(Operation::Block { start: 1, count: 2 }).unwrap();
    coalescer.transmit(Operation::Block { start: 3, count: 1 }).unwrap();
    coalescer.finalize().unwrap();

    assert_eq!(output, vec![Operation::Block { start: 0, count: 4 }]);
}

#[test]
fn coalescer_flushes_on_data_and_gaps() {
    let mut output = Vec::new();
    let mut coalescer = OperationCoalescer::new(|operation| {
        output.push(operation);
        Ok(())
    });
    coalescer.transmit(Operation::Block { start: 0, count: 1 }).unwrap();
    coalescer.transmit(Operation::Data { data: vec![9] }).unwrap();
    coalescer.transmit(Operation::Block { start: 5, count: 1 }).unwrap();
    coalescer.transmit(Operation::Block { start: 8, count: 1 }).unwrap();
    coalescer.finalize().unwrap();

    assert_eq!(
        output,
        vec![
            Operation::Block { start: 0, count: 1 },
            Operation::Data { data: vec![9] },
            Operation::Block { start: 5, count: 1 },
            Operation::Block { start: 8, count: 1 },
        ]
    );
}

// --- the round-trip law ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn patch_of_deltafy_reconstructs_target(
        base in proptest::collection::vec(any::<u8>(), 0..16_384),
        target_seed in any::<u64>(),
        target_length in 0usize..16_384,
        block_size in 1u64..4096,
    ) {
        let target = prng_data(target_seed, target_length);
        let mut engine = Engine::new();
        let signature = engine
            .signature_with_block_size(&mut Cursor::new(base.clone()), block_size)
            .unwrap();

        let operations = delta_of(&target, &signature);
        assert_delta_invariants(&operations);
        prop_assert_eq!(patch_of(&base, &signature, &operations), target);
    }

    #[test]
    fn related_files_round_trip(
        seed in any::<u64>(),
        length in 1usize..32_768,
        flip in any::<u16>(),
    ) {
        let base = prng_data(seed, length);
        let mut target = base.clone();
        let index = (flip as usize) % length;
        target[index] = target[index].wrapping_add(1);

        let mut engine = Engine::new();
        let signature = engine.signature(&mut Cursor::new(base.clone())).unwrap();
        let operations = delta_of(&target, &signature);
        assert_delta_invariants(&operations);
        prop_assert_eq!(patch_of(&base, &signature, &operations), target);
    }
}
