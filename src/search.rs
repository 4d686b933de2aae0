//! Multi-threaded nonce search.

use std::sync::OnceLock;

use crate::hash::H256;
use crate::hashimoto::{hashimoto, ItemSource, PowOutput};

/// A nonce whose result digest met the difficulty target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    /// The winning nonce.
    pub nonce: u64,
    /// The digests it produced.
    pub output: PowOutput,
}

/// Searches the nonce space for a result with at least `difficulty_bits`
/// leading zero bits.
///
/// The space is partitioned into contiguous ranges, one worker each; the
/// first worker to find a solution publishes it and the rest exit at their
/// next nonce. `None` only if the entire space is exhausted.
pub fn search(
    source: &impl ItemSource,
    header_hash: &H256,
    difficulty_bits: u32,
    jobs: usize,
) -> Option<Found> {
    let threads = jobs.max(1).min(*crate::NUM_CPUS);
    let found_slot = OnceLock::new();

    if threads <= 1 {
        search_worker(source, header_hash, difficulty_bits, 0, u64::MAX, &found_slot);
        return found_slot.into_inner();
    }

    let chunk = u64::MAX / threads as u64;
    std::thread::scope(|scope| {
        for thread in 0..threads {
            let start = thread as u64 * chunk;
            let end = if thread == threads - 1 {
                u64::MAX
            } else {
                (thread as u64 + 1) * chunk - 1
            };
            let found_slot = &found_slot;

            scope.spawn(move || {
                search_worker(source, header_hash, difficulty_bits, start, end, found_slot)
            });
        }
    });

    found_slot.into_inner()
}

fn search_worker(
    source: &impl ItemSource,
    header_hash: &H256,
    difficulty_bits: u32,
    start: u64,
    end: u64,
    found_slot: &OnceLock<Found>,
) {
    for nonce in start..=end {
        // Another worker may have already published a solution.
        if found_slot.get().is_some() {
            return;
        }

        let output = hashimoto(header_hash, nonce, source);
        if leading_zero_bits(&output.result) < difficulty_bits {
            continue;
        }

        found_slot.set(Found { nonce, output }).ok();
        return;
    }
}

/// Number of leading zero bits in a digest.
pub fn leading_zero_bits(digest: &H256) -> u32 {
    let mut count = 0;
    for byte in digest {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}
