//! Dataset item derivation and full dataset (DAG) generation.
//!
//! [`calc_dataset_item`] is the throughput-critical hot path: full-mode
//! generation calls it for every item, light-mode verification calls it for
//! every page access. Its output must be byte-identical across
//! implementations given the same cache and index; everything above it only
//! moves those bytes around.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::cache::Cache;
use crate::error::DagError;
use crate::fnv;
use crate::hash::{keccak512_node, Node};
use crate::params::{DATASET_PARENTS, HASH_BYTES, MIX_BYTES, NODE_WORDS};

/// Derives the 64-byte dataset item at `index` from the cache.
///
/// Pure and read-only on the cache, so it is safe to call concurrently for
/// different indices.
pub fn calc_dataset_item(cache: &[Node], index: usize) -> Node {
    let count = cache.len();

    let mut mix = cache[index % count];
    mix.words[0] ^= index as u32;
    mix = keccak512_node(&mix);

    for j in 0..DATASET_PARENTS {
        let parent = fnv(index as u32 ^ j, mix.words[j as usize % NODE_WORDS]) as usize % count;
        mix.fnv_combine(&cache[parent]);
    }

    keccak512_node(&mix)
}

/// Generates the full dataset of `full_size` bytes from `cache`.
///
/// Items are independent, so the index range is partitioned into disjoint
/// contiguous slices, one worker per slice; each slot is written exactly
/// once. Progress is delivered as a percentage in `1..=100`, each value at
/// most once, from whichever worker crosses the boundary; 100 means the
/// last item is done, not that the caller has finished persisting anything.
/// A `Break` return from the callback stops all workers at the next item
/// boundary and the whole generation reports [`DagError::Cancelled`] with
/// no partial dataset escaping.
pub fn generate<F>(cache: &Cache, full_size: u64, jobs: usize, progress: &F) -> Result<Vec<Node>, DagError>
where
    F: Fn(u32) -> ControlFlow<()> + Sync,
{
    assert!(full_size > 0, "dataset size must be positive");
    assert_eq!(
        full_size % MIX_BYTES as u64,
        0,
        "dataset size must be a multiple of the mix width"
    );
    let count = (full_size / HASH_BYTES as u64) as usize;

    let mut nodes: Vec<Node> = Vec::new();
    nodes
        .try_reserve_exact(count)
        .map_err(|_| DagError::OutOfMemory {
            what: "dataset",
            bytes: full_size,
        })?;
    nodes.resize(count, Node::zero());

    let threads = jobs.max(1).min(*crate::NUM_CPUS);
    let per_thread = count.div_ceil(threads);

    let cache_nodes = cache.nodes();
    let done = AtomicU64::new(0);
    let last_percent = AtomicU32::new(0);
    let cancelled = AtomicBool::new(false);

    std::thread::scope(|scope| {
        for (slice_index, slice) in nodes.chunks_mut(per_thread).enumerate() {
            let base = slice_index * per_thread;
            let (done, last_percent, cancelled) = (&done, &last_percent, &cancelled);

            scope.spawn(move || {
                for (offset, slot) in slice.iter_mut().enumerate() {
                    if cancelled.load(Ordering::Relaxed) {
                        return;
                    }
                    *slot = calc_dataset_item(cache_nodes, base + offset);

                    let computed = done.fetch_add(1, Ordering::Relaxed) + 1;
                    let percent = (computed * 100 / count as u64) as u32;
                    // fetch_max hands each percentage value to exactly one
                    // worker, and the worker finishing the final item always
                    // gets to report 100.
                    if last_percent.fetch_max(percent, Ordering::Relaxed) < percent
                        && progress(percent).is_break()
                    {
                        cancelled.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            });
        }
    });

    if cancelled.load(Ordering::Relaxed) {
        return Err(DagError::Cancelled);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::seed::seed_hash;

    const TEST_CACHE_SIZE: u64 = 1024;
    const TEST_FULL_SIZE: u64 = 1024 * 32;

    fn test_cache() -> Cache {
        Cache::generate(&seed_hash(0), TEST_CACHE_SIZE).unwrap()
    }

    #[test]
    fn item_derivation_is_deterministic() {
        let cache = test_cache();
        assert_eq!(
            calc_dataset_item(cache.nodes(), 17),
            calc_dataset_item(cache.nodes(), 17)
        );
        assert_ne!(
            calc_dataset_item(cache.nodes(), 17),
            calc_dataset_item(cache.nodes(), 18)
        );
    }

    #[test]
    fn parallel_generation_matches_per_item_derivation() {
        let cache = test_cache();
        let keep_going = |_percent: u32| ControlFlow::Continue(());
        let dataset = generate(&cache, TEST_FULL_SIZE, 4, &keep_going).unwrap();

        assert_eq!(dataset.len(), (TEST_FULL_SIZE / HASH_BYTES as u64) as usize);
        for (index, item) in dataset.iter().enumerate() {
            assert_eq!(*item, calc_dataset_item(cache.nodes(), index));
        }
    }

    #[test]
    fn worker_count_does_not_change_the_dataset() {
        let cache = test_cache();
        let keep_going = |_percent: u32| ControlFlow::Continue(());
        let sequential = generate(&cache, TEST_FULL_SIZE, 1, &keep_going).unwrap();
        let parallel = generate(&cache, TEST_FULL_SIZE, 8, &keep_going).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn progress_reaches_one_hundred() {
        let cache = test_cache();
        let seen = Mutex::new(Vec::new());
        let record = |percent: u32| {
            seen.lock().unwrap().push(percent);
            ControlFlow::Continue(())
        };

        generate(&cache, TEST_FULL_SIZE, 1, &record).unwrap();

        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&p| p >= 1 && p <= 100));
        assert_eq!(*seen.last().unwrap(), 100);
        // a single worker reports strictly increasing percentages
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn stop_signal_cancels_generation() {
        let cache = test_cache();
        let stop = |_percent: u32| ControlFlow::Break(());
        let result = generate(&cache, TEST_FULL_SIZE, 4, &stop);
        assert!(matches!(result, Err(DagError::Cancelled)));
    }
}
