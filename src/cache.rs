//! Light verification cache.
//!
//! The cache is the small dataset every other artifact derives from: a hash
//! chain seeded by the epoch seed, tightened by a fixed number of
//! randomized-linking passes. Each pass rewrites every node from the node
//! just before it (already rewritten within the same pass) and one
//! pseudorandomly chosen partner, so the construction is latency-bound by
//! design and must never be parallelized: splitting a pass would read stale
//! predecessor values and diverge from the required node sequence.

use crate::error::DagError;
use crate::hash::{keccak512, keccak512_node, Node, H256};
use crate::params::{CACHE_ROUNDS, HASH_BYTES};

/// The generated cache for one epoch. Immutable once built.
pub struct Cache {
    nodes: Vec<Node>,
}

impl Cache {
    /// Builds the cache for `seed`, filling `cache_size / 64` nodes.
    ///
    /// `cache_size` must be a positive multiple of the 64-byte node size.
    /// On allocation failure nothing partial is returned.
    pub fn generate(seed: &H256, cache_size: u64) -> Result<Self, DagError> {
        assert!(cache_size > 0, "cache size must be positive");
        assert_eq!(
            cache_size % HASH_BYTES as u64,
            0,
            "cache size must be a multiple of the node size"
        );
        let count = (cache_size / HASH_BYTES as u64) as usize;

        let mut nodes: Vec<Node> = Vec::new();
        nodes
            .try_reserve_exact(count)
            .map_err(|_| DagError::OutOfMemory {
                what: "cache",
                bytes: cache_size,
            })?;

        // Sequential hash chain.
        nodes.push(Node::from_bytes(&keccak512(seed)));
        for i in 1..count {
            let next = keccak512_node(&nodes[i - 1]);
            nodes.push(next);
        }

        // Randomized-linking passes. Within a pass, index i reads index
        // i-1 *after* its rewrite; passes are strictly sequential.
        for _ in 0..CACHE_ROUNDS {
            for i in 0..count {
                let partner = nodes[i].words[0] as usize % count;
                let prev = (i + count - 1) % count;

                let mut mixed = nodes[prev];
                mixed ^= &nodes[partner];
                nodes[i] = keccak512_node(&mixed);
            }
        }

        Ok(Self { nodes })
    }

    /// The cache nodes.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of 64-byte nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_hash;

    #[test]
    fn node_count_matches_requested_size() {
        let cache = Cache::generate(&seed_hash(0), 1024).unwrap();
        assert_eq!(cache.node_count(), 16);
    }

    #[test]
    fn generation_is_deterministic() {
        let seed = seed_hash(crate::params::EPOCH_LENGTH);
        let a = Cache::generate(&seed, 2048).unwrap();
        let b = Cache::generate(&seed, 2048).unwrap();
        assert_eq!(a.nodes(), b.nodes());
    }

    #[test]
    fn different_seeds_diverge() {
        let a = Cache::generate(&seed_hash(0), 1024).unwrap();
        let b = Cache::generate(&seed_hash(crate::params::EPOCH_LENGTH), 1024).unwrap();
        assert_ne!(a.nodes(), b.nodes());
    }

    #[test]
    fn linking_rounds_change_the_chain() {
        // The first node of the raw chain is keccak512(seed); after three
        // linking passes it must have been rewritten.
        let seed = seed_hash(0);
        let cache = Cache::generate(&seed, 1024).unwrap();
        let chain_head = Node::from_bytes(&keccak512(&seed));
        assert_ne!(cache.nodes()[0], chain_head);
    }

    #[test]
    #[should_panic(expected = "multiple of the node size")]
    fn rejects_unaligned_size() {
        let _ = Cache::generate(&seed_hash(0), 1000);
    }
}
