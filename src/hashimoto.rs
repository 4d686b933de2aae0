//! The mix loop: header hash + nonce + dataset accesses -> digest.
//!
//! Light and full mode run the exact same loop; they differ only in where
//! [`ItemSource::item`] gets its bytes. That equivalence is the contract
//! the whole system exists to preserve: a verifier with nothing but the
//! cache must reproduce, bit for bit, what a miner computed against the
//! materialized dataset.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::fnv;
use crate::hash::{keccak256, keccak512, Node, H256};
use crate::params::{ACCESSES, MIX_BYTES, MIX_NODES, MIX_WORDS, NODE_WORDS};

/// A supplier of 64-byte dataset items for the mix loop.
///
/// Light mode derives each item on demand from the cache; full mode reads
/// it from the materialized dataset. Sources are read-only and shareable
/// across any number of concurrent compute calls.
pub trait ItemSource: Sync {
    /// Size in bytes of the dataset this source represents.
    fn full_size(&self) -> u64;

    /// The dataset item at `index`.
    fn item(&self, index: usize) -> Node;
}

/// The digest pair produced by one compute call.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowOutput {
    /// Condensed 32-byte form of the final mix state.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub mix_hash: H256,
    /// The value compared against the difficulty target.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub result: H256,
}

impl Display for PowOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "mix hash: {}", hex::encode(self.mix_hash))?;
        write!(f, "result:   {}", hex::encode(self.result))
    }
}

/// Computes the mix digest and result for `(header_hash, nonce)`.
pub fn hashimoto(header_hash: &H256, nonce: u64, source: &impl ItemSource) -> PowOutput {
    let pages = (source.full_size() / MIX_BYTES as u64) as u32;

    // 64-byte seed from the 40-byte header ++ little-endian nonce.
    let mut seed_input = [0u8; 40];
    seed_input[..32].copy_from_slice(header_hash);
    seed_input[32..].copy_from_slice(&nonce.to_le_bytes());
    let seed = keccak512(&seed_input);
    let seed_node = Node::from_bytes(&seed);
    let seed_head = seed_node.words[0];

    // Replicate the seed to fill the 128-byte mix.
    let mut mix = [0u32; MIX_WORDS];
    mix[..NODE_WORDS].copy_from_slice(&seed_node.words);
    mix[NODE_WORDS..].copy_from_slice(&seed_node.words);

    for access in 0..ACCESSES as u32 {
        let page = fnv(access ^ seed_head, mix[access as usize % MIX_WORDS]) % pages;
        for slot in 0..MIX_NODES {
            let item = source.item(page as usize * MIX_NODES + slot);
            for (lane, word) in mix[slot * NODE_WORDS..(slot + 1) * NODE_WORDS]
                .iter_mut()
                .zip(item.words)
            {
                *lane = fnv(*lane, word);
            }
        }
    }

    // Compress 32 lanes to 8, four at a time.
    let mut mix_hash = [0u8; 32];
    for (folded, lanes) in mix_hash.chunks_exact_mut(4).zip(mix.chunks_exact(4)) {
        let word = fnv(fnv(fnv(lanes[0], lanes[1]), lanes[2]), lanes[3]);
        folded.copy_from_slice(&word.to_le_bytes());
    }

    let mut final_input = [0u8; 96];
    final_input[..64].copy_from_slice(&seed);
    final_input[64..].copy_from_slice(&mix_hash);

    PowOutput {
        mix_hash,
        result: keccak256(&final_input),
    }
}
