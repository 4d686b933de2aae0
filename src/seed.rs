//! Epoch seed derivation.

use crate::hash::{keccak256, H256};
use crate::params::EPOCH_LENGTH;

/// Derives the 256-bit seed for the epoch containing `block_number`.
///
/// Epoch 0 uses 32 zero bytes; each later epoch hashes the previous seed
/// once more. The chain is short enough (one Keccak-256 per epoch) that
/// recomputing from zero is always acceptable, so no state is kept.
pub fn seed_hash(block_number: u64) -> H256 {
    let epochs = block_number / EPOCH_LENGTH;
    let mut seed = [0u8; 32];
    for _ in 0..epochs {
        seed = keccak256(&seed);
    }
    seed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_zero_seed_is_zero() {
        assert_eq!(seed_hash(0), [0u8; 32]);
        assert_eq!(seed_hash(EPOCH_LENGTH - 1), [0u8; 32]);
    }

    #[test]
    fn blocks_in_one_epoch_share_a_seed() {
        assert_eq!(seed_hash(EPOCH_LENGTH), seed_hash(2 * EPOCH_LENGTH - 1));
        assert_ne!(seed_hash(EPOCH_LENGTH), seed_hash(2 * EPOCH_LENGTH));
    }

    #[test]
    fn seed_is_the_keccak_chain_over_zero() {
        let one = keccak256(&[0u8; 32]);
        assert_eq!(seed_hash(EPOCH_LENGTH), one);
        assert_eq!(seed_hash(2 * EPOCH_LENGTH), keccak256(&one));
    }
}
