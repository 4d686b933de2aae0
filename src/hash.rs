//! Hash primitives and the 64-byte node type.
//!
//! The two Keccak variants are consumed as black boxes with the contract
//! "fixed-length digest of an input byte sequence, deterministically". A
//! [`Node`] is one cache or dataset element: 64 bytes viewed as sixteen
//! little-endian 32-bit lanes, which is the granularity every mixing step
//! operates at.

use sha3::{Digest, Keccak256, Keccak512};

use crate::fnv;
use crate::params::{HASH_BYTES, NODE_WORDS};

/// A 256-bit digest (header hashes, seeds, mix digests, final results).
pub type H256 = [u8; 32];

/// Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> H256 {
    Keccak256::digest(data).into()
}

/// Keccak-512 digest of `data`.
pub fn keccak512(data: &[u8]) -> [u8; HASH_BYTES] {
    Keccak512::digest(data).into()
}

/// One 64-byte cache or dataset element, stored as 32-bit lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Node {
    /// The sixteen little-endian lanes of this element.
    pub words: [u32; NODE_WORDS],
}

impl Node {
    #[inline]
    pub(crate) const fn zero() -> Self {
        Self {
            words: [0; NODE_WORDS],
        }
    }

    /// Reinterprets a 64-byte digest as little-endian lanes.
    #[inline]
    pub fn from_bytes(bytes: &[u8; HASH_BYTES]) -> Self {
        let mut words = [0u32; NODE_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes(chunk.try_into().unwrap());
        }
        Self { words }
    }

    /// Serializes the lanes back to the 64-byte digest form.
    #[inline]
    pub fn to_bytes(self) -> [u8; HASH_BYTES] {
        let mut bytes = [0u8; HASH_BYTES];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Folds `other` into `self` lane-wise with the FNV combine.
    #[inline]
    pub(crate) fn fnv_combine(&mut self, other: &Node) {
        for (lane, word) in self.words.iter_mut().zip(other.words) {
            *lane = fnv(*lane, word);
        }
    }
}

impl std::ops::BitXorAssign<&Self> for Node {
    #[inline]
    fn bitxor_assign(&mut self, rhs: &Self) {
        for (lane, word) in self.words.iter_mut().zip(rhs.words) {
            *lane ^= word;
        }
    }
}

/// Keccak-512 of a node's byte form, reinterpreted as a node.
#[inline]
pub(crate) fn keccak512_node(node: &Node) -> Node {
    Node::from_bytes(&keccak512(&node.to_bytes()))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn keccak256_empty_input() {
        assert_eq!(
            keccak256(b""),
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn keccak512_shape() {
        let digest = keccak512(b"hashimoto");
        assert_eq!(digest.len(), HASH_BYTES);
        assert_eq!(digest, keccak512(b"hashimoto"));
        assert_ne!(keccak512(b"a"), keccak512(b"b"));
    }

    #[test]
    fn node_byte_roundtrip_is_little_endian() {
        let mut bytes = [0u8; HASH_BYTES];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let node = Node::from_bytes(&bytes);
        assert_eq!(node.words[0], u32::from_le_bytes([0, 1, 2, 3]));
        assert_eq!(node.to_bytes(), bytes);
    }

    #[test]
    fn xor_matches_scalar_xor() {
        let mut a = Node::zero();
        let mut b = Node::zero();
        for (i, lane) in a.words.iter_mut().enumerate() {
            *lane = (i as u32).wrapping_mul(0xbbaa_9988);
        }
        for (i, lane) in b.words.iter_mut().enumerate() {
            *lane = (i as u32).wrapping_mul(0x5566_7788);
        }

        let mut xored = a;
        xored ^= &b;

        for i in 0..NODE_WORDS {
            assert_eq!(xored.words[i], a.words[i] ^ b.words[i]);
        }
    }

    #[test]
    fn xor_of_identical_nodes_is_zero() {
        let node = Node::from_bytes(&keccak512(b"seed"));
        let mut xored = node;
        xored ^= &node;
        assert_eq!(xored, Node::zero());
    }

    #[test]
    fn fnv_combine_matches_scalar() {
        let mut mix = Node::from_bytes(&keccak512(b"mix"));
        let parent = Node::from_bytes(&keccak512(b"parent"));
        let before = mix;

        mix.fnv_combine(&parent);

        for i in 0..NODE_WORDS {
            assert_eq!(mix.words[i], crate::fnv(before.words[i], parent.words[i]));
        }
    }
}
