#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

use std::sync::LazyLock;

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod full;
pub mod hash;
pub mod hashimoto;
pub mod light;
pub mod params;
pub mod search;
pub mod seed;
pub mod store;

static NUM_CPUS: LazyLock<usize> = LazyLock::new(num_cpus::get);

/// 32-bit FNV-style combine: `(a * FNV_PRIME) ^ b`.
///
/// Used both to pick pseudorandom parent/page indices and to fold fetched
/// lanes into the mix. Not the standard FNV-1 hash; only the multiply-xor
/// step is kept, applied lane-wise over 32-bit words.
#[inline]
pub(crate) fn fnv(a: u32, b: u32) -> u32 {
    a.wrapping_mul(params::FNV_PRIME) ^ b
}
