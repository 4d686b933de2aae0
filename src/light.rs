//! Light handle: everything a verifier needs for one epoch.

use crate::cache::Cache;
use crate::dataset::calc_dataset_item;
use crate::error::DagError;
use crate::hash::{Node, H256};
use crate::hashimoto::{hashimoto, ItemSource, PowOutput};
use crate::params;
use crate::seed::seed_hash;

/// A per-epoch light client handle.
///
/// Owns the cache for the epoch of its block number and computes digests by
/// deriving each visited dataset item on demand. Stays valid and usable
/// after a [`crate::full::Full`] handle has been built from it; dropping it
/// releases the cache.
pub struct Light {
    block_number: u64,
    cache_size: u64,
    full_size: u64,
    cache: Cache,
}

impl Light {
    /// Builds the light handle for the epoch containing `block_number`.
    pub fn new(block_number: u64) -> Result<Self, DagError> {
        Self::with_sizes(
            block_number,
            params::cache_size(block_number),
            params::dataset_size(block_number),
        )
    }

    /// As [`Light::new`] but with explicit sizes, for scaled-down tests.
    pub(crate) fn with_sizes(
        block_number: u64,
        cache_size: u64,
        full_size: u64,
    ) -> Result<Self, DagError> {
        let cache = Cache::generate(&seed_hash(block_number), cache_size)?;
        Ok(Self {
            block_number,
            cache_size,
            full_size,
            cache,
        })
    }

    /// The block number this handle was created for.
    #[inline]
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Cache size in bytes.
    #[inline]
    pub fn cache_size(&self) -> u64 {
        self.cache_size
    }

    /// Size in bytes of this epoch's full dataset.
    #[inline]
    pub fn full_size(&self) -> u64 {
        self.full_size
    }

    /// The generated cache.
    #[inline]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Computes the digest pair for `(header_hash, nonce)` in light mode.
    pub fn compute(&self, header_hash: &H256, nonce: u64) -> PowOutput {
        hashimoto(header_hash, nonce, self)
    }
}

impl ItemSource for Light {
    fn full_size(&self) -> u64 {
        self.full_size
    }

    fn item(&self, index: usize) -> Node {
        calc_dataset_item(self.cache.nodes(), index)
    }
}
