//! Full handle: the materialized dataset for fast repeated hashing.
//!
//! Construction runs the memo dance against the persistence layer: reuse a
//! validated file by mapping it, otherwise regenerate, write the payload
//! and commit the trailer. The handle borrows the light handle only during
//! construction; afterwards the caller is free to keep using or drop it.

use std::mem::align_of;
use std::ops::ControlFlow;
use std::slice;

use memmap2::Mmap;
use tracing::{info, warn};

use crate::config::Settings;
use crate::dataset;
use crate::error::DagError;
use crate::hash::{Node, H256};
use crate::hashimoto::{hashimoto, ItemSource, PowOutput};
use crate::light::Light;
use crate::params::HASH_BYTES;
use crate::seed::seed_hash;
use crate::store::{self, Disposition};

/// Dataset storage: freshly generated in memory, or mapped from a
/// previously committed file.
enum DagData {
    InMemory(Vec<Node>),
    Mapped(Mmap),
}

impl DagData {
    fn nodes(&self) -> &[Node] {
        match self {
            DagData::InMemory(nodes) => nodes,
            DagData::Mapped(map) => node_slice(map),
        }
    }
}

/// Typed view over the raw payload bytes of a mapped file.
fn node_slice(bytes: &[u8]) -> &[Node] {
    debug_assert_eq!(bytes.len() % HASH_BYTES, 0);
    let ptr = bytes.as_ptr().cast::<Node>();
    assert_eq!(ptr.align_offset(align_of::<Node>()), 0);
    // Safety: Node is repr(C) over [u32; 16], the mapping is page-aligned,
    // read-only and lives as long as self.
    unsafe { slice::from_raw_parts(ptr, bytes.len() / HASH_BYTES) }
}

/// A per-epoch full client handle.
pub struct Full {
    full_size: u64,
    data: DagData,
}

impl Full {
    /// Builds the full handle for `light`'s epoch, reusing an on-disk
    /// dataset when a valid one exists.
    ///
    /// `progress` is invoked synchronously from generation workers with a
    /// percentage in `1..=100`; returning `Break` cancels generation. It is
    /// never invoked when a valid file is reused.
    pub fn new<F>(light: &Light, settings: &Settings, progress: &F) -> Result<Self, DagError>
    where
        F: Fn(u32) -> ControlFlow<()> + Sync,
    {
        let full_size = light.full_size();
        let seed = seed_hash(light.block_number());
        let dir = store::resolve_dir(settings.dag_dir.as_deref())?;
        let path = store::dag_path(&dir, &seed);

        let mut force = settings.force_regen;
        let data = loop {
            match store::prepare(&dir, &seed, full_size, force)? {
                Disposition::Reuse(file) => {
                    info!(path = %path.display(), "reusing on-disk dataset");
                    break DagData::Mapped(store::map_payload(&file, full_size, &path)?);
                }
                Disposition::MustCreate(mut file) => {
                    info!(
                        path = %path.display(),
                        bytes = full_size,
                        jobs = settings.effective_jobs(),
                        "generating dataset"
                    );
                    let nodes =
                        dataset::generate(light.cache(), full_size, settings.effective_jobs(), progress)?;
                    store::write_payload(&mut file, &nodes, &path)?;
                    store::finalize(&mut file, full_size, &path)?;
                    break DagData::InMemory(nodes);
                }
                Disposition::SizeMismatch { expected, found } => {
                    warn!(
                        path = %path.display(),
                        expected,
                        found,
                        "dataset file has the wrong size, regenerating"
                    );
                    force = true;
                }
                Disposition::ContentMismatch => {
                    warn!(
                        path = %path.display(),
                        "dataset file is partial or foreign, regenerating"
                    );
                    force = true;
                }
            }
        };

        Ok(Self { full_size, data })
    }

    /// Computes the digest pair for `(header_hash, nonce)` in full mode.
    pub fn compute(&self, header_hash: &H256, nonce: u64) -> PowOutput {
        hashimoto(header_hash, nonce, self)
    }

    /// The materialized dataset items.
    #[inline]
    pub fn dataset(&self) -> &[Node] {
        self.data.nodes()
    }

    /// Dataset size in bytes.
    #[inline]
    pub fn dataset_size(&self) -> u64 {
        self.full_size
    }
}

impl ItemSource for Full {
    fn full_size(&self) -> u64 {
        self.full_size
    }

    fn item(&self, index: usize) -> Node {
        self.data.nodes()[index]
    }
}
