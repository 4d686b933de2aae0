//! Runtime settings for DAG handling.
//!
//! These knobs never influence hash results; they only control where the
//! dataset file lives and how generation work is scheduled. Everything that
//! affects digests is a protocol constant in [`crate::params`].

use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

/// Settings shared by every operation that touches the full dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Args)]
pub struct Settings {
    /// Directory holding generated DAG files. Defaults to `~/.hashimoto`,
    /// resolved from `$HOME` first and the account database second.
    #[arg(long)]
    pub dag_dir: Option<PathBuf>,

    /// Worker threads for dataset generation and nonce search.
    /// 0 means one per available CPU.
    #[arg(long, default_value_t = 0)]
    pub jobs: usize,

    /// Regenerate the DAG file even when a valid one already exists.
    #[arg(long)]
    pub force_regen: bool,
}

impl Settings {
    /// The worker count to actually schedule, capped at the CPU count.
    pub fn effective_jobs(&self) -> usize {
        match self.jobs {
            0 => *crate::NUM_CPUS,
            jobs => jobs.min(*crate::NUM_CPUS),
        }
    }
}
