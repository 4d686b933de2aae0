//! Failure taxonomy.
//!
//! Construction-type operations (cache build, dataset generation, file
//! preparation) surface failures through these enums so callers can pick a
//! reuse-vs-regenerate policy. Compute-type operations are total functions
//! and have no error channel; everything that can fail has already failed
//! by the time a handle exists.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A filesystem fault while preparing, validating or writing a DAG file.
///
/// Size and magic mismatches are *not* errors; they are reported as
/// [`crate::store::Disposition`] values. Every variant here carries the
/// path (and where useful the underlying `io::Error`) so a corrupted or
/// foreign file can be diagnosed from the message alone.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No explicit directory was given and no home directory could be
    /// resolved from the environment or the account database.
    #[error("could not resolve a home directory for the DAG store")]
    NoHomeDir,

    /// The DAG directory could not be created.
    #[error("could not create DAG directory {path}: {source}")]
    CreateDir {
        /// Directory that failed to create.
        path: PathBuf,
        /// Originating I/O error.
        source: io::Error,
    },

    /// The DAG file could not be opened or created.
    #[error("could not open DAG file {path}: {source}")]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// Originating I/O error.
        source: io::Error,
    },

    /// The DAG file size could not be queried.
    #[error("could not query size of DAG file {path}: {source}")]
    Stat {
        /// File that failed to stat.
        path: PathBuf,
        /// Originating I/O error.
        source: io::Error,
    },

    /// A seek inside the DAG file failed (usually insufficient space when
    /// sizing a fresh file).
    #[error("could not seek in DAG file {path}: {source}")]
    Seek {
        /// File that failed to seek.
        path: PathBuf,
        /// Originating I/O error.
        source: io::Error,
    },

    /// The DAG file could not be read.
    #[error("could not read DAG file {path}: {source}")]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Originating I/O error.
        source: io::Error,
    },

    /// The DAG file could not be written.
    #[error("could not write DAG file {path}: {source}")]
    Write {
        /// File that failed to write.
        path: PathBuf,
        /// Originating I/O error.
        source: io::Error,
    },

    /// The DAG file payload could not be memory-mapped.
    #[error("could not map DAG file {path}: {source}")]
    Map {
        /// File that failed to map.
        path: PathBuf,
        /// Originating I/O error.
        source: io::Error,
    },
}

/// A failed cache or dataset construction.
#[derive(Debug, Error)]
pub enum DagError {
    /// The node array could not be allocated. Nothing partial is retained.
    #[error("could not allocate {bytes} bytes for the {what}")]
    OutOfMemory {
        /// What was being allocated ("cache" or "dataset").
        what: &'static str,
        /// Requested allocation size.
        bytes: u64,
    },

    /// The progress callback asked generation to stop. Not a fault: the
    /// dataset simply was not completed, and no partial dataset escapes.
    #[error("generation stopped by the progress callback")]
    Cancelled,

    /// A persistence fault while reusing or creating the backing file.
    #[error(transparent)]
    Store(#[from] StoreError),
}
