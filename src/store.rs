//! On-disk DAG persistence.
//!
//! A dataset file is `[payload: dataset_size bytes][magic trailer: 8 bytes]`.
//! The trailer is written only after the payload is complete, so it doubles
//! as the commit record: any file with the right length and trailer is a
//! fully generated dataset that can be used directly, and anything else is
//! regenerated. Nodes and the trailer are stored in host byte order; the
//! file is a local cache artifact, not an interchange format.
//!
//! One writer per epoch per directory is assumed; nothing here locks the
//! file against a concurrent generator.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::error::StoreError;
use crate::hash::{Node, H256};
use crate::params::REVISION;

/// Trailer constant marking a completely generated dataset file.
pub const DAG_MAGIC: u64 = 0xFEE1_DEAD_BADD_CAFE;

/// Size of the magic trailer in bytes.
pub const MAGIC_SIZE: u64 = 8;

/// Dot-directory under the user's home used when no directory is given.
const DIR_NAME: &str = ".hashimoto";

/// Outcome of preparing a dataset file.
///
/// Only filesystem faults are errors; every recognizable state of an
/// existing file is a disposition so the caller can pick a
/// reuse-vs-regenerate policy.
#[derive(Debug)]
pub enum Disposition {
    /// A valid file exists. The handle is rewound to the payload start.
    Reuse(File),
    /// A fresh file of the right length was created; the caller must
    /// generate the payload, write it, and finalize the trailer.
    MustCreate(File),
    /// An existing file has the wrong length for this epoch.
    SizeMismatch {
        /// Expected file length (payload plus trailer).
        expected: u64,
        /// Length actually found.
        found: u64,
    },
    /// An existing file has the right length but no valid trailer: a
    /// partial or foreign prior generation.
    ContentMismatch,
}

/// The default DAG directory: `~/.hashimoto`.
///
/// Home is resolved from the environment first, then from the account
/// database entry for the current user.
pub fn default_dir() -> Result<PathBuf, StoreError> {
    let base = directories::BaseDirs::new().ok_or(StoreError::NoHomeDir)?;
    Ok(base.home_dir().join(DIR_NAME))
}

/// `dir` if given, the default directory otherwise.
pub fn resolve_dir(dir: Option<&Path>) -> Result<PathBuf, StoreError> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => default_dir(),
    }
}

/// Canonical file name for an epoch: revision plus the seed's leading hex.
pub fn dag_file_name(seed: &H256) -> String {
    let name = format!("full-R{REVISION}-{}", hex::encode(&seed[..8]));
    debug_assert!(name.len() <= 255, "file name exceeds path component limit");
    name
}

/// Canonical path of the dataset file for `seed` under `dir`.
pub fn dag_path(dir: &Path, seed: &H256) -> PathBuf {
    dir.join(dag_file_name(seed))
}

/// Prepares the dataset file for `seed`, validating any existing file.
///
/// Ensures `dir` exists, then either validates the existing file (length,
/// then trailer) or sizes a fresh one with a single byte written at the
/// far end, leaving the payload sparse for the generator to fill.
pub fn prepare(
    dir: &Path,
    seed: &H256,
    full_size: u64,
    force_create: bool,
) -> Result<Disposition, StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dag_path(dir, seed);

    if !force_create {
        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(mut file) => {
                let validated = validate(&mut file, &path, full_size)?;
                return Ok(validated.attach(file));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::Open { path, source }),
        }
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;

    file.seek(SeekFrom::Start(full_size + MAGIC_SIZE - 1))
        .map_err(|source| seek_err(&path, source))?;
    file.write_all(b"\n")
        .map_err(|source| write_err(&path, source))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|source| seek_err(&path, source))?;

    debug!(path = %path.display(), bytes = full_size + MAGIC_SIZE, "sized fresh dag file");
    Ok(Disposition::MustCreate(file))
}

/// Validation outcome before the file handle is attached.
enum Validated {
    Reuse,
    SizeMismatch { expected: u64, found: u64 },
    ContentMismatch,
}

impl Validated {
    fn attach(self, file: File) -> Disposition {
        match self {
            Validated::Reuse => Disposition::Reuse(file),
            Validated::SizeMismatch { expected, found } => {
                Disposition::SizeMismatch { expected, found }
            }
            Validated::ContentMismatch => Disposition::ContentMismatch,
        }
    }
}

fn validate(file: &mut File, path: &Path, full_size: u64) -> Result<Validated, StoreError> {
    let found = file
        .metadata()
        .map_err(|source| StoreError::Stat {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    let expected = full_size + MAGIC_SIZE;
    if found != expected {
        debug!(path = %path.display(), expected, found, "dag file length mismatch");
        return Ok(Validated::SizeMismatch { expected, found });
    }

    file.seek(SeekFrom::Start(full_size))
        .map_err(|source| seek_err(path, source))?;
    let magic = file
        .read_u64::<NativeEndian>()
        .map_err(|source| read_err(path, source))?;
    if magic != DAG_MAGIC {
        debug!(path = %path.display(), "dag file trailer mismatch");
        return Ok(Validated::ContentMismatch);
    }

    file.seek(SeekFrom::Start(0))
        .map_err(|source| seek_err(path, source))?;
    Ok(Validated::Reuse)
}

/// Writes the generated dataset payload from the start of `file`.
pub fn write_payload(file: &mut File, nodes: &[Node], path: &Path) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(&mut *file);
    for node in nodes {
        writer
            .write_all(&node.to_bytes())
            .map_err(|source| write_err(path, source))?;
    }
    writer.flush().map_err(|source| write_err(path, source))
}

/// Writes the magic trailer after a complete payload and syncs the file.
///
/// This is the commit point: until it succeeds, the file validates as
/// [`Disposition::ContentMismatch`] and will be regenerated.
pub fn finalize(file: &mut File, full_size: u64, path: &Path) -> Result<(), StoreError> {
    file.seek(SeekFrom::Start(full_size))
        .map_err(|source| seek_err(path, source))?;
    file.write_u64::<NativeEndian>(DAG_MAGIC)
        .map_err(|source| write_err(path, source))?;
    file.sync_all().map_err(|source| write_err(path, source))?;
    debug!(path = %path.display(), "finalized dag file");
    Ok(())
}

/// Maps the payload (trailer excluded) of a validated file read-only.
pub fn map_payload(file: &File, full_size: u64, path: &Path) -> Result<Mmap, StoreError> {
    // Safety: the mapping is read-only and the file is treated as
    // single-writer per epoch; see the module docs.
    unsafe { MmapOptions::new().len(full_size as usize).map(file) }.map_err(|source| {
        StoreError::Map {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn seek_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::Seek {
        path: path.to_path_buf(),
        source,
    }
}

fn read_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn write_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::Write {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::tempdir;

    use super::*;
    use crate::hash::keccak256;

    const FULL_SIZE: u64 = 4096;

    fn test_seed() -> H256 {
        keccak256(b"store tests")
    }

    fn write_complete_file(dir: &Path, seed: &H256) {
        let Disposition::MustCreate(mut file) = prepare(dir, seed, FULL_SIZE, false).unwrap()
        else {
            panic!("expected MustCreate for a fresh directory");
        };
        let nodes = vec![Node::zero(); (FULL_SIZE / 64) as usize];
        let path = dag_path(dir, seed);
        write_payload(&mut file, &nodes, &path).unwrap();
        finalize(&mut file, FULL_SIZE, &path).unwrap();
    }

    #[test]
    fn file_name_is_bounded_and_deterministic() {
        let seed = test_seed();
        let name = dag_file_name(&seed);
        assert_eq!(name, dag_file_name(&seed));
        assert!(name.starts_with("full-R23-"));
        assert_eq!(name.len(), "full-R23-".len() + 16);
    }

    #[test]
    fn fresh_file_has_the_right_length() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        let Disposition::MustCreate(_file) = prepare(dir.path(), &seed, FULL_SIZE, false).unwrap()
        else {
            panic!("expected MustCreate");
        };
        let len = fs::metadata(dag_path(dir.path(), &seed)).unwrap().len();
        assert_eq!(len, FULL_SIZE + MAGIC_SIZE);
    }

    #[test]
    fn round_trip_reports_reuse() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        write_complete_file(dir.path(), &seed);

        match prepare(dir.path(), &seed, FULL_SIZE, false).unwrap() {
            Disposition::Reuse(mut file) => {
                // handle is positioned at the payload start
                let mut first = [0u8; 64];
                file.read_exact(&mut first).unwrap();
                assert_eq!(first, Node::zero().to_bytes());
            }
            other => panic!("expected Reuse, got {other:?}"),
        }
    }

    #[test]
    fn truncation_reports_size_mismatch() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        write_complete_file(dir.path(), &seed);

        let path = dag_path(dir.path(), &seed);
        let len = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 1).unwrap();
        drop(file);

        match prepare(dir.path(), &seed, FULL_SIZE, false).unwrap() {
            Disposition::SizeMismatch { expected, found } => {
                assert_eq!(expected, FULL_SIZE + MAGIC_SIZE);
                assert_eq!(found, len - 1);
            }
            other => panic!("expected SizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_trailer_reports_content_mismatch() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        write_complete_file(dir.path(), &seed);

        let path = dag_path(dir.path(), &seed);
        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(FULL_SIZE)).unwrap();
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte).unwrap();
        file.seek(SeekFrom::Start(FULL_SIZE)).unwrap();
        file.write_all(&[byte[0] ^ 0xff]).unwrap();
        drop(file);

        assert!(matches!(
            prepare(dir.path(), &seed, FULL_SIZE, false).unwrap(),
            Disposition::ContentMismatch
        ));
    }

    #[test]
    fn unfinalized_file_reports_content_mismatch() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        // sized but never finalized: simulates a crash mid-generation
        let Disposition::MustCreate(_file) = prepare(dir.path(), &seed, FULL_SIZE, false).unwrap()
        else {
            panic!("expected MustCreate");
        };

        assert!(matches!(
            prepare(dir.path(), &seed, FULL_SIZE, false).unwrap(),
            Disposition::ContentMismatch
        ));
    }

    #[test]
    fn force_create_discards_a_valid_file() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        write_complete_file(dir.path(), &seed);

        assert!(matches!(
            prepare(dir.path(), &seed, FULL_SIZE, true).unwrap(),
            Disposition::MustCreate(_)
        ));
    }

    #[test]
    fn epoch_size_change_reports_size_mismatch() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        write_complete_file(dir.path(), &seed);

        assert!(matches!(
            prepare(dir.path(), &seed, FULL_SIZE * 2, false).unwrap(),
            Disposition::SizeMismatch { .. }
        ));
    }

    #[test]
    fn mapped_payload_excludes_the_trailer() {
        let dir = tempdir().unwrap();
        let seed = test_seed();
        write_complete_file(dir.path(), &seed);

        let Disposition::Reuse(file) = prepare(dir.path(), &seed, FULL_SIZE, false).unwrap()
        else {
            panic!("expected Reuse");
        };
        let map = map_payload(&file, FULL_SIZE, &dag_path(dir.path(), &seed)).unwrap();
        assert_eq!(map.len() as u64, FULL_SIZE);
        assert!(map.iter().all(|&b| b == 0));
    }
}
