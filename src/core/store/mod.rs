// src/core/store/mod.rs

//! A keyed, append-only binary store: fixed-size integer keys, byte-string
//! values, CRC-checksummed records.
//!
//! Grounded on `spineldb::core::persistence::spldb`: a magic+version header
//! followed by a stream of checksummed records, generalized from "one
//! whole-database snapshot, opcode-tagged" down to "one append-only log of
//! `key -> bytes`, rebuilt into an in-memory offset index on open". The
//! teacher uses `crc::Crc<u64>` with its own `CRC_64_REDIS` polynomial; this
//! store uses the standard `CRC_64_XZ` algorithm from the same crate.

pub mod bigsi_store;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crc::{Crc, CRC_64_XZ};

use crate::core::errors::{AntError, AntResult};

const MAGIC: &[u8; 8] = b"BIGSIKV1";
const VERSION: u32 = 1;
const HEADER_LEN: u64 = 12;

static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

fn checksum(key: u64, len: u32, value: &[u8]) -> u64 {
    let mut digest = CRC64.digest();
    digest.update(&key.to_le_bytes());
    digest.update(&len.to_le_bytes());
    digest.update(value);
    digest.finalize()
}

/// How a [`KeyedStore`] was opened; governs whether `put` is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create a brand-new, empty store. Fails if the file already exists.
    CreateExclusive,
    /// Open an existing store for point lookups only.
    ReadOnly,
}

/// An open keyed store: `key: u64 -> value: Vec<u8>`, backed by one
/// append-only file plus an in-memory offset index rebuilt on open.
pub struct KeyedStore {
    file: File,
    mode: OpenMode,
    index: HashMap<u64, (u64, u32)>,
    path: PathBuf,
}

impl KeyedStore {
    /// Opens (or creates) the store at `path` under `mode`.
    pub fn open(path: &Path, mode: OpenMode) -> AntResult<Self> {
        match mode {
            OpenMode::CreateExclusive => {
                let mut file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create_new(true)
                    .open(path)?;
                file.write_all(MAGIC)?;
                file.write_all(&VERSION.to_le_bytes())?;
                file.flush()?;
                Ok(Self {
                    file,
                    mode,
                    index: HashMap::new(),
                    path: path.to_path_buf(),
                })
            }
            OpenMode::ReadOnly => {
                let mut file = OpenOptions::new().read(true).open(path)?;
                let mut header = [0u8; HEADER_LEN as usize];
                file.read_exact(&mut header).map_err(|e| {
                    AntError::StoreIOError(std::sync::Arc::new(std::io::Error::new(
                        e.kind(),
                        format!("{}: truncated header: {e}", path.display()),
                    )))
                })?;
                if &header[0..8] != MAGIC {
                    return Err(AntError::MetadataParseError(format!(
                        "{}: bad magic bytes",
                        path.display()
                    )));
                }
                let version = u32::from_le_bytes(header[8..12].try_into().unwrap());
                if version != VERSION {
                    return Err(AntError::MetadataParseError(format!(
                        "{}: unsupported store version {version}",
                        path.display()
                    )));
                }
                let index = Self::scan_index(&mut file)?;
                Ok(Self {
                    file,
                    mode,
                    index,
                    path: path.to_path_buf(),
                })
            }
        }
    }

    fn scan_index(file: &mut File) -> AntResult<HashMap<u64, (u64, u32)>> {
        let mut index = HashMap::new();
        loop {
            let mut key_buf = [0u8; 8];
            match file.read_exact(&mut key_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let key = u64::from_le_bytes(key_buf);

            let mut len_buf = [0u8; 4];
            file.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf);

            let value_offset = file.stream_position()?;
            let mut value = vec![0u8; len as usize];
            file.read_exact(&mut value)?;

            let mut crc_buf = [0u8; 8];
            file.read_exact(&mut crc_buf)?;
            let stored_crc = u64::from_le_bytes(crc_buf);
            let computed_crc = checksum(key, len, &value);
            if stored_crc != computed_crc {
                return Err(AntError::MetadataParseError(format!(
                    "checksum mismatch for key {key}: store is corrupt"
                )));
            }

            index.insert(key, (value_offset, len));
        }
        Ok(index)
    }

    /// Appends `value` under `key`. Only valid on a store opened
    /// `CreateExclusive`; duplicate keys are rejected.
    pub fn put(&mut self, key: u64, value: &[u8]) -> AntResult<()> {
        if self.mode != OpenMode::CreateExclusive {
            return Err(AntError::AccessDenied(format!(
                "{}: store is read-only",
                self.path.display()
            )));
        }
        if self.index.contains_key(&key) {
            return Err(AntError::StoreIOError(std::sync::Arc::new(
                std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("duplicate key {key} in {}", self.path.display()),
                ),
            )));
        }

        let value_len = value.len() as u32;
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&key.to_le_bytes())?;
        self.file.write_all(&value_len.to_le_bytes())?;
        self.file.write_all(value)?;
        let crc = checksum(key, value_len, value);
        self.file.write_all(&crc.to_le_bytes())?;

        let value_offset = self.file.stream_position()? - value_len as u64 - 8;
        self.index.insert(key, (value_offset, value_len));
        Ok(())
    }

    /// Point lookup. `Ok(None)` means the key is absent, not an error.
    ///
    /// Uses a positioned read (`pread`) rather than seek-then-read, so
    /// concurrent lookups from multiple threads against the same open file
    /// are safe without any external synchronization — no thread's read
    /// can perturb another's file offset.
    pub fn get(&self, key: u64) -> AntResult<Option<Vec<u8>>> {
        let Some(&(offset, len)) = self.index.get(&key) else {
            return Ok(None);
        };
        let mut buf = vec![0u8; len as usize];
        self.file.read_exact_at(&mut buf, offset)?;
        Ok(Some(buf))
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.index.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Durability barrier: flush to disk and drop the handle.
    pub fn close(mut self) -> AntResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}
