// src/core/store/bigsi_store.rs

//! The on-disk layout of one indexed BIGSI: a metadata sidecar plus the two
//! keyed stores it names, exactly per the external-interfaces section of the
//! design — `bigsi-metadata.json`, `bigsi-bitvectors.bdb`,
//! `bigsi-colours.bdb`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::bitvector::BitVector;
use crate::core::errors::{AntError, AntResult};
use crate::core::store::{KeyedStore, OpenMode};

const METADATA_FILE: &str = "bigsi-metadata.json";
const BITVECTORS_FILE: &str = "bigsi-bitvectors.bdb";
const COLOURS_FILE: &str = "bigsi-colours.bdb";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigsiMetadata {
    pub db_directory: String,
    pub metadata: String,
    pub bitvectors: String,
    pub colours: String,
    #[serde(rename = "numBits")]
    pub num_bits: u64,
    #[serde(rename = "numHashes")]
    pub num_hashes: u32,
    #[serde(rename = "colourIterator")]
    pub colour_iterator: u64,
}

/// The two keyed stores backing an indexed BIGSI, plus the metadata sidecar
/// that names them.
pub struct BigsiStore {
    pub metadata: BigsiMetadata,
    rows: KeyedStore,
    names: KeyedStore,
}

impl BigsiStore {
    /// Creates a brand-new on-disk layout under `dir`. Fails if any of the
    /// three files already exist.
    pub fn create(dir: &Path, num_bits: u64, num_hashes: u32) -> AntResult<Self> {
        std::fs::create_dir_all(dir)?;
        let rows = KeyedStore::open(&dir.join(BITVECTORS_FILE), OpenMode::CreateExclusive)?;
        let names = KeyedStore::open(&dir.join(COLOURS_FILE), OpenMode::CreateExclusive)?;
        let metadata = BigsiMetadata {
            db_directory: dir.display().to_string(),
            metadata: METADATA_FILE.to_string(),
            bitvectors: BITVECTORS_FILE.to_string(),
            colours: COLOURS_FILE.to_string(),
            num_bits,
            num_hashes,
            colour_iterator: 0,
        };
        Ok(Self {
            metadata,
            rows,
            names,
        })
    }

    /// Reopens an existing layout read-only, validating the sidecar first.
    pub fn load(dir: &Path) -> AntResult<Self> {
        let sidecar_path = dir.join(METADATA_FILE);
        let raw = std::fs::read_to_string(&sidecar_path)?;
        let metadata: BigsiMetadata = serde_json::from_str(&raw)?;
        let rows = KeyedStore::open(&dir.join(&metadata.bitvectors), OpenMode::ReadOnly)?;
        let names = KeyedStore::open(&dir.join(&metadata.colours), OpenMode::ReadOnly)?;
        Ok(Self {
            metadata,
            rows,
            names,
        })
    }

    pub fn num_rows_stored(&self) -> usize {
        self.rows.len()
    }

    pub fn num_names_stored(&self) -> usize {
        self.names.len()
    }

    /// Writes row `row_id`'s bit vector (already serialized to the §6 wire
    /// format) into the row store.
    pub fn put_row(&mut self, row_id: u64, bv: &BitVector) -> AntResult<()> {
        self.rows.put(row_id, &bv.to_wire())
    }

    /// Fetches and deserializes row `row_id`. `Ok(None)` is distinct from
    /// corruption: it only happens if the key was never written, which the
    /// index-build invariant (every row is stored, even all-zero ones)
    /// treats as corruption at the call site.
    pub fn get_row(&self, row_id: u64) -> AntResult<Option<BitVector>> {
        match self.rows.get(row_id)? {
            Some(bytes) => Ok(Some(BitVector::from_wire(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_name(&mut self, colour: u64, name: &str) -> AntResult<()> {
        let mut value = name.as_bytes().to_vec();
        value.push(0);
        self.names.put(colour, &value)
    }

    pub fn get_name(&self, colour: u64) -> AntResult<Option<String>> {
        match self.names.get(colour)? {
            Some(bytes) => {
                let trimmed = bytes.strip_suffix(&[0u8]).unwrap_or(&bytes);
                let name = std::str::from_utf8(trimmed)
                    .map_err(|e| AntError::MetadataParseError(format!("non-UTF-8 name: {e}")))?;
                Ok(Some(name.to_string()))
            }
            None => Ok(None),
        }
    }

    pub fn write_metadata(&self, dir: &Path) -> AntResult<()> {
        let json = serde_json::to_string_pretty(&self.metadata)?;
        std::fs::write(dir.join(METADATA_FILE), json)?;
        Ok(())
    }

    pub fn set_colour_iterator(&mut self, n: u64) {
        self.metadata.colour_iterator = n;
    }

    /// Durability barrier over both underlying stores.
    pub fn close(self) -> AntResult<()> {
        self.rows.close()?;
        self.names.close()?;
        Ok(())
    }

    pub fn bitvectors_path(dir: &Path) -> PathBuf {
        dir.join(BITVECTORS_FILE)
    }

    pub fn colours_path(dir: &Path) -> PathBuf {
        dir.join(COLOURS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_write_flush_load_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = BigsiStore::create(dir.path(), 2000, 3).unwrap();

        let mut bv = BitVector::new(2).unwrap();
        bv.set(0, 1).unwrap();
        store.put_row(0, &bv).unwrap();
        store.put_name(0, "seq1").unwrap();
        store.put_name(1, "seq2").unwrap();
        store.set_colour_iterator(2);
        store.write_metadata(dir.path()).unwrap();
        store.close().unwrap();

        let mut loaded = BigsiStore::load(dir.path()).unwrap();
        assert_eq!(loaded.metadata.num_bits, 2000);
        assert_eq!(loaded.metadata.num_hashes, 3);
        assert_eq!(loaded.metadata.colour_iterator, 2);
        let row = loaded.get_row(0).unwrap().unwrap();
        assert_eq!(row.get(0).unwrap(), 1);
        assert_eq!(loaded.get_name(0).unwrap().unwrap(), "seq1");
        assert_eq!(loaded.get_name(1).unwrap().unwrap(), "seq2");
    }

    #[test]
    fn missing_row_file_fails_to_load() {
        let dir = tempdir().unwrap();
        let mut store = BigsiStore::create(dir.path(), 8, 1).unwrap();
        store.write_metadata(dir.path()).unwrap();
        store.close().unwrap();

        std::fs::remove_file(BigsiStore::bitvectors_path(dir.path())).unwrap();
        assert!(BigsiStore::load(dir.path()).is_err());
    }
}
