// src/core/bigsi/mod.rs

//! The Bit-Sliced Genomic Signature Index: a transposed bit-matrix over
//! per-reference Bloom filter signatures.
//!
//! The build/indexed split is modeled as two distinct Rust types,
//! `BigsiBuilder` and `Bigsi`, rather than a single runtime-checked handle —
//! `index()` consumes a `BigsiBuilder` and returns a `Bigsi`, so "add after
//! index" or "query before index" are not just rejected at runtime, they do
//! not typecheck. This is the one redesign the design notes call for
//! explicitly: the original C `bigsi_t` folds both phases into one struct
//! with a runtime mode check on every call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lru::LruCache;

use crate::core::bitvector::BitVector;
use crate::core::bloom::BloomFilter;
use crate::core::errors::{AntError, AntResult};
use crate::core::store::bigsi_store::BigsiStore;

/// Row cache size: recently fetched rows recur heavily within one file
/// (see §4.D.7), so a modest LRU cache turns the K-fetches-per-k-mer hot
/// path into mostly-cache-hits after warm-up.
const DEFAULT_ROW_CACHE_SIZE: usize = 4096;

/// The in-memory, build-mode BIGSI: an ordered column store keyed by
/// colour, plus the name-uniqueness map. Exists only until `index()`
/// consumes it.
pub struct BigsiBuilder {
    m: u64,
    k: u32,
    max_colours: u64,
    next_colour: u64,
    columns: Vec<BitVector>,
    names: Vec<String>,
    name_to_colour: HashMap<String, u64>,
}

impl BigsiBuilder {
    pub fn new(m: u64, k: u32, max_colours: u64) -> Self {
        Self {
            m,
            k,
            max_colours,
            next_colour: 0,
            columns: Vec::new(),
            names: Vec::new(),
            name_to_colour: HashMap::new(),
        }
    }

    pub fn m(&self) -> u64 {
        self.m
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn num_colours(&self) -> u64 {
        self.next_colour
    }

    /// Consumes `entries` (one Bloom filter per reference), assigning each a
    /// fresh colour. `expected_count` is the caller's promised entry count,
    /// used both to size the reservation and as a post-condition check.
    pub fn add(
        &mut self,
        entries: Vec<(String, BloomFilter)>,
        expected_count: u64,
    ) -> AntResult<()> {
        self.columns.reserve(expected_count as usize);
        self.names.reserve(expected_count as usize);

        let mut consumed = 0u64;
        for (name, filter) in entries {
            if self.name_to_colour.contains_key(&name) {
                return Err(AntError::BigsiDuplicateName(name));
            }
            if filter.num_hashes() != self.k {
                return Err(AntError::BigsiHashCountMismatch {
                    filter_k: filter.num_hashes(),
                    index_k: self.k,
                });
            }
            if filter.capacity() != self.m {
                return Err(AntError::BigsiCapacityMismatch {
                    filter_m: filter.capacity(),
                    index_m: self.m,
                });
            }
            if filter.is_empty() {
                return Err(AntError::BigsiEmptyFilter(name));
            }
            if self.next_colour >= self.max_colours {
                return Err(AntError::AllocationFailed(format!(
                    "colour limit {} reached",
                    self.max_colours
                )));
            }

            let colour = self.next_colour;
            self.columns.push(filter.into_bits());
            self.names.push(name.clone());
            self.name_to_colour.insert(name, colour);
            self.next_colour += 1;
            consumed += 1;
        }

        if consumed != expected_count {
            return Err(AntError::ConfigInvalid(format!(
                "expectedCount was {expected_count} but {consumed} entries were supplied"
            )));
        }
        Ok(())
    }

    /// Transposes the column store into rows and persists both the rows and
    /// the colour->name map under `dir`, returning a queryable [`Bigsi`].
    /// The metadata sidecar is written separately by `Bigsi::flush`.
    pub fn index(self, dir: &Path) -> AntResult<Bigsi> {
        if self.columns.is_empty() {
            return Err(AntError::ConfigInvalid(
                "cannot index a BIGSI with zero columns".into(),
            ));
        }

        let num_colours = self.next_colour;
        let mut store = BigsiStore::create(dir, self.m, self.k)?;

        for r in 0..self.m {
            let mut row = BitVector::new(num_colours)?;
            for (c, column) in self.columns.iter().enumerate() {
                if column.get(r)? == 1 {
                    row.set(c as u64, 1)?;
                }
            }
            store.put_row(r, &row)?;
        }
        for (c, name) in self.names.iter().enumerate() {
            store.put_name(c as u64, name)?;
        }
        store.set_colour_iterator(num_colours);

        Ok(Bigsi {
            m: self.m,
            k: self.k,
            num_colours,
            store,
            dir: dir.to_path_buf(),
            row_cache: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(DEFAULT_ROW_CACHE_SIZE).unwrap(),
            )),
        })
    }
}

/// An indexed (or reloaded) BIGSI: read-only, queryable, shareable across
/// reader threads. Covers both the "Indexed" and "Loaded" states from the
/// design — they have identical shape, differing only in how they were
/// constructed.
pub struct Bigsi {
    m: u64,
    k: u32,
    num_colours: u64,
    store: BigsiStore,
    dir: PathBuf,
    row_cache: Mutex<LruCache<u64, std::sync::Arc<BitVector>>>,
}

impl Bigsi {
    pub fn m(&self) -> u64 {
        self.m
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn num_colours(&self) -> u64 {
        self.num_colours
    }

    fn fetch_row(&self, row_id: u64) -> AntResult<std::sync::Arc<BitVector>> {
        if let Some(hit) = self.row_cache.lock().unwrap().get(&row_id) {
            return Ok(hit.clone());
        }
        let row = self
            .store
            .get_row(row_id)?
            .ok_or(AntError::BigsiMissingRow(row_id))?;
        let row = std::sync::Arc::new(row);
        self.row_cache.lock().unwrap().put(row_id, row.clone());
        Ok(row)
    }

    /// Queries `hashes` (one per hash function) into `result`, which must
    /// arrive with capacity `num_colours` and popcount 0.
    ///
    /// Takes `&self`: the row store reads with positioned reads (`pread`),
    /// and the row cache is its own `Mutex`, so concurrent `query` calls
    /// from multiple threads against one shared `Bigsi` are safe without an
    /// outer lock serializing them.
    pub fn query(&self, hashes: &[u64], result: &mut BitVector) -> AntResult<()> {
        if hashes.len() != self.k as usize {
            return Err(AntError::BigsiHashCountMismatch {
                filter_k: hashes.len() as u32,
                index_k: self.k,
            });
        }
        if result.capacity() != self.num_colours {
            return Err(AntError::BigsiCapacityMismatch {
                filter_m: result.capacity(),
                index_m: self.num_colours,
            });
        }
        if result.count() != 0 {
            return Err(AntError::NullArgument(
                "query result vector must be empty on entry".into(),
            ));
        }

        for (i, &h) in hashes.iter().enumerate() {
            let row_id = h % self.m;
            let row = self.fetch_row(row_id)?;
            if row.count() == 0 {
                result.clear();
                return Ok(());
            }
            if i == 0 {
                BitVector::or_into(result, &row)?;
            } else {
                BitVector::and_into(result, &row)?;
            }
            if result.count() == 0 {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Resolves a colour to its reference name.
    pub fn lookup(&self, colour: u64) -> AntResult<String> {
        if colour >= self.num_colours {
            return Err(AntError::BigsiColourOutOfRange {
                colour,
                num_colours: self.num_colours,
            });
        }
        self.store
            .get_name(colour)?
            .ok_or(AntError::BigsiMissingRow(colour))
    }

    /// Writes the metadata sidecar and closes both stores. Consumes `self`:
    /// there is no handle left afterward to accidentally reuse.
    pub fn flush(self) -> AntResult<()> {
        self.store.write_metadata(&self.dir)?;
        self.store.close()
    }

    /// Reconstructs a read-only, queryable `Bigsi` from a previously
    /// flushed directory.
    pub fn load(dir: &Path) -> AntResult<Self> {
        let store = BigsiStore::load(dir)?;
        Ok(Self {
            m: store.metadata.num_bits,
            k: store.metadata.num_hashes,
            num_colours: store.metadata.colour_iterator,
            store,
            dir: dir.to_path_buf(),
            row_cache: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(DEFAULT_ROW_CACHE_SIZE).unwrap(),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash_kernel::HashKernel;
    use tempfile::tempdir;

    fn canonical_hashes(kernel: &HashKernel, kmer: &[u8]) -> Vec<u64> {
        let mut scan = kernel.scan(kmer).unwrap();
        let mut buf = vec![0u64; kernel.num_hashes() as usize];
        assert!(scan.step(&mut buf));
        buf
    }

    /// Scenario S1 from the design's testable-properties section.
    #[test]
    fn s1_build_index_and_query() {
        let m = 2000;
        let k = 1; // single hash function keeps this scenario deterministic
        let kernel = HashKernel::new(3, k).unwrap();

        let mut seq1 = BloomFilter::new(m, k).unwrap();
        for kmer in [&b"act"[..], &b"ggg"[..]] {
            seq1.add(&canonical_hashes(&kernel, kmer)).unwrap();
        }
        let mut seq2 = BloomFilter::new(m, k).unwrap();
        seq2.add(&canonical_hashes(&kernel, b"cgt")).unwrap();

        let mut builder = BigsiBuilder::new(m, k, 1_000_000);
        builder
            .add(
                vec![("seq1".to_string(), seq1), ("seq2".to_string(), seq2)],
                2,
            )
            .unwrap();

        let dir = tempdir().unwrap();
        let bigsi = builder.index(dir.path()).unwrap();

        let mut result = BitVector::new(2).unwrap();
        bigsi
            .query(&canonical_hashes(&kernel, b"act"), &mut result)
            .unwrap();
        assert_eq!(result.get(0).unwrap(), 1);
        assert_eq!(result.get(1).unwrap(), 0);

        let mut result = BitVector::new(2).unwrap();
        bigsi
            .query(&canonical_hashes(&kernel, b"cgt"), &mut result)
            .unwrap();
        assert_eq!(result.get(0).unwrap(), 0);
        assert_eq!(result.get(1).unwrap(), 1);

        let mut result = BitVector::new(2).unwrap();
        bigsi
            .query(&canonical_hashes(&kernel, b"ccc"), &mut result)
            .unwrap();
        assert_eq!(result.count(), 0);
    }

    /// Scenario S2: flush then load must answer the same queries identically.
    #[test]
    fn s2_flush_then_load_roundtrip() {
        let m = 2000;
        let k = 1;
        let kernel = HashKernel::new(3, k).unwrap();

        let mut seq1 = BloomFilter::new(m, k).unwrap();
        seq1.add(&canonical_hashes(&kernel, b"act")).unwrap();
        let mut seq2 = BloomFilter::new(m, k).unwrap();
        seq2.add(&canonical_hashes(&kernel, b"cgt")).unwrap();

        let mut builder = BigsiBuilder::new(m, k, 1_000_000);
        builder
            .add(
                vec![("seq1".to_string(), seq1), ("seq2".to_string(), seq2)],
                2,
            )
            .unwrap();

        let dir = tempdir().unwrap();
        let bigsi = builder.index(dir.path()).unwrap();
        bigsi.flush().unwrap();

        let loaded = Bigsi::load(dir.path()).unwrap();
        let mut result = BitVector::new(2).unwrap();
        loaded
            .query(&canonical_hashes(&kernel, b"act"), &mut result)
            .unwrap();
        assert_eq!(result.get(0).unwrap(), 1);
        assert_eq!(result.get(1).unwrap(), 0);
    }

    #[test]
    fn add_rejects_duplicate_name() {
        let mut builder = BigsiBuilder::new(100, 1, 10);
        let mut f1 = BloomFilter::new(100, 1).unwrap();
        f1.add(&[5]).unwrap();
        let mut f2 = BloomFilter::new(100, 1).unwrap();
        f2.add(&[6]).unwrap();
        builder
            .add(vec![("dup".to_string(), f1)], 1)
            .unwrap();
        assert!(matches!(
            builder.add(vec![("dup".to_string(), f2)], 1),
            Err(AntError::BigsiDuplicateName(_))
        ));
    }

    #[test]
    fn add_rejects_mismatched_capacity_and_hash_count() {
        let mut builder = BigsiBuilder::new(100, 2, 10);
        let mut wrong_m = BloomFilter::new(50, 2).unwrap();
        wrong_m.add(&[1, 2]).unwrap();
        assert!(matches!(
            builder.add(vec![("a".to_string(), wrong_m)], 1),
            Err(AntError::BigsiCapacityMismatch { .. })
        ));

        let mut wrong_k = BloomFilter::new(100, 1).unwrap();
        wrong_k.add(&[1]).unwrap();
        assert!(matches!(
            builder.add(vec![("b".to_string(), wrong_k)], 1),
            Err(AntError::BigsiHashCountMismatch { .. })
        ));
    }

    #[test]
    fn add_rejects_empty_filter() {
        let mut builder = BigsiBuilder::new(100, 1, 10);
        let empty = BloomFilter::new(100, 1).unwrap();
        assert!(matches!(
            builder.add(vec![("e".to_string(), empty)], 1),
            Err(AntError::BigsiEmptyFilter(_))
        ));
    }

    #[test]
    fn add_rejects_expected_count_mismatch() {
        let mut builder = BigsiBuilder::new(100, 1, 10);
        let mut f = BloomFilter::new(100, 1).unwrap();
        f.add(&[1]).unwrap();
        assert!(matches!(
            builder.add(vec![("a".to_string(), f)], 2),
            Err(AntError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn index_rejects_empty_builder() {
        let builder = BigsiBuilder::new(100, 1, 10);
        let dir = tempdir().unwrap();
        assert!(builder.index(dir.path()).is_err());
    }

    #[test]
    fn query_rejects_wrong_result_capacity() {
        let mut builder = BigsiBuilder::new(100, 1, 10);
        let mut f = BloomFilter::new(100, 1).unwrap();
        f.add(&[1]).unwrap();
        builder.add(vec![("a".to_string(), f)], 1).unwrap();
        let dir = tempdir().unwrap();
        let bigsi = builder.index(dir.path()).unwrap();

        let mut wrong_capacity = BitVector::new(5).unwrap();
        assert!(matches!(
            bigsi.query(&[1], &mut wrong_capacity),
            Err(AntError::BigsiCapacityMismatch { .. })
        ));

        let mut non_empty = BitVector::new(1).unwrap();
        non_empty.set(0, 1).unwrap();
        assert!(matches!(
            bigsi.query(&[1], &mut non_empty),
            Err(AntError::NullArgument(_))
        ));
    }

    /// S6: deleting the row store after flush must fail `load`, not panic.
    #[test]
    fn s6_corrupted_store_fails_to_load() {
        let mut builder = BigsiBuilder::new(8, 1, 10);
        let mut f = BloomFilter::new(8, 1).unwrap();
        f.add(&[1]).unwrap();
        builder.add(vec![("a".to_string(), f)], 1).unwrap();
        let dir = tempdir().unwrap();
        let bigsi = builder.index(dir.path()).unwrap();
        bigsi.flush().unwrap();

        std::fs::remove_file(BigsiStore::bitvectors_path(dir.path())).unwrap();
        assert!(Bigsi::load(dir.path()).is_err());
    }
}
