// src/core/pipeline/mod.rs

//! The sketch/query pipeline: drives the hash kernel over parsed sequence
//! records, building Bloom filters at reference-index time and issuing
//! BIGSI queries at read time. Never mutates the index.

pub mod seqio;

use std::collections::HashMap;
use std::path::Path;

use crate::core::bigsi::Bigsi;
use crate::core::bitvector::BitVector;
use crate::core::bloom::BloomFilter;
use crate::core::errors::{AntError, AntResult};
use crate::core::hash_kernel::HashKernel;
use crate::core::metrics::Metrics;
use crate::core::pipeline::seqio::SeqReader;

/// Sketches every sequence in a reference file into its own Bloom filter,
/// sized `(m, num_hashes)` to match the target BIGSI. One file corresponds
/// to one call to `BigsiBuilder::add`.
pub fn sketch_reference_file(
    path: &Path,
    m: u64,
    kmer_size: u32,
    num_hashes: u32,
) -> AntResult<Vec<(String, BloomFilter)>> {
    let kernel = HashKernel::new(kmer_size, num_hashes)?;
    let mut reader = SeqReader::open(path)?;
    let mut entries = Vec::new();

    while let Some(record) = reader.next_record()? {
        let mut filter = BloomFilter::new(m, num_hashes)?;
        match kernel.scan(&record.sequence) {
            Ok(mut scan) => {
                let mut hashes = vec![0u64; num_hashes as usize];
                while scan.step(&mut hashes) {
                    filter.add(&hashes)?;
                }
            }
            Err(AntError::HashKernelInvalidK(_)) => {
                tracing::warn!(
                    component = "sketch",
                    sequence = %record.name,
                    "sequence shorter than k; no k-mers sketched"
                );
            }
            Err(e) => return Err(e),
        }
        entries.push((record.name, filter));
    }

    Ok(entries)
}

/// The aggregate result of querying one read against a BIGSI: how many of
/// its k-mers matched each reference colour.
#[derive(Debug, Clone)]
pub struct QueryReport {
    pub read_name: String,
    pub num_kmers: u64,
    pub hits_by_colour: HashMap<u64, u64>,
}

/// Iterates every read in `path`, drives the hash kernel, and queries
/// `bigsi` per k-mer, aggregating hits per read. Per-k-mer errors are
/// logged and skipped unless they indicate store corruption
/// (`BigsiMissingRow`/`StoreIOError`), in which case the whole file aborts.
pub fn query_read_file(
    path: &Path,
    bigsi: &Bigsi,
    kmer_size: u32,
    metrics: &Metrics,
) -> AntResult<Vec<QueryReport>> {
    let kernel = HashKernel::new(kmer_size, bigsi.k())?;
    let mut reader = SeqReader::open(path)?;
    let mut reports = Vec::new();

    while let Some(record) = reader.next_record()? {
        metrics.incr_sequences_scanned(1);

        let mut scan = match kernel.scan(&record.sequence) {
            Ok(scan) => scan,
            Err(AntError::HashKernelInvalidK(_)) => continue,
            Err(e) => return Err(e),
        };

        let mut hashes = vec![0u64; bigsi.k() as usize];
        let mut result = BitVector::new(bigsi.num_colours())?;
        let mut hits_by_colour: HashMap<u64, u64> = HashMap::new();
        let mut num_kmers = 0u64;

        while scan.step(&mut hashes) {
            num_kmers += 1;
            metrics.incr_kmers_hashed(1);
            result.clear();

            match bigsi.query(&hashes, &mut result) {
                Ok(()) => {
                    for colour in result.set_bits() {
                        *hits_by_colour.entry(colour).or_insert(0) += 1;
                    }
                }
                Err(e @ (AntError::BigsiMissingRow(_) | AntError::StoreIOError(_))) => {
                    tracing::error!(
                        component = "sketch",
                        read = %record.name,
                        error = %e,
                        "store corruption detected; aborting file"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        component = "sketch",
                        read = %record.name,
                        error = %e,
                        "k-mer query failed; skipping"
                    );
                }
            }
        }

        tracing::info!(
            component = "sketch",
            read = %record.name,
            kmers = num_kmers,
            colours_matched = hits_by_colour.len(),
            "read processed"
        );
        metrics.incr_queries_served();
        reports.push(QueryReport {
            read_name: record.name,
            num_kmers,
            hits_by_colour,
        });
    }

    Ok(reports)
}
