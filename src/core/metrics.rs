// src/core/metrics.rs

//! Process-wide counters, exposed as plain atomics rather than a Prometheus
//! registry.
//!
//! Grounded on `spineldb::core::storage::db::shard::ShardCache`, which
//! tracks memory and key counts with `Arc<AtomicUsize>` rather than a
//! metrics crate. This daemon has no HTTP exporter surface, so the heavier
//! `prometheus`/`lazy_static` machinery the teacher uses in
//! `core::metrics` would pull in a dependency with nothing to serve it;
//! `info` reads these counters directly instead.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters for one running daemon. Cheap to clone (it's a handle,
/// not the data): wrap in `Arc` at the call site.
#[derive(Debug, Default)]
pub struct Metrics {
    pub sequences_scanned: AtomicU64,
    pub kmers_hashed: AtomicU64,
    pub files_watched: AtomicU64,
    pub files_processed: AtomicU64,
    pub files_failed: AtomicU64,
    pub references_indexed: AtomicU64,
    pub queries_served: AtomicU64,
    pub bytes_read: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_sequences_scanned(&self, n: u64) {
        self.sequences_scanned.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_kmers_hashed(&self, n: u64) {
        self.kmers_hashed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_files_watched(&self) {
        self.files_watched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_files_processed(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_files_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_references_indexed(&self, n: u64) {
        self.references_indexed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_queries_served(&self) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    /// A point-in-time snapshot, suitable for the `info` CLI subcommand or
    /// a log line.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sequences_scanned: self.sequences_scanned.load(Ordering::Relaxed),
            kmers_hashed: self.kmers_hashed.load(Ordering::Relaxed),
            files_watched: self.files_watched.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            references_indexed: self.references_indexed.load(Ordering::Relaxed),
            queries_served: self.queries_served.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub sequences_scanned: u64,
    pub kmers_hashed: u64,
    pub files_watched: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub references_indexed: u64,
    pub queries_served: u64,
    pub bytes_read: u64,
}
