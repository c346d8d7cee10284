// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, covering every failure domain in §7 of the design:
/// bit-vector/bloom-filter construction, the BIGSI state machine, the
/// persistent store, the hash kernel, sequence decoding, and configuration.
#[derive(Error, Debug, Clone)]
pub enum AntError {
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("null or missing argument: {0}")]
    NullArgument(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("BIGSI is not indexed yet")]
    BigsiUnindexed,

    #[error("BIGSI has already been indexed")]
    BigsiAlreadyIndexed,

    #[error("hash count mismatch: filter has {filter_k} hashes, index expects {index_k}")]
    BigsiHashCountMismatch { filter_k: u32, index_k: u32 },

    #[error("capacity mismatch: filter has {filter_m} bits, index expects {index_m}")]
    BigsiCapacityMismatch { filter_m: u64, index_m: u64 },

    #[error("missing row {0} in persistent store; index is corrupt")]
    BigsiMissingRow(u64),

    #[error("OR of incompatible bit vectors: {0}")]
    BigsiOrFailure(String),

    #[error("AND of incompatible bit vectors: {0}")]
    BigsiAndFailure(String),

    #[error("colour {colour} out of range (numColours = {num_colours})")]
    BigsiColourOutOfRange { colour: u64, num_colours: u64 },

    #[error("reference name '{0}' is already present in this BIGSI")]
    BigsiDuplicateName(String),

    #[error("bloom filter for '{0}' is empty (popcount == 0)")]
    BigsiEmptyFilter(String),

    #[error("store I/O error: {0}")]
    StoreIOError(Arc<std::io::Error>),

    #[error("metadata sidecar parse error: {0}")]
    MetadataParseError(String),

    #[error("invalid k-mer size: {0}")]
    HashKernelInvalidK(String),

    #[error("sequence decode error: {0}")]
    SequenceDecodeError(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl PartialEq for AntError {
    fn eq(&self, other: &Self) -> bool {
        use AntError::*;
        match (self, other) {
            (AllocationFailed(a), AllocationFailed(b)) => a == b,
            (NullArgument(a), NullArgument(b)) => a == b,
            (AccessDenied(a), AccessDenied(b)) => a == b,
            (BigsiUnindexed, BigsiUnindexed) => true,
            (BigsiAlreadyIndexed, BigsiAlreadyIndexed) => true,
            (
                BigsiHashCountMismatch {
                    filter_k: f1,
                    index_k: i1,
                },
                BigsiHashCountMismatch {
                    filter_k: f2,
                    index_k: i2,
                },
            ) => f1 == f2 && i1 == i2,
            (
                BigsiCapacityMismatch {
                    filter_m: f1,
                    index_m: i1,
                },
                BigsiCapacityMismatch {
                    filter_m: f2,
                    index_m: i2,
                },
            ) => f1 == f2 && i1 == i2,
            (BigsiMissingRow(a), BigsiMissingRow(b)) => a == b,
            (BigsiOrFailure(a), BigsiOrFailure(b)) => a == b,
            (BigsiAndFailure(a), BigsiAndFailure(b)) => a == b,
            (
                BigsiColourOutOfRange {
                    colour: c1,
                    num_colours: n1,
                },
                BigsiColourOutOfRange {
                    colour: c2,
                    num_colours: n2,
                },
            ) => c1 == c2 && n1 == n2,
            (BigsiDuplicateName(a), BigsiDuplicateName(b)) => a == b,
            (BigsiEmptyFilter(a), BigsiEmptyFilter(b)) => a == b,
            (StoreIOError(a), StoreIOError(b)) => a.to_string() == b.to_string(),
            (MetadataParseError(a), MetadataParseError(b)) => a == b,
            (HashKernelInvalidK(a), HashKernelInvalidK(b)) => a == b,
            (SequenceDecodeError(a), SequenceDecodeError(b)) => a == b,
            (ConfigInvalid(a), ConfigInvalid(b)) => a == b,
            _ => false,
        }
    }
}

impl From<std::io::Error> for AntError {
    fn from(e: std::io::Error) -> Self {
        AntError::StoreIOError(Arc::new(e))
    }
}

impl From<serde_json::Error> for AntError {
    fn from(e: serde_json::Error) -> Self {
        AntError::MetadataParseError(e.to_string())
    }
}

pub type AntResult<T> = Result<T, AntError>;
