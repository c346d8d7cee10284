// src/core/bloom.rs

//! A Bloom filter over pre-hashed `u64` tuples.
//!
//! Grounded on `spineldb::core::storage::bloom::BloomFilter`, but with one
//! deliberate redesign: this filter never hashes anything itself. It only
//! ever sees the tuples `HashKernel` already produced, so `add`/`contains`
//! take `&[u64]` rather than `&[u8]`. That keeps the one place raw sequence
//! bytes become hash values singular and testable in isolation.

use crate::core::bitvector::BitVector;
use crate::core::errors::{AntError, AntResult};

/// A Bloom filter backed by a [`BitVector`]. `num_hashes` must match the
/// length of every tuple passed to `add`/`contains`.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: BitVector,
    num_hashes: u32,
}

impl BloomFilter {
    /// Builds an empty filter of `capacity_bits` bits expecting `num_hashes`
    /// hashes per item.
    pub fn new(capacity_bits: u64, num_hashes: u32) -> AntResult<Self> {
        if num_hashes == 0 {
            return Err(AntError::ConfigInvalid(
                "bloom filter requires at least one hash".into(),
            ));
        }
        Ok(Self {
            bits: BitVector::new(capacity_bits)?,
            num_hashes,
        })
    }

    /// Sizes a filter from an expected element count `e` and target false
    /// positive rate `p`, using the standard formulas:
    /// `m = ceil(e * -ln(p) / ln(2)^2)`, `k = ceil((m / e) * ln(2))`.
    pub fn with_false_positive_rate(expected_count: u64, false_positive_rate: f64) -> AntResult<Self> {
        if expected_count < 1000 {
            return Err(AntError::ConfigInvalid(format!(
                "expected_count must be >= 1000, got {expected_count}"
            )));
        }
        if !(0.0 < false_positive_rate && false_positive_rate <= 0.1) {
            return Err(AntError::ConfigInvalid(format!(
                "false_positive_rate must be in (0, 0.1], got {false_positive_rate}"
            )));
        }
        let e = expected_count as f64;
        let ln2 = std::f64::consts::LN_2;
        let m = (e * (-false_positive_rate.ln()) / (ln2 * ln2)).ceil() as u64;
        let m = m.max(8);
        let k = ((m as f64 / e) * ln2).ceil() as u32;
        let k = k.max(1);
        Self::new(m, k)
    }

    pub fn capacity(&self) -> u64 {
        self.bits.capacity()
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn count(&self) -> u64 {
        self.bits.count()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.count() == 0
    }

    pub fn bits(&self) -> &BitVector {
        &self.bits
    }

    fn check_hashes<'h>(&self, hashes: &'h [u64]) -> AntResult<&'h [u64]> {
        if hashes.len() != self.num_hashes as usize {
            return Err(AntError::BigsiHashCountMismatch {
                filter_k: hashes.len() as u32,
                index_k: self.num_hashes,
            });
        }
        Ok(hashes)
    }

    /// Sets the bits addressed by `hashes` (already reduced modulo
    /// capacity by the caller's choice of hash values).
    pub fn add(&mut self, hashes: &[u64]) -> AntResult<()> {
        self.check_hashes(hashes)?;
        let m = self.bits.capacity();
        for &h in hashes {
            self.bits.set(h % m, 1)?;
        }
        Ok(())
    }

    /// True iff every bit addressed by `hashes` is set. May be a false
    /// positive; never a false negative for items previously `add`ed.
    pub fn contains(&self, hashes: &[u64]) -> AntResult<bool> {
        self.check_hashes(hashes)?;
        let m = self.bits.capacity();
        for &h in hashes {
            if self.bits.get(h % m)? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Merges `other` into `self` in place (bitwise OR), used when folding
    /// per-read filters into a single reference signature.
    pub fn merge(&mut self, other: &BloomFilter) -> AntResult<()> {
        if self.num_hashes != other.num_hashes {
            return Err(AntError::BigsiHashCountMismatch {
                filter_k: other.num_hashes,
                index_k: self.num_hashes,
            });
        }
        BitVector::or_into(&mut self.bits, &other.bits)
    }

    pub(crate) fn from_bits(bits: BitVector, num_hashes: u32) -> Self {
        Self { bits, num_hashes }
    }

    pub fn into_bits(self) -> BitVector {
        self.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_respects_requested_false_positive_rate() {
        let bf = BloomFilter::with_false_positive_rate(1000, 0.01).unwrap();
        assert!(bf.capacity() > 1000);
        assert!(bf.num_hashes() >= 1);
    }

    #[test]
    fn add_then_contains_is_always_true() {
        let mut bf = BloomFilter::new(2048, 3).unwrap();
        bf.add(&[1, 2, 3]).unwrap();
        assert!(bf.contains(&[1, 2, 3]).unwrap());
    }

    #[test]
    fn wrong_hash_count_is_rejected() {
        let mut bf = BloomFilter::new(2048, 3).unwrap();
        assert!(bf.add(&[1, 2]).is_err());
        assert!(bf.contains(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn empty_filter_has_zero_popcount() {
        let bf = BloomFilter::new(2048, 3).unwrap();
        assert!(bf.is_empty());
    }

    #[test]
    fn merge_is_bitwise_or() {
        let mut a = BloomFilter::new(2048, 2).unwrap();
        let mut b = BloomFilter::new(2048, 2).unwrap();
        a.add(&[10, 20]).unwrap();
        b.add(&[30, 40]).unwrap();
        a.merge(&b).unwrap();
        assert!(a.contains(&[10, 20]).unwrap());
        assert!(a.contains(&[30, 40]).unwrap());
    }

    #[test]
    fn rejects_zero_expected_count_or_bad_rate() {
        assert!(BloomFilter::with_false_positive_rate(0, 0.01).is_err());
        assert!(BloomFilter::with_false_positive_rate(999, 0.01).is_err());
        assert!(BloomFilter::with_false_positive_rate(1000, 0.01).is_ok());
        assert!(BloomFilter::with_false_positive_rate(1000, 0.0).is_err());
        assert!(BloomFilter::with_false_positive_rate(1000, 0.1).is_ok());
        assert!(BloomFilter::with_false_positive_rate(1000, 0.2).is_err());
        assert!(BloomFilter::with_false_positive_rate(1000, 1.0).is_err());
    }
}
