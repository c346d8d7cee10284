// src/core/bitvector.rs

//! A fixed-capacity, packed bit buffer with incremental popcount tracking.
//!
//! This is the leaf data structure the rest of the core is built on: the
//! `BloomFilter` owns one, each BIGSI column/row is one, and the on-disk row
//! format (§6) is this type's byte layout.

use crate::core::errors::{AntError, AntResult};

/// A semantic array of bits with a fixed declared capacity and packed
/// `u8` storage. The popcount is maintained incrementally on single-bit
/// mutation and recomputed with the hardware popcount instruction whenever a
/// bulk operation touches the whole buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    capacity: u64,
    popcount: u64,
    bytes: Vec<u8>,
}

impl BitVector {
    /// Creates a new, all-zero `BitVector` with the given bit capacity.
    ///
    /// # Errors
    /// Returns `AntError::ConfigInvalid` if `capacity == 0`.
    pub fn new(capacity: u64) -> AntResult<Self> {
        if capacity == 0 {
            return Err(AntError::ConfigInvalid(
                "BitVector capacity must be non-zero".into(),
            ));
        }
        let num_bytes = capacity.div_ceil(8) as usize;
        Ok(Self {
            capacity,
            popcount: 0,
            bytes: vec![0u8; num_bytes],
        })
    }

    /// Reconstructs a `BitVector` from raw packed bytes and a known popcount,
    /// without revalidating the popcount against the buffer. Used by the
    /// persistent store when loading a row that was already checksummed.
    pub(crate) fn from_raw_parts(capacity: u64, popcount: u64, bytes: Vec<u8>) -> Self {
        Self {
            capacity,
            popcount,
            bytes,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn count(&self) -> u64 {
        self.popcount
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Iterates the indices of set bits, byte-at-a-time rather than
    /// bit-at-a-time.
    pub fn set_bits(&self) -> impl Iterator<Item = u64> + '_ {
        self.bytes.iter().enumerate().flat_map(|(byte_idx, &byte)| {
            (0..8).filter_map(move |bit_idx| {
                if byte & (1 << bit_idx) != 0 {
                    Some((byte_idx * 8 + bit_idx) as u64)
                } else {
                    None
                }
            })
        })
    }

    fn check_index(&self, i: u64) -> AntResult<()> {
        if i >= self.capacity {
            return Err(AntError::AccessDenied(format!(
                "bit index {i} out of range (capacity {})",
                self.capacity
            )));
        }
        Ok(())
    }

    /// Sets bit `i` to `v` (0 or 1). Setting a bit to its current value is a
    /// no-op for the popcount (idempotent).
    pub fn set(&mut self, i: u64, v: u8) -> AntResult<()> {
        self.check_index(i)?;
        if v > 1 {
            return Err(AntError::ConfigInvalid(format!(
                "bit value must be 0 or 1, got {v}"
            )));
        }
        let byte_idx = (i / 8) as usize;
        let bit_idx = (i % 8) as u8;
        let mask = 1u8 << bit_idx;
        let was_set = self.bytes[byte_idx] & mask != 0;
        if v == 1 {
            self.bytes[byte_idx] |= mask;
            if !was_set {
                self.popcount += 1;
            }
        } else {
            self.bytes[byte_idx] &= !mask;
            if was_set {
                self.popcount -= 1;
            }
        }
        Ok(())
    }

    /// Reads bit `i`.
    pub fn get(&self, i: u64) -> AntResult<u8> {
        self.check_index(i)?;
        let byte_idx = (i / 8) as usize;
        let bit_idx = (i % 8) as u8;
        Ok(((self.bytes[byte_idx] >> bit_idx) & 1) as u8)
    }

    /// Zeroes every bit and resets the popcount.
    pub fn clear(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
        self.popcount = 0;
    }

    fn recompute_popcount(&mut self) {
        self.popcount = self
            .bytes
            .iter()
            .map(|b| b.count_ones() as u64)
            .sum();
    }

    fn check_same_capacity(a: &BitVector, b: &BitVector) -> AntResult<()> {
        if a.capacity != b.capacity {
            return Err(AntError::BigsiCapacityMismatch {
                filter_m: b.capacity,
                index_m: a.capacity,
            });
        }
        Ok(())
    }

    /// `r = a & b`. `r` must be empty (all-zero, popcount 0) on entry and all
    /// three vectors must share a capacity.
    pub fn and(a: &BitVector, b: &BitVector, r: &mut BitVector) -> AntResult<()> {
        Self::check_same_capacity(a, b)?;
        Self::check_same_capacity(a, r)?;
        for i in 0..r.bytes.len() {
            r.bytes[i] = a.bytes[i] & b.bytes[i];
        }
        r.recompute_popcount();
        Ok(())
    }

    /// `r = a | b`.
    pub fn or(a: &BitVector, b: &BitVector, r: &mut BitVector) -> AntResult<()> {
        Self::check_same_capacity(a, b)?;
        Self::check_same_capacity(a, r)?;
        for i in 0..r.bytes.len() {
            r.bytes[i] = a.bytes[i] | b.bytes[i];
        }
        r.recompute_popcount();
        Ok(())
    }

    /// `r = a ^ b`.
    pub fn xor(a: &BitVector, b: &BitVector, r: &mut BitVector) -> AntResult<()> {
        Self::check_same_capacity(a, b)?;
        Self::check_same_capacity(a, r)?;
        for i in 0..r.bytes.len() {
            r.bytes[i] = a.bytes[i] ^ b.bytes[i];
        }
        r.recompute_popcount();
        Ok(())
    }

    /// `dst &= src`, in place.
    pub fn and_into(dst: &mut BitVector, src: &BitVector) -> AntResult<()> {
        Self::check_same_capacity(dst, src)?;
        for i in 0..dst.bytes.len() {
            dst.bytes[i] &= src.bytes[i];
        }
        dst.recompute_popcount();
        Ok(())
    }

    /// `dst |= src`, in place.
    pub fn or_into(dst: &mut BitVector, src: &BitVector) -> AntResult<()> {
        Self::check_same_capacity(dst, src)?;
        for i in 0..dst.bytes.len() {
            dst.bytes[i] |= src.bytes[i];
        }
        dst.recompute_popcount();
        Ok(())
    }

    /// Serializes to the on-disk row format from §6:
    /// `capacity_bits (u64 LE) || popcount (u64 LE) || packed buffer`.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.bytes.len());
        out.extend_from_slice(&self.capacity.to_le_bytes());
        out.extend_from_slice(&self.popcount.to_le_bytes());
        out.extend_from_slice(&self.bytes);
        out
    }

    /// Parses the §6 on-disk row format, validating that the stored popcount
    /// matches the buffer's true popcount (a mismatch indicates corruption).
    pub fn from_wire(data: &[u8]) -> AntResult<Self> {
        if data.len() < 16 {
            return Err(AntError::MetadataParseError(
                "bit vector record shorter than 16-byte header".into(),
            ));
        }
        let capacity = u64::from_le_bytes(data[0..8].try_into().unwrap());
        let popcount = u64::from_le_bytes(data[8..16].try_into().unwrap());
        let expected_bytes = capacity.div_ceil(8) as usize;
        let buf = &data[16..];
        if buf.len() != expected_bytes {
            return Err(AntError::MetadataParseError(format!(
                "bit vector buffer length {} does not match capacity {} ({} bytes expected)",
                buf.len(),
                capacity,
                expected_bytes
            )));
        }
        let bv = Self {
            capacity,
            popcount,
            bytes: buf.to_vec(),
        };
        let true_popcount: u64 = bv.bytes.iter().map(|b| b.count_ones() as u64).sum();
        if true_popcount != popcount {
            return Err(AntError::MetadataParseError(format!(
                "bit vector popcount {popcount} does not match buffer's true popcount {true_popcount}"
            )));
        }
        Ok(bv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_capacity() {
        assert!(matches!(
            BitVector::new(0),
            Err(AntError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn set_and_get_roundtrip() {
        let mut bv = BitVector::new(100).unwrap();
        bv.set(5, 1).unwrap();
        bv.set(99, 1).unwrap();
        assert_eq!(bv.get(5).unwrap(), 1);
        assert_eq!(bv.get(99).unwrap(), 1);
        assert_eq!(bv.get(6).unwrap(), 0);
        assert_eq!(bv.count(), 2);
    }

    #[test]
    fn set_out_of_range_fails() {
        let mut bv = BitVector::new(8).unwrap();
        assert!(bv.set(8, 1).is_err());
    }

    #[test]
    fn set_twice_is_idempotent() {
        let mut bv = BitVector::new(8).unwrap();
        bv.set(0, 1).unwrap();
        bv.set(0, 1).unwrap();
        assert_eq!(bv.count(), 1);
        bv.set(0, 0).unwrap();
        bv.set(0, 0).unwrap();
        assert_eq!(bv.count(), 0);
    }

    #[test]
    fn clear_resets_popcount() {
        let mut bv = BitVector::new(16).unwrap();
        bv.set(1, 1).unwrap();
        bv.set(2, 1).unwrap();
        bv.clear();
        assert_eq!(bv.count(), 0);
        assert_eq!(bv.get(1).unwrap(), 0);
    }

    #[test]
    fn and_or_xor_preserve_capacity_and_popcount() {
        let mut a = BitVector::new(16).unwrap();
        let mut b = BitVector::new(16).unwrap();
        a.set(0, 1).unwrap();
        a.set(1, 1).unwrap();
        b.set(1, 1).unwrap();
        b.set(2, 1).unwrap();

        let mut and_r = BitVector::new(16).unwrap();
        BitVector::and(&a, &b, &mut and_r).unwrap();
        assert_eq!(and_r.count(), 1);
        assert_eq!(and_r.get(1).unwrap(), 1);

        let mut or_r = BitVector::new(16).unwrap();
        BitVector::or(&a, &b, &mut or_r).unwrap();
        assert_eq!(or_r.count(), 3);

        let mut xor_r = BitVector::new(16).unwrap();
        BitVector::xor(&a, &b, &mut xor_r).unwrap();
        assert_eq!(xor_r.count(), 2);
    }

    #[test]
    fn mismatched_capacity_rejected() {
        let a = BitVector::new(8).unwrap();
        let b = BitVector::new(16).unwrap();
        let mut r = BitVector::new(8).unwrap();
        assert!(BitVector::and(&a, &b, &mut r).is_err());
    }

    #[test]
    fn and_into_is_in_place() {
        let mut dst = BitVector::new(8).unwrap();
        let mut src = BitVector::new(8).unwrap();
        dst.set(0, 1).unwrap();
        dst.set(1, 1).unwrap();
        src.set(1, 1).unwrap();
        BitVector::and_into(&mut dst, &src).unwrap();
        assert_eq!(dst.count(), 1);
        assert_eq!(dst.get(1).unwrap(), 1);
    }

    #[test]
    fn wire_roundtrip() {
        let mut bv = BitVector::new(37).unwrap();
        bv.set(0, 1).unwrap();
        bv.set(36, 1).unwrap();
        let wire = bv.to_wire();
        let parsed = BitVector::from_wire(&wire).unwrap();
        assert_eq!(parsed, bv);
    }

    #[test]
    fn wire_rejects_corrupted_popcount() {
        let mut bv = BitVector::new(8).unwrap();
        bv.set(0, 1).unwrap();
        let mut wire = bv.to_wire();
        // Corrupt the stored popcount field.
        wire[8] = 99;
        assert!(BitVector::from_wire(&wire).is_err());
    }
}
