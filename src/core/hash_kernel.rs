// src/core/hash_kernel.rs

//! An ntHash-style rolling canonical multihash kernel.
//!
//! Ported in spirit (not byte-for-byte) from the original daemon's
//! `nthash.h`, itself a C port of Hamid Mohamadi's ntHash
//! (<https://github.com/bcgsc/ntHash>). Each k-mer gets a canonical hash —
//! identical whether read forward or as its reverse complement — derived in
//! O(1) from the previous k-mer's hash by substituting the outgoing and
//! incoming base, and `N` independent 64-bit values are derived from that one
//! canonical hash per step in O(N).
//!
//! The kernel never touches I/O; it is a pure function of the bytes handed
//! to it. Both the sketch path and the query path drive it the same way, so
//! there is exactly one place sequence bytes become hash values (see the
//! "Hash-function exposure" design note) — `BloomFilter` and `Bigsi` only
//! ever see the tuples this module produces.

use crate::core::errors::{AntError, AntResult};

const SEED_A: u64 = 0x3c8b_fbb3_95c6_0474;
const SEED_C: u64 = 0x3193_c185_62a0_2b4c;
const SEED_G: u64 = 0x2032_3ed0_8257_2324;
const SEED_T: u64 = 0x2955_49f5_4be2_4456;

/// The mixing constant used to derive hash `i` from the canonical hash,
/// splitmix64-style.
const MULTI_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

const MAX_K: u32 = 31;

#[inline]
fn seed_of(base: u8) -> Option<u64> {
    match base.to_ascii_uppercase() {
        b'A' => Some(SEED_A),
        b'C' => Some(SEED_C),
        b'G' => Some(SEED_G),
        b'T' => Some(SEED_T),
        _ => None,
    }
}

#[inline]
fn is_acgt(base: u8) -> bool {
    matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
}

#[inline]
fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        other => other,
    }
}

/// Returns the offset of the first base in `window` that is not in
/// `{A,C,G,T}` (case-insensitive), or `None` if the whole window is clean.
#[inline]
fn first_invalid_base(window: &[u8]) -> Option<usize> {
    window.iter().position(|&b| !is_acgt(b))
}

/// True iff `kmer` equals its own reverse complement.
fn is_revcomp_palindrome(kmer: &[u8]) -> bool {
    let k = kmer.len();
    (0..k).all(|i| complement(kmer[i]).eq_ignore_ascii_case(&kmer[k - 1 - i]))
}

/// A configured kernel: fixed k-mer size and hash count. Stateless and
/// cheap to clone; the actual rolling state lives in the `KmerHashes`
/// iterator produced by [`HashKernel::scan`].
#[derive(Debug, Clone, Copy)]
pub struct HashKernel {
    k: u32,
    n: u32,
}

impl HashKernel {
    /// Builds a kernel for k-mer size `k` (1..=31) producing `n` hashes per
    /// k-mer (n >= 1).
    pub fn new(k: u32, n: u32) -> AntResult<Self> {
        if k == 0 || k > MAX_K {
            return Err(AntError::HashKernelInvalidK(format!(
                "k must be in [1, {MAX_K}], got {k}"
            )));
        }
        if n == 0 {
            return Err(AntError::ConfigInvalid(
                "hash kernel requires at least one hash".into(),
            ));
        }
        Ok(Self { k, n })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn num_hashes(&self) -> u32 {
        self.n
    }

    /// Builds a lazy scan over `seq`, one tuple of `n` hashes per k-mer.
    ///
    /// # Errors
    /// `AntError::HashKernelInvalidK` if `seq` is shorter than `k`.
    pub fn scan<'s>(&self, seq: &'s [u8]) -> AntResult<KmerHashes<'s>> {
        if (seq.len() as u64) < self.k as u64 {
            return Err(AntError::HashKernelInvalidK(format!(
                "k ({}) exceeds sequence length ({})",
                self.k,
                seq.len()
            )));
        }
        Ok(KmerHashes {
            k: self.k,
            n: self.n,
            seq,
            pos: 0,
            window_start: 0,
            state: None,
            end: false,
        })
    }

    #[inline]
    fn init_hashes(k: u32, kmer: &[u8]) -> (u64, u64) {
        let k = k as usize;
        let mut fwd = 0u64;
        let mut rc = 0u64;
        for (i, &base) in kmer.iter().enumerate() {
            let rot = (k - 1 - i) as u32;
            fwd ^= seed_of(base).unwrap_or(0).rotate_left(rot);
            rc ^= seed_of(complement(base)).unwrap_or(0).rotate_left(i as u32);
        }
        (fwd, rc)
    }

    #[inline]
    fn roll(fwd: u64, rc: u64, out_base: u8, in_base: u8, k: u32) -> (u64, u64) {
        let out_seed = seed_of(out_base).unwrap_or(0);
        let in_seed = seed_of(in_base).unwrap_or(0);
        let out_c_seed = seed_of(complement(out_base)).unwrap_or(0);
        let in_c_seed = seed_of(complement(in_base)).unwrap_or(0);

        let new_fwd = fwd.rotate_left(1) ^ out_seed.rotate_left(k) ^ in_seed;
        let new_rc = rc.rotate_right(1) ^ out_c_seed.rotate_right(1) ^ in_c_seed.rotate_left(k - 1);
        (new_fwd, new_rc)
    }

    /// Derives the `n` pairwise-distinct 64-bit hashes for this k-mer from
    /// its single canonical value.
    fn fill_multihash(canonical: u64, n: u32, out: &mut [u64]) {
        out[0] = canonical;
        for (i, slot) in out.iter_mut().enumerate().skip(1) {
            let mut z = canonical.wrapping_add((i as u64).wrapping_mul(MULTI_SEED));
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            *slot = z ^ (z >> 31);
        }
    }
}

struct RollState {
    fwd: u64,
    rc: u64,
}

/// A lazy, single-pass view over the canonical multihash tuples of one
/// sequence. Call [`KmerHashes::step`] to advance; the returned slice
/// borrows an internal buffer the caller does not own across calls to
/// `step`, mirroring the "caller owns the tuple buffer between steps"
/// contract: copy it out before calling `step` again if you need it later.
pub struct KmerHashes<'s> {
    k: u32,
    n: u32,
    seq: &'s [u8],
    /// Next candidate offset to examine when `state` is `None`.
    pos: usize,
    /// Start offset of the k-mer the current `state` (if any) belongs to.
    window_start: usize,
    state: Option<RollState>,
    end: bool,
}

impl<'s> KmerHashes<'s> {
    /// True once the stream is exhausted.
    pub fn is_end(&self) -> bool {
        self.end
    }

    /// Advances to the next non-palindromic, all-ACGT k-mer and writes its
    /// `n` hashes into `out` (which must have length >= n). Returns `false`
    /// once the stream is exhausted, leaving `out` untouched.
    pub fn step(&mut self, out: &mut [u64]) -> bool {
        let k = self.k as usize;
        loop {
            if self.end {
                return false;
            }

            let (fwd, rc) = match self.state.take() {
                None => {
                    loop {
                        if self.pos + k > self.seq.len() {
                            self.end = true;
                            return false;
                        }
                        let window = &self.seq[self.pos..self.pos + k];
                        match first_invalid_base(window) {
                            Some(bad) => self.pos += bad + 1,
                            None => break,
                        }
                    }
                    self.window_start = self.pos;
                    HashKernel::init_hashes(self.k, &self.seq[self.window_start..self.window_start + k])
                }
                Some(st) => {
                    let out_base = self.seq[self.window_start - 1];
                    let in_base = self.seq[self.window_start + k - 1];
                    HashKernel::roll(st.fwd, st.rc, out_base, in_base, self.k)
                }
            };

            let kmer = &self.seq[self.window_start..self.window_start + k];
            let palindrome = is_revcomp_palindrome(kmer);

            let next_window_start = self.window_start + 1;
            let next_in_idx = self.window_start + k;
            let can_roll = next_in_idx < self.seq.len() && is_acgt(self.seq[next_in_idx]);

            if palindrome {
                if can_roll {
                    self.state = Some(RollState { fwd, rc });
                    self.window_start = next_window_start;
                    self.pos = next_window_start;
                } else {
                    self.state = None;
                    self.pos = next_window_start;
                }
                continue;
            }

            HashKernel::fill_multihash(fwd.min(rc), self.n, out);

            if can_roll {
                self.state = Some(RollState { fwd, rc });
                self.window_start = next_window_start;
                self.pos = next_window_start;
            } else {
                self.state = None;
                self.pos = next_window_start;
            }
            return true;
        }
    }
}

impl Iterator for KmerHashes<'_> {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = vec![0u64; self.n as usize];
        if self.step(&mut buf) { Some(buf) } else { None }
    }
}
