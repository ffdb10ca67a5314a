//! Fixed-length bitset: the storage primitive behind every node filter.
//!
//! # Overview
//! A `BitFilter` is a bloom-filter-shaped bit array of length `m`. Each node
//! filter (`bf`, `sim`, `rem`, `how`, `det`, `union`) is one `BitFilter`.
//! Bulk operations (`and_`, `or_`, `xor_`, `not_`) run word-at-a-time, so
//! they cost O(m/64) rather than O(m).
//!
//! # Example
//! For `m = 10` and a k-mer hashing to index 3:
//! - `set(3)` turns on bit 3: `0000100000`
//! - `or_(&other)` folds in every bit `other` has set

use serde::{Deserialize, Serialize};

/// An immutable-length bitset of `m` bits, stored as `Vec<u64>` words.
///
/// All filters within a single [`crate::sbt::Sbt`] share the same `m`;
/// mixing filters of different lengths is a caller bug surfaced as
/// [`crate::error::SbtError::DimensionMismatch`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BitFilter {
    words: Vec<u64>,
    len: usize,
}

impl BitFilter {
    /// Creates a new all-zero filter of `len` bits.
    pub fn zeros(len: usize) -> Self {
        let words = vec![0u64; len.div_ceil(64)];
        BitFilter { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "bit index {idx} out of range for {} bits", self.len);
        let word = idx >> 6;
        let bit = idx & 63;
        self.words[word] |= 1u64 << bit;
    }

    #[inline]
    pub fn test(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "bit index {idx} out of range for {} bits", self.len);
        let word = idx >> 6;
        let bit = idx & 63;
        (self.words[word] & (1u64 << bit)) != 0
    }

    #[inline]
    pub fn or_(&mut self, other: &BitFilter) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    #[inline]
    pub fn and_(&mut self, other: &BitFilter) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
    }

    #[inline]
    pub fn xor_(&mut self, other: &BitFilter) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a ^= *b;
        }
    }

    /// Bitwise NOT, with the trailing padding bits (beyond `len`) masked
    /// back off so `popcount` stays meaningful.
    pub fn not(&self) -> BitFilter {
        let mut out = self.clone();
        for w in out.words.iter_mut() {
            *w = !*w;
        }
        out.mask_tail();
        out
    }

    fn mask_tail(&mut self) {
        let used_bits = self.len % 64;
        if used_bits != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << used_bits) - 1;
            }
        }
    }

    /// Returns a new filter containing only the first `n` bits (the rest
    /// zeroed), used by clustering insertion's `bits_to_check` prefix
    /// comparisons.
    pub fn prefix(&self, n: usize) -> BitFilter {
        let n = n.min(self.len);
        let mut out = BitFilter::zeros(self.len);
        for i in 0..n {
            if self.test(i) {
                out.set(i);
            }
        }
        out
    }

    #[inline]
    pub fn popcount(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Renders the filter as a string of `0`/`1` characters, used only by
    /// `render_graph(Bits)` and the debug tree dump.
    pub fn to_bit_string(&self) -> String {
        (0..self.len)
            .map(|i| if self.test(i) { '1' } else { '0' })
            .collect()
    }
}

/// `a AND b` without mutating either operand.
pub fn and(a: &BitFilter, b: &BitFilter) -> BitFilter {
    let mut out = a.clone();
    out.and_(b);
    out
}

/// `a OR b` without mutating either operand.
pub fn or(a: &BitFilter, b: &BitFilter) -> BitFilter {
    let mut out = a.clone();
    out.or_(b);
    out
}

/// `a XOR b` without mutating either operand.
pub fn xor(a: &BitFilter, b: &BitFilter) -> BitFilter {
    let mut out = a.clone();
    out.xor_(b);
    out
}
