//! Similarity kernels over pairs of [`BitFilter`]s.
//!
//! Every kernel takes an optional `rng` for tie-breaking: greedy insertion
//! and agglomerative clustering both repeatedly pick the single best-scoring
//! candidate, and a deterministic-per-call perturbation on the order of
//! `1e-9` (see [`crate::rng::TIE_BREAK_SCALE`]) keeps that choice from being
//! degenerate when two candidates score identically.

use crate::bitfilter::BitFilter;
use crate::rng::SbtRng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum KernelKind {
    Hamming,
    Cosine,
    Jaccard,
    Manhattan,
    Euclidean,
    Dice,
    Tanimoto,
}

impl KernelKind {
    /// Computes the similarity between `a` and `b`, optionally perturbed by
    /// `rng` to break ties. Pass `rng: None` for a pure, reproducible score
    /// (used by tests and by scoring that must not depend on call order).
    pub fn score(&self, a: &BitFilter, b: &BitFilter, rng: Option<&mut SbtRng>) -> f64 {
        let raw = match self {
            KernelKind::Hamming => hamming(a, b),
            KernelKind::Cosine => cosine(a, b),
            KernelKind::Jaccard => jaccard(a, b),
            KernelKind::Manhattan => manhattan(a, b),
            KernelKind::Euclidean => euclidean(a, b),
            KernelKind::Dice => dice(a, b),
            KernelKind::Tanimoto => tanimoto(a, b),
        };
        match rng {
            Some(rng) => raw + rng.perturbation(),
            None => raw,
        }
    }
}

fn counts(a: &BitFilter, b: &BitFilter) -> (usize, usize, usize) {
    debug_assert_eq!(a.len(), b.len());
    let both = crate::bitfilter::and(a, b).popcount();
    let either = crate::bitfilter::or(a, b).popcount();
    let xor = crate::bitfilter::xor(a, b).popcount();
    (both, either, xor)
}

/// Negative population count of `a XOR b`. Higher (less negative) is more
/// similar; zero only when `a == b`.
fn hamming(a: &BitFilter, b: &BitFilter) -> f64 {
    let (_, _, xor) = counts(a, b);
    -(xor as f64)
}

fn cosine(a: &BitFilter, b: &BitFilter) -> f64 {
    let (both, _, _) = counts(a, b);
    let denom = (a.popcount() as f64).sqrt() * (b.popcount() as f64).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    both as f64 / denom
}

fn jaccard(a: &BitFilter, b: &BitFilter) -> f64 {
    let (both, either, _) = counts(a, b);
    if either == 0 {
        return 0.0;
    }
    both as f64 / either as f64
}

/// Manhattan distance converted to a similarity by negating: larger (less
/// negative) means more similar, consistent with every other kernel here.
fn manhattan(a: &BitFilter, b: &BitFilter) -> f64 {
    let (_, _, xor) = counts(a, b);
    -(xor as f64)
}

fn euclidean(a: &BitFilter, b: &BitFilter) -> f64 {
    let (_, _, xor) = counts(a, b);
    -(xor as f64).sqrt()
}

fn dice(a: &BitFilter, b: &BitFilter) -> f64 {
    let (both, _, _) = counts(a, b);
    let denom = a.popcount() + b.popcount();
    if denom == 0 {
        return 0.0;
    }
    (2 * both) as f64 / denom as f64
}

fn tanimoto(a: &BitFilter, b: &BitFilter) -> f64 {
    let (both, _, _) = counts(a, b);
    let denom = a.popcount() + b.popcount() - both;
    if denom == 0 {
        return 0.0;
    }
    both as f64 / denom as f64
}
