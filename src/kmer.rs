//! K-mer extraction, with optional probabilistic sampling.
//!
//! A sequence of length `L` yields `L - k + 1` overlapping k-mers. When
//! `hash_fraction < 1.0`, each k-mer is independently kept with probability
//! `hash_fraction` via the caller-supplied [`SbtRng`] rather than every k-mer
//! being inserted, trading recall for smaller filters on long sequences.

use crate::rng::SbtRng;

/// Extracts every overlapping k-mer of length `k` from `sequence`, in order.
/// Returns an empty vec if `sequence` is shorter than `k`.
pub fn extract_kmers(sequence: &[u8], k: usize) -> Vec<&[u8]> {
    if k == 0 || sequence.len() < k {
        return Vec::new();
    }
    (0..=sequence.len() - k).map(|i| &sequence[i..i + k]).collect()
}

/// Extracts k-mers as in [`extract_kmers`], then independently keeps each
/// one with probability `hash_fraction` (clamped to `[0.0, 1.0]`).
///
/// `hash_fraction >= 1.0` keeps every k-mer and is equivalent to calling
/// [`extract_kmers`] directly.
pub fn extract_sampled_kmers<'a>(
    sequence: &'a [u8],
    k: usize,
    hash_fraction: f64,
    rng: &mut SbtRng,
) -> Vec<&'a [u8]> {
    extract_kmers(sequence, k)
        .into_iter()
        .filter(|_| rng.bernoulli(hash_fraction))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_overlapping_kmers() {
        let kmers = extract_kmers(b"ACGTA", 3);
        assert_eq!(kmers, vec![b"ACG".as_slice(), b"CGT", b"GTA"]);
    }

    #[test]
    fn short_sequence_yields_nothing() {
        assert!(extract_kmers(b"AC", 3).is_empty());
    }

    #[test]
    fn exact_length_yields_one_kmer() {
        assert_eq!(extract_kmers(b"ACG", 3), vec![b"ACG".as_slice()]);
    }

    #[test]
    fn sampling_with_fraction_one_keeps_everything() {
        let mut rng = SbtRng::new(1);
        let kmers = extract_sampled_kmers(b"ACGTACGT", 3, 1.0, &mut rng);
        assert_eq!(kmers.len(), extract_kmers(b"ACGTACGT", 3).len());
    }

    #[test]
    fn sampling_with_fraction_zero_keeps_nothing() {
        let mut rng = SbtRng::new(1);
        let kmers = extract_sampled_kmers(b"ACGTACGT", 3, 0.0, &mut rng);
        assert!(kmers.is_empty());
    }

    #[test]
    fn sampling_is_reproducible_for_same_seed() {
        let mut rng_a = SbtRng::new(42);
        let mut rng_b = SbtRng::new(42);
        let a = extract_sampled_kmers(b"ACGTACGTACGTACGT", 4, 0.5, &mut rng_a);
        let b = extract_sampled_kmers(b"ACGTACGTACGTACGT", 4, 0.5, &mut rng_b);
        assert_eq!(a, b);
    }
}
