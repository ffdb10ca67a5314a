//! Converts a raw query sequence into the positions/weights the tree
//! traversal needs, for each of the three query entry points.

use std::collections::{HashMap, HashSet};

use crate::hash::{HashFamily, HashFn};
use crate::kmer::extract_kmers;

/// One unit of evidence during a query traversal: a k-mer's hash
/// position(s) plus how many actual k-mers it stands for.
#[derive(Clone, Debug)]
pub struct QueryUnit {
    pub positions: Vec<usize>,
    pub weight: usize,
}

/// Smallest hit count that satisfies `threshold` against `total_weight`
/// k-mers.
pub fn required_count(total_weight: usize, threshold: f64) -> usize {
    (threshold * total_weight as f64).ceil() as usize
}

/// One unit per k-mer, carrying all `H` of its hash positions. The only
/// mode that supports `hash_functions > 1`, since Base's membership rule
/// requires every one of the H positions to be set.
pub fn normal_units(sequence: &[u8], k: usize, hashes: &HashFamily, modulus: usize) -> Vec<QueryUnit> {
    extract_kmers(sequence, k)
        .into_iter()
        .map(|kmer| QueryUnit { positions: hashes.hash_indices(kmer, modulus), weight: 1 })
        .collect()
}

/// One unit per *distinct* hash position, weighted by how many k-mers
/// collided into it. Requires a single hash function.
pub fn fast_units(sequence: &[u8], k: usize, hash: &HashFn, modulus: usize) -> Vec<QueryUnit> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for kmer in extract_kmers(sequence, k) {
        *counts.entry(hash.hash_index(kmer, modulus)).or_insert(0) += 1;
    }
    counts.into_iter().map(|(pos, weight)| QueryUnit { positions: vec![pos], weight }).collect()
}

/// One unit per *distinct* hash position, each weighted 1 regardless of how
/// many k-mers collided into it — unlike `fast_units`, repeats aren't
/// counted, trading a little recall on repetitive queries for not having to
/// build the count map. Requires a single hash function.
pub fn faster_units(sequence: &[u8], k: usize, hash: &HashFn, modulus: usize) -> Vec<QueryUnit> {
    let mut seen: HashSet<usize> = HashSet::new();
    extract_kmers(sequence, k)
        .into_iter()
        .filter_map(|kmer| {
            let pos = hash.hash_index(kmer, modulus);
            seen.insert(pos).then_some(QueryUnit { positions: vec![pos], weight: 1 })
        })
        .collect()
}
