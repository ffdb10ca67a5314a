//! The tree container: insertion, clustering bulk-builders, and querying.

use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::bitfilter::BitFilter;
use crate::error::{Result, SbtError};
use crate::hash::{HashFamily, HashFn};
use crate::kernel::KernelKind;
use crate::kmer::extract_sampled_kmers;
use crate::node::{Classification, IdGen, Node, NodeVariant};
use crate::query::{self, QueryUnit};
use crate::rng::SbtRng;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SbtConfig {
    pub bloom_filter_length: usize,
    pub k: usize,
    pub hash_functions: usize,
    pub threshold: f64,
    pub variant: NodeVariant,
    pub kernel: KernelKind,
    pub hash_fraction: f64,
    pub seed: u64,
}

impl SbtConfig {
    fn validate(&self) -> Result<()> {
        if self.bloom_filter_length == 0 {
            return Err(SbtError::InvalidConfiguration("bloom_filter_length must be positive".into()));
        }
        if self.k == 0 {
            return Err(SbtError::InvalidConfiguration("k must be positive".into()));
        }
        if self.hash_functions == 0 {
            return Err(SbtError::InvalidConfiguration("hash_functions must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SbtError::InvalidConfiguration("threshold must be within [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.hash_fraction) {
            return Err(SbtError::InvalidConfiguration("hash_fraction must be within [0, 1]".into()));
        }
        if matches!(self.variant, NodeVariant::Ssbt | NodeVariant::HowDe) && self.hash_functions != 1 {
            return Err(SbtError::InvalidConfiguration(
                "SSBT and HowDe variants require exactly one hash function".into(),
            ));
        }
        Ok(())
    }
}

/// A Sequence Bloom Tree: one bloom-filter-backed approximate membership
/// index over a growing set of named sequences ("experiments").
pub struct Sbt {
    pub(crate) config: SbtConfig,
    pub(crate) root: Option<Box<Node>>,
    pub(crate) hashes: HashFamily,
    pub(crate) ids: IdGen,
    pub(crate) rng: SbtRng,
}

impl Sbt {
    pub fn new(config: SbtConfig) -> Result<Self> {
        config.validate()?;
        let hashes = HashFamily::new(config.seed, config.hash_functions);
        let rng = SbtRng::new(config.seed);
        Ok(Sbt { config, root: None, hashes, ids: IdGen::new(), rng })
    }

    pub fn config(&self) -> &SbtConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.as_ref().map(|r| r.leaf_names().len()).unwrap_or(0)
    }

    fn build_filter(&mut self, sequence: &[u8]) -> BitFilter {
        self.build_filter_from(std::iter::once(sequence))
    }

    /// Folds every sequence's k-mers into a single filter, so several reads
    /// from one experiment can be inserted as one leaf.
    fn build_filter_from<I, S>(&mut self, sequences: I) -> BitFilter
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut bf = BitFilter::zeros(self.config.bloom_filter_length);
        for sequence in sequences {
            let kmers = extract_sampled_kmers(
                sequence.as_ref(),
                self.config.k,
                self.config.hash_fraction,
                &mut self.rng,
            );
            for kmer in kmers {
                for pos in self.hashes.hash_indices(kmer, self.config.bloom_filter_length) {
                    bf.set(pos);
                }
            }
        }
        bf
    }

    /// Hashes `sequence` and inserts it as a new leaf, descending greedily
    /// by similarity from the current root.
    #[instrument(skip(self, sequence), fields(name = %name.as_ref()))]
    pub fn insert_sequence(&mut self, name: impl AsRef<str>, sequence: &[u8]) -> Result<()> {
        let bf = self.build_filter(sequence);
        self.insert_node(name.as_ref().to_string(), bf)
    }

    /// Folds several reads from one experiment into a single leaf filter,
    /// then inserts it the same way `insert_sequence` inserts one.
    #[instrument(skip(self, sequences), fields(name = %name.as_ref(), reads = sequences.len()))]
    pub fn insert_experiment(&mut self, name: impl AsRef<str>, sequences: &[String]) -> Result<()> {
        let bf = self.build_filter_from(sequences);
        self.insert_node(name.as_ref().to_string(), bf)
    }

    /// Inserts an already-built leaf filter directly, bypassing k-mer
    /// extraction. Used by the clustering bulk-builders, which hash every
    /// sequence up front.
    pub fn insert_node(&mut self, name: String, bf: BitFilter) -> Result<()> {
        if bf.len() != self.config.bloom_filter_length {
            return Err(SbtError::DimensionMismatch {
                expected: self.config.bloom_filter_length,
                found: bf.len(),
            });
        }
        let id = self.ids.next();
        let leaf = Box::new(Node::new_leaf(id, name, self.config.variant, bf));
        self.root = Some(match self.root.take() {
            None => leaf,
            Some(root) => Node::insert_experiment(root, leaf, self.config.kernel, &mut self.rng, &mut self.ids),
        });
        Ok(())
    }

    fn build_leaves(&mut self, sequences: &[(String, Vec<u8>)]) -> Vec<Box<Node>> {
        sequences
            .iter()
            .map(|(name, seq)| {
                let bf = self.build_filter(seq);
                let id = self.ids.next();
                Box::new(Node::new_leaf(id, name.clone(), self.config.variant, bf))
            })
            .collect()
    }

    fn graft(&mut self, subtree: Box<Node>) {
        self.root = Some(match self.root.take() {
            None => subtree,
            Some(existing) => Node::insert_experiment(existing, subtree, self.config.kernel, &mut self.rng, &mut self.ids),
        });
    }

    /// Scores a candidate pair of representative filters, truncating both to
    /// their first `prefix_bits` bits first when given — comparing fewer
    /// bits trades some ranking precision for cheaper pairwise scoring
    /// during clustering, where every round rescans most or all pairs.
    fn score_pair(&mut self, a: &BitFilter, b: &BitFilter, prefix_bits: Option<usize>) -> f64 {
        match prefix_bits {
            Some(n) => self.config.kernel.score(&a.prefix(n), &b.prefix(n), Some(&mut self.rng)),
            None => self.config.kernel.score(a, b, Some(&mut self.rng)),
        }
    }

    /// Bulk-builds a cluster of sequences by repeatedly merging the single
    /// most-similar pair among all currently-unmerged subtrees ("AllSome"),
    /// then grafts the resulting subtree onto the existing tree (if any).
    /// O(N^3): each of the N-1 merge rounds rescans the full pairwise
    /// similarity matrix. `prefix_bits` limits every pairwise score to that
    /// many leading bits of each representative filter; `None` scores the
    /// full filter.
    #[instrument(skip(self, sequences), fields(n = sequences.len()))]
    pub fn insert_cluster_sequences_all_some(
        &mut self,
        sequences: &[(String, Vec<u8>)],
        prefix_bits: Option<usize>,
    ) -> Result<()> {
        if sequences.is_empty() {
            return Ok(());
        }
        let mut pool = self.build_leaves(sequences);
        while pool.len() > 1 {
            let mut best = (0usize, 1usize, f64::NEG_INFINITY);
            for (i, j) in (0..pool.len()).tuple_combinations() {
                let score = self.score_pair(pool[i].filters.representative(), pool[j].filters.representative(), prefix_bits);
                if score > best.2 {
                    best = (i, j, score);
                }
            }
            let (i, j, _) = best;
            let right = pool.remove(j);
            let left = pool.remove(i);
            let id = self.ids.next();
            pool.push(Box::new(Node::from_children(id, left, right)));
        }
        debug!("all-some clustering collapsed {} sequences to one subtree", sequences.len());
        self.graft(pool.pop().expect("non-empty pool after clustering"));
        Ok(())
    }

    /// Bulk-builds a cluster of sequences round by round: each round greedily
    /// matches the best-scoring disjoint pairs among the round's subtrees
    /// ("LevelPairing"), carrying any odd one out to the next round
    /// unmerged. Bounds the resulting subtree's height to `ceil(log2 N)`.
    /// `prefix_bits` has the same meaning as in
    /// [`Sbt::insert_cluster_sequences_all_some`].
    #[instrument(skip(self, sequences), fields(n = sequences.len()))]
    pub fn insert_cluster_sequences_level_pairing(
        &mut self,
        sequences: &[(String, Vec<u8>)],
        prefix_bits: Option<usize>,
    ) -> Result<()> {
        if sequences.is_empty() {
            return Ok(());
        }
        let mut pool = self.build_leaves(sequences);
        while pool.len() > 1 {
            let mut used = vec![false; pool.len()];
            let mut pairs: Vec<(usize, usize)> = Vec::new();
            loop {
                let mut best: Option<(usize, usize, f64)> = None;
                for (i, j) in (0..pool.len()).tuple_combinations() {
                    if used[i] || used[j] {
                        continue;
                    }
                    let score = self.score_pair(pool[i].filters.representative(), pool[j].filters.representative(), prefix_bits);
                    if best.map(|(_, _, b)| score > b).unwrap_or(true) {
                        best = Some((i, j, score));
                    }
                }
                match best {
                    Some((i, j, _)) => {
                        used[i] = true;
                        used[j] = true;
                        pairs.push((i, j));
                    }
                    None => break,
                }
            }
            let mut slots: Vec<Option<Box<Node>>> = pool.into_iter().map(Some).collect();
            let mut taken = vec![false; slots.len()];
            let mut next_level = Vec::with_capacity(slots.len().div_ceil(2));
            for (i, j) in pairs {
                let left = slots[i].take().expect("pair index used twice");
                let right = slots[j].take().expect("pair index used twice");
                taken[i] = true;
                taken[j] = true;
                let id = self.ids.next();
                next_level.push(Box::new(Node::from_children(id, left, right)));
            }
            for (idx, slot) in slots.into_iter().enumerate() {
                if !taken[idx] {
                    if let Some(node) = slot {
                        next_level.push(node);
                    }
                }
            }
            pool = next_level;
        }
        debug!("level-pairing clustering collapsed {} sequences to one subtree", sequences.len());
        self.graft(pool.pop().expect("non-empty pool after clustering"));
        Ok(())
    }

    fn query_with(&self, units: Vec<QueryUnit>) -> Result<Vec<String>> {
        let root = self.root.as_ref().ok_or(SbtError::EmptyTree)?;
        let total_weight: usize = units.iter().map(|u| u.weight).sum();
        let required = query::required_count(total_weight, self.config.threshold);
        let refs: Vec<&QueryUnit> = units.iter().collect();
        let mut matches = Vec::new();
        Self::query_core(root, &refs, required, &mut matches);
        Ok(matches)
    }

    /// Single shared traversal core used by all three query entry points.
    /// Prunes a subtree the moment its best-case remaining hit count can no
    /// longer reach `required`; a node whose own hits already meet
    /// `required` returns every leaf below it without recursing further
    /// (a `Hit` only ever means "present in every leaf under this node"),
    /// and the children it does recurse into only need `required` reduced
    /// by this node's confirmed hit weight, checked against the units still
    /// `Partial` here.
    fn query_core(node: &Node, units: &[&QueryUnit], required: usize, out: &mut Vec<String>) {
        let mut hit_w = 0usize;
        let mut partial: Vec<&QueryUnit> = Vec::new();
        for &u in units {
            match node.classify(&u.positions) {
                Classification::Hit => hit_w += u.weight,
                Classification::Miss => {}
                Classification::Partial => partial.push(u),
            }
        }
        let partial_w: usize = partial.iter().map(|u| u.weight).sum();
        if hit_w + partial_w < required {
            return;
        }
        if hit_w >= required {
            out.extend(node.leaf_names().into_iter().map(String::from));
            return;
        }
        let remaining = required - hit_w;
        let (left, right) = node.iter_children();
        if let Some(left) = left {
            Self::query_core(left, &partial, remaining, out);
        }
        if let Some(right) = right {
            Self::query_core(right, &partial, remaining, out);
        }
    }

    /// Normal query: every k-mer contributes its full set of `H` hash
    /// positions, matching Base's AND-of-H-positions membership rule. Works
    /// for any variant and any `hash_functions` count.
    pub fn query_sequence(&self, sequence: &[u8]) -> Result<Vec<String>> {
        let units = query::normal_units(sequence, self.config.k, &self.hashes, self.config.bloom_filter_length);
        self.query_with(units)
    }

    fn single_hash(&self) -> Result<&HashFn> {
        self.hashes
            .iter()
            .next()
            .ok_or_else(|| SbtError::InvalidConfiguration("tree has no hash function configured".into()))
    }

    /// Fast query: deduplicates repeated hash positions into a
    /// position -> occurrence-count map before traversal. Only valid on a
    /// tree configured with exactly one hash function.
    pub fn fast_query_sequence(&self, sequence: &[u8]) -> Result<Vec<String>> {
        if self.config.hash_functions != 1 {
            return Err(SbtError::InvalidConfiguration(
                "fast_query_sequence requires a tree with exactly one hash function".into(),
            ));
        }
        let hash = self.single_hash()?;
        let units = query::fast_units(sequence, self.config.k, hash, self.config.bloom_filter_length);
        self.query_with(units)
    }

    /// Faster query: deduplicates hash positions like `fast_query_sequence`
    /// but without counting occurrences — every distinct position counts
    /// once, so a repeated k-mer no longer pulls extra weight toward the
    /// threshold. Cheaper than the count map, at the cost of undercounting
    /// repetitive queries. Only valid on a tree configured with exactly one
    /// hash function.
    pub fn faster_query_sequence(&self, sequence: &[u8]) -> Result<Vec<String>> {
        if self.config.hash_functions != 1 {
            return Err(SbtError::InvalidConfiguration(
                "faster_query_sequence requires a tree with exactly one hash function".into(),
            ));
        }
        let hash = self.single_hash()?;
        let units = query::faster_units(sequence, self.config.k, hash, self.config.bloom_filter_length);
        self.query_with(units)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::persist::save(self, path.as_ref())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        crate::persist::load(path.as_ref())
    }

    pub fn render_graph(&self, mode: crate::render::RenderMode) -> String {
        crate::render::render_graph(self, mode)
    }

    /// Debug-dumps each node's name and bit string indented by depth.
    pub fn dump<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        crate::render::dump(self, writer)
    }
}
