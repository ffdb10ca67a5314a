//! Node filter variants and the tree's structural/traversal primitives.
//!
//! Three filter layouts trade off storage against how much a query can
//! decide at a single node without recursing further:
//!
//! - [`Filters::Base`]: one union filter per node. An unset bit proves a
//!   k-mer is absent from the whole subtree; a set bit proves nothing by
//!   itself, so queries must keep recursing to confirm a hit.
//! - [`Filters::Ssbt`]: a `sim` filter (bits common to every leaf below) lets
//!   a query stop early with a confirmed hit, plus an optional `rem` filter
//!   for the bits that still differ somewhere in the subtree.
//! - [`Filters::HowDe`]: a `how` union filter (same role as Base's `bf`)
//!   alongside a `det` filter of bits determined present in every leaf
//!   below, giving the same early-hit shortcut as SSBT's `sim`.

use crate::bitfilter::{self, BitFilter};
use crate::kernel::KernelKind;
use crate::rng::SbtRng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeVariant {
    Base,
    Ssbt,
    HowDe,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Filters {
    Base { bf: BitFilter },
    Ssbt { sim: BitFilter, rem: Option<BitFilter> },
    HowDe { how: BitFilter, det: Option<BitFilter> },
}

impl Filters {
    pub fn variant(&self) -> NodeVariant {
        match self {
            Filters::Base { .. } => NodeVariant::Base,
            Filters::Ssbt { .. } => NodeVariant::Ssbt,
            Filters::HowDe { .. } => NodeVariant::HowDe,
        }
    }

    fn len(&self) -> usize {
        match self {
            Filters::Base { bf } => bf.len(),
            Filters::Ssbt { sim, .. } => sim.len(),
            Filters::HowDe { how, .. } => how.len(),
        }
    }

    /// The filter to compare against when scoring a candidate insertion
    /// point: `bf` for Base, `sim` for SSBT, `how` for HowDe.
    pub fn representative(&self) -> &BitFilter {
        match self {
            Filters::Base { bf } => bf,
            Filters::Ssbt { sim, .. } => sim,
            Filters::HowDe { how, .. } => how,
        }
    }
}

/// Outcome of checking one k-mer's hash position(s) against a single node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Classification {
    /// The k-mer is guaranteed present somewhere required by this node;
    /// no further recursion is needed to count it as a match.
    Hit,
    /// The k-mer is guaranteed absent from the entire subtree rooted here.
    Miss,
    /// Neither provable from this node alone; recurse into both children.
    Partial,
}

/// Monotonic node-id counter, one per tree. Kept per-tree (rather than as a
/// process-wide static) so two trees built in the same process never share
/// ids and a loaded tree can resume counting from its saved high-water mark.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGen(u64);

impl IdGen {
    pub fn new() -> Self {
        IdGen(0)
    }

    pub fn resume_after(last: u64) -> Self {
        IdGen(last)
    }

    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn peek(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    /// `Some(name)` for leaves (one per inserted experiment), `None` for
    /// internal nodes.
    pub name: Option<String>,
    pub filters: Filters,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
}

impl Node {
    pub fn new_leaf(id: u64, name: String, variant: NodeVariant, bf: BitFilter) -> Node {
        let filters = match variant {
            NodeVariant::Base => Filters::Base { bf },
            NodeVariant::Ssbt => Filters::Ssbt { sim: bf, rem: None },
            NodeVariant::HowDe => Filters::HowDe { how: bf, det: None },
        };
        Node { id, name: Some(name), filters, left: None, right: None }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn iter_children(&self) -> (Option<&Node>, Option<&Node>) {
        (self.left.as_deref(), self.right.as_deref())
    }

    /// Collects the names of every leaf in this subtree, in left-to-right
    /// order.
    pub fn leaf_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaf_names(&mut out);
        out
    }

    fn collect_leaf_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.is_leaf() {
            if let Some(name) = &self.name {
                out.push(name.as_str());
            }
            return;
        }
        if let Some(left) = &self.left {
            left.collect_leaf_names(out);
        }
        if let Some(right) = &self.right {
            right.collect_leaf_names(out);
        }
    }

    /// Classifies one k-mer's hash position(s) against this single node.
    /// `positions` holds the query's `H` hash positions for this k-mer; only
    /// Base supports `H > 1` (requiring every position set), SSBT and HowDe
    /// are restricted to a single hash function by construction.
    pub fn classify(&self, positions: &[usize]) -> Classification {
        match &self.filters {
            Filters::Base { bf } => {
                let all_set = positions.iter().all(|&p| bf.test(p));
                if self.is_leaf() {
                    if all_set { Classification::Hit } else { Classification::Miss }
                } else if all_set {
                    Classification::Partial
                } else {
                    Classification::Miss
                }
            }
            Filters::Ssbt { sim, rem } => {
                let pos = positions[0];
                if self.is_leaf() {
                    return if sim.test(pos) { Classification::Hit } else { Classification::Miss };
                }
                if sim.test(pos) {
                    Classification::Hit
                } else if rem.as_ref().is_some_and(|r| r.test(pos)) {
                    Classification::Partial
                } else {
                    Classification::Miss
                }
            }
            Filters::HowDe { how, det } => {
                let pos = positions[0];
                if self.is_leaf() {
                    return if how.test(pos) { Classification::Hit } else { Classification::Miss };
                }
                if det.as_ref().is_some_and(|d| d.test(pos)) {
                    Classification::Hit
                } else if how.test(pos) {
                    Classification::Partial
                } else {
                    Classification::Miss
                }
            }
        }
    }

    /// Combines two freshly-built (or freshly-recursed-into) children into
    /// their parent's filters, per the node variant shared by both. Panics
    /// if the children's variants disagree, which would indicate a tree
    /// built with mismatched node kinds, a programmer error.
    pub fn from_children(id: u64, mut left: Box<Node>, mut right: Box<Node>) -> Node {
        let filters = match (&mut left.filters, &mut right.filters) {
            (Filters::Base { bf: lb }, Filters::Base { bf: rb }) => {
                Filters::Base { bf: bitfilter::or(lb, rb) }
            }
            (Filters::Ssbt { sim: lsim, rem: lrem }, Filters::Ssbt { sim: rsim, rem: rrem }) => {
                let common = bitfilter::and(lsim, rsim);
                let not_common = common.not();
                lsim.and_(&not_common);
                if let Some(r) = lrem.as_mut() {
                    r.and_(&not_common);
                }
                rsim.and_(&not_common);
                if let Some(r) = rrem.as_mut() {
                    r.and_(&not_common);
                }
                let mut rem_acc = BitFilter::zeros(common.len());
                let mut has_rem = false;
                if let Some(r) = lrem {
                    rem_acc.or_(r);
                    has_rem = true;
                }
                if let Some(r) = rrem {
                    rem_acc.or_(r);
                    has_rem = true;
                }
                rem_acc.or_(lsim);
                rem_acc.or_(rsim);
                has_rem = has_rem || lsim.popcount() > 0 || rsim.popcount() > 0;
                Filters::Ssbt { sim: common, rem: if has_rem { Some(rem_acc) } else { None } }
            }
            (Filters::HowDe { how: lhow, det: ldet }, Filters::HowDe { how: rhow, det: rdet }) => {
                let how = bitfilter::or(lhow, rhow);
                let l_effective = ldet.clone().unwrap_or_else(|| lhow.clone());
                let r_effective = rdet.clone().unwrap_or_else(|| rhow.clone());
                let det = bitfilter::and(&l_effective, &r_effective);
                let det = if det.popcount() > 0 { Some(det) } else { None };
                Filters::HowDe { how, det }
            }
            _ => unreachable!("a tree's nodes all share one variant by construction"),
        };
        Node { id, name: None, filters, left: Some(left), right: Some(right) }
    }

    /// Restores a child's `sim` bits that an earlier `from_children` fold
    /// cleared out because the parent now held them instead. Re-inserting
    /// under this child rebuilds its subtree from scratch via
    /// `from_children`, which would otherwise silently discard those bits:
    /// they live only in `parent`, not in the child or any of its
    /// descendants. `rem` needs no such restoration since it is always
    /// re-derived at fold time from the children's own remaining state.
    /// A no-op for variants without a `sim`/`rem` split.
    fn push_down_sim(parent: &Filters, child: &mut Filters) {
        if let (Filters::Ssbt { sim: psim, .. }, Filters::Ssbt { sim: csim, .. }) = (parent, child) {
            csim.or_(psim);
        }
    }

    /// Greedily descends to the most-similar leaf and promotes it with
    /// `new_leaf` under a fresh internal node, recombining filters on the
    /// way back up. Mutates in place: only the path from root to the chosen
    /// leaf changes.
    pub fn insert_experiment(
        node: Box<Node>,
        new_leaf: Box<Node>,
        kernel: KernelKind,
        rng: &mut SbtRng,
        ids: &mut IdGen,
    ) -> Box<Node> {
        if node.is_leaf() {
            let id = ids.next();
            return Box::new(Node::from_children(id, node, new_leaf));
        }
        let mut node = node;
        let mut left_child = node.left.take().expect("internal node missing left child");
        let mut right_child = node.right.take().expect("internal node missing right child");
        Self::push_down_sim(&node.filters, &mut left_child.filters);
        Self::push_down_sim(&node.filters, &mut right_child.filters);
        let new_rep = new_leaf.filters.representative();
        let left_score = kernel.score(left_child.filters.representative(), new_rep, Some(rng));
        let right_score = kernel.score(right_child.filters.representative(), new_rep, Some(rng));
        let (new_left, new_right) = if left_score >= right_score {
            (Node::insert_experiment(left_child, new_leaf, kernel, rng, ids), right_child)
        } else {
            (left_child, Node::insert_experiment(right_child, new_leaf, kernel, rng, ids))
        };
        Box::new(Node::from_children(node.id, new_left, new_right))
    }

    pub fn filter_len(&self) -> usize {
        self.filters.len()
    }
}
