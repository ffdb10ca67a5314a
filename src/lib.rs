//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `error`: the crate's single error type, `SbtError`.
//! - `rng`: seeded RNG used for kernel tie-breaking during insertion.
//! - `bitfilter`: compact fixed-length bitset, the storage primitive for every node filter.
//! - `hash`: deterministic, seedable hash functions used to map k-mers to filter bit positions.
//! - `kmer`: k-mer extraction (with optional probabilistic sampling).
//! - `kernel`: similarity kernels used both for greedy descent and agglomerative clustering.
//! - `node`: the three node filter variants (Base, SSBT, HowDe) and the shared traversal skeleton.
//! - `sbt`: the tree container — insertion, clustering bulk-builders, and querying.
//! - `query`: pure sequence -> (k-mers | indices, threshold) conversion.
//! - `persist`: binary save/load format.
//! - `render`: Graphviz DOT rendering.
//! - `report`: CSV benchmark row writer (external-facing, CLI only).
//! - `api`: Python bindings via `pyo3` (gated behind the "python" feature).
//!
//! Public API kept stable by re-exporting key items from the new modules.

pub mod error;
pub mod rng;
pub mod bitfilter;
pub mod hash;
pub mod kmer;
pub mod kernel;
pub mod node;
pub mod sbt;
pub mod query;
pub mod persist;
pub mod render;
pub mod report;

#[cfg(feature = "python")]
pub mod api;

pub use error::SbtError;
pub use bitfilter::BitFilter;
pub use kernel::KernelKind;
pub use node::NodeVariant;
pub use sbt::{Sbt, SbtConfig};
