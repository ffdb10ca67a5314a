//! Python binding layer, gated behind the `python` feature.
//!
//! Exposes stateless functions that build, query, and render trees by path,
//! rather than a persistent Python-side object, so the tree's on-disk save
//! file is always the single source of truth between calls.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::node::NodeVariant;
use crate::render::RenderMode;
use crate::{KernelKind, Sbt, SbtConfig, SbtError};

fn to_py_err(err: SbtError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn variant_from_str(s: &str) -> PyResult<NodeVariant> {
    match s {
        "base" => Ok(NodeVariant::Base),
        "ssbt" => Ok(NodeVariant::Ssbt),
        "howde" => Ok(NodeVariant::HowDe),
        other => Err(PyValueError::new_err(format!("unknown variant '{other}', expected base/ssbt/howde"))),
    }
}

fn kernel_from_str(s: &str) -> PyResult<KernelKind> {
    match s {
        "hamming" => Ok(KernelKind::Hamming),
        "cosine" => Ok(KernelKind::Cosine),
        "jaccard" => Ok(KernelKind::Jaccard),
        "manhattan" => Ok(KernelKind::Manhattan),
        "euclidean" => Ok(KernelKind::Euclidean),
        "dice" => Ok(KernelKind::Dice),
        "tanimoto" => Ok(KernelKind::Tanimoto),
        other => Err(PyValueError::new_err(format!("unknown kernel '{other}'"))),
    }
}

/// Build a tree from `(name, sequence)` pairs and save it to `output_path`.
///
/// Args:
///     sequences: List of (name, sequence) pairs to insert, in order.
///     bloom_filter_length: Number of bits per filter.
///     k: K-mer length.
///     hash_functions: Number of hash functions (must be 1 for ssbt/howde).
///     threshold: Fraction of k-mers that must match for a query hit.
///     variant: One of "base", "ssbt", "howde".
///     kernel: Similarity kernel used for greedy insertion placement.
///     hash_fraction: Per-k-mer sampling probability (1.0 keeps every k-mer).
///     seed: Seed for the hash family and the tie-breaking RNG.
///     cluster: One of "greedy" (default), "all_some", "level_pairing".
///     cluster_prefix_bits: If set, clustering scores pairs over only this
///         many leading bits of each representative filter. Ignored by the
///         "greedy" cluster method.
///     output_path: Where to save the built tree.
///
/// Returns:
///     The number of leaves inserted.
///
/// Raises:
///     ValueError: If the configuration is invalid or insertion fails.
#[pyfunction]
#[pyo3(signature = (
    sequences, bloom_filter_length, k, hash_functions, threshold, variant, kernel,
    hash_fraction=1.0, seed=0, cluster="greedy", cluster_prefix_bits=None, output_path="tree.sbt"
))]
#[allow(clippy::too_many_arguments)]
fn build_tree(
    sequences: Vec<(String, String)>,
    bloom_filter_length: usize,
    k: usize,
    hash_functions: usize,
    threshold: f64,
    variant: &str,
    kernel: &str,
    hash_fraction: f64,
    seed: u64,
    cluster: &str,
    cluster_prefix_bits: Option<usize>,
    output_path: &str,
) -> PyResult<usize> {
    let config = SbtConfig {
        bloom_filter_length,
        k,
        hash_functions,
        threshold,
        variant: variant_from_str(variant)?,
        kernel: kernel_from_str(kernel)?,
        hash_fraction,
        seed,
    };
    let mut sbt = Sbt::new(config).map_err(to_py_err)?;
    let records: Vec<(String, Vec<u8>)> =
        sequences.into_iter().map(|(name, seq)| (name, seq.into_bytes())).collect();
    match cluster {
        "greedy" => {
            for (name, seq) in &records {
                sbt.insert_sequence(name, seq).map_err(to_py_err)?;
            }
        }
        "all_some" => {
            sbt.insert_cluster_sequences_all_some(&records, cluster_prefix_bits).map_err(to_py_err)?
        }
        "level_pairing" => {
            sbt.insert_cluster_sequences_level_pairing(&records, cluster_prefix_bits).map_err(to_py_err)?
        }
        other => return Err(PyValueError::new_err(format!("unknown cluster method '{other}'"))),
    }
    sbt.save(output_path).map_err(to_py_err)?;
    Ok(sbt.leaf_count())
}

/// Query a saved tree for a sequence's matching leaf names.
///
/// Args:
///     tree_path: Path to a tree saved by `build_tree`.
///     sequence: The query sequence.
///     method: One of "normal" (default), "fast", "faster".
///
/// Returns:
///     The names of every leaf whose k-mer overlap meets the tree's
///     configured threshold.
///
/// Raises:
///     ValueError: If the tree cannot be loaded, is empty, or `method` is
///     "fast"/"faster" on a tree with more than one hash function.
#[pyfunction]
#[pyo3(signature = (tree_path, sequence, method="normal"))]
fn query_tree(tree_path: &str, sequence: &str, method: &str) -> PyResult<Vec<String>> {
    let sbt = Sbt::load(tree_path).map_err(to_py_err)?;
    let sequence = sequence.as_bytes();
    match method {
        "normal" => sbt.query_sequence(sequence).map_err(to_py_err),
        "fast" => sbt.fast_query_sequence(sequence).map_err(to_py_err),
        "faster" => sbt.faster_query_sequence(sequence).map_err(to_py_err),
        other => Err(PyValueError::new_err(format!("unknown query method '{other}'"))),
    }
}

/// Render a saved tree's topology as Graphviz DOT source.
///
/// Args:
///     tree_path: Path to a tree saved by `build_tree`.
///     bits: If true, label nodes with their filter's bit string instead of
///     their leaf name.
#[pyfunction]
#[pyo3(signature = (tree_path, bits=false))]
fn render_tree(tree_path: &str, bits: bool) -> PyResult<String> {
    let sbt = Sbt::load(tree_path).map_err(to_py_err)?;
    let mode = if bits { RenderMode::Bits } else { RenderMode::Names };
    Ok(sbt.render_graph(mode))
}

/// Python module definition
#[pymodule]
fn sbt_index(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(build_tree, m)?)?;
    m.add_function(wrap_pyfunction!(query_tree, m)?)?;
    m.add_function(wrap_pyfunction!(render_tree, m)?)?;
    Ok(())
}
