//! Hand-written CSV benchmark row writer for the CLI binary.
//!
//! No crate in this workspace's dependency tree already pulls in `csv`, and
//! the row shape here is fixed and small, so this writes the format
//! directly rather than adding a dependency for it.

use std::io::{self, Write};

use crate::kernel::KernelKind;
use crate::node::NodeVariant;

/// One row of a benchmark report: the configuration an operation ran under
/// plus its outcome.
#[derive(Clone, Debug)]
pub struct BenchRow {
    pub operation: String,
    pub variant: NodeVariant,
    pub kernel: KernelKind,
    pub n_sequences: usize,
    pub bloom_filter_length: usize,
    pub k: usize,
    pub hash_functions: usize,
    pub threshold: f64,
    pub elapsed_ms: f64,
    pub matches_found: usize,
}

fn variant_str(v: NodeVariant) -> &'static str {
    match v {
        NodeVariant::Base => "base",
        NodeVariant::Ssbt => "ssbt",
        NodeVariant::HowDe => "howde",
    }
}

fn kernel_str(k: KernelKind) -> &'static str {
    match k {
        KernelKind::Hamming => "hamming",
        KernelKind::Cosine => "cosine",
        KernelKind::Jaccard => "jaccard",
        KernelKind::Manhattan => "manhattan",
        KernelKind::Euclidean => "euclidean",
        KernelKind::Dice => "dice",
        KernelKind::Tanimoto => "tanimoto",
    }
}

/// Escapes a field for CSV per RFC 4180: wraps in quotes and doubles any
/// embedded quote if the field contains a comma, quote, or newline.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

const HEADER: &str = "operation,variant,kernel,n_sequences,bloom_filter_length,k,hash_functions,threshold,elapsed_ms,matches_found";

pub fn write_report_csv<W: Write>(rows: &[BenchRow], mut out: W) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            csv_field(&row.operation),
            variant_str(row.variant),
            kernel_str(row.kernel),
            row.n_sequences,
            row.bloom_filter_length,
            row.k,
            row.hash_functions,
            row.threshold,
            row.elapsed_ms,
            row.matches_found,
        )?;
    }
    Ok(())
}
