//! Command-line interface: build a tree from a sequence file, query a saved
//! tree, or render one as Graphviz DOT.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use tracing::info;

use sbt_index::render::RenderMode;
use sbt_index::report::{write_report_csv, BenchRow};
use sbt_index::{KernelKind, NodeVariant, Sbt, SbtConfig};

#[derive(Parser)]
#[command(name = "sbt-index", version, about = "Approximate membership index over k-mer sets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a tree from a sequence file and save it.
    Build {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 4096)]
        bloom_filter_length: usize,
        #[arg(long, default_value_t = 20)]
        k: usize,
        #[arg(long, default_value_t = 1)]
        hash_functions: usize,
        #[arg(long, default_value_t = 0.8)]
        threshold: f64,
        #[arg(long, value_enum, default_value_t = VariantArg::Howde)]
        variant: VariantArg,
        #[arg(long, value_enum, default_value_t = KernelArg::Jaccard)]
        kernel: KernelArg,
        #[arg(long, default_value_t = 1.0)]
        hash_fraction: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = InsertMethodArg::Greedy)]
        insert_method: InsertMethodArg,
        /// Score clustering pairs over only their first N bits instead of
        /// the full filter. Ignored by `--insert-method greedy`.
        #[arg(long)]
        cluster_prefix_bits: Option<usize>,
    },
    /// Query a saved tree with every sequence in a file.
    Query {
        #[arg(long)]
        tree: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = QueryMethodArg::Normal)]
        method: QueryMethodArg,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Render a saved tree's topology as Graphviz DOT.
    Render {
        #[arg(long)]
        tree: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderModeArg::Names)]
        mode: RenderModeArg,
        #[arg(long)]
        output: PathBuf,
        /// Write a plain indented name/bit-string dump instead of DOT.
        #[arg(long, default_value_t = false)]
        dump: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantArg {
    Base,
    Ssbt,
    Howde,
}

impl From<VariantArg> for NodeVariant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Base => NodeVariant::Base,
            VariantArg::Ssbt => NodeVariant::Ssbt,
            VariantArg::Howde => NodeVariant::HowDe,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KernelArg {
    Hamming,
    Cosine,
    Jaccard,
    Manhattan,
    Euclidean,
    Dice,
    Tanimoto,
}

impl From<KernelArg> for KernelKind {
    fn from(value: KernelArg) -> Self {
        match value {
            KernelArg::Hamming => KernelKind::Hamming,
            KernelArg::Cosine => KernelKind::Cosine,
            KernelArg::Jaccard => KernelKind::Jaccard,
            KernelArg::Manhattan => KernelKind::Manhattan,
            KernelArg::Euclidean => KernelKind::Euclidean,
            KernelArg::Dice => KernelKind::Dice,
            KernelArg::Tanimoto => KernelKind::Tanimoto,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InsertMethodArg {
    Greedy,
    ClusterAllSome,
    ClusterLevelPairing,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum QueryMethodArg {
    Normal,
    Fast,
    Faster,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RenderModeArg {
    Names,
    Bits,
}

/// Reads `name<TAB>sequence` records, one per line, transparently
/// decompressing when `path` ends in `.gz`.
fn read_records(path: &Path) -> std::io::Result<Vec<(String, Vec<u8>)>> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(BufReader::new(flate2::read::GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, '\t');
        let name = parts.next().unwrap_or_default().to_string();
        let sequence = parts.next().unwrap_or_default().as_bytes().to_vec();
        out.push((name, sequence));
    }
    Ok(out)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            input,
            output,
            bloom_filter_length,
            k,
            hash_functions,
            threshold,
            variant,
            kernel,
            hash_fraction,
            seed,
            insert_method,
            cluster_prefix_bits,
        } => {
            let records = read_records(&input)?;
            let config = SbtConfig {
                bloom_filter_length,
                k,
                hash_functions,
                threshold,
                variant: variant.into(),
                kernel: kernel.into(),
                hash_fraction,
                seed,
            };
            let mut sbt = Sbt::new(config)?;
            match insert_method {
                InsertMethodArg::Greedy => {
                    for (name, sequence) in &records {
                        sbt.insert_sequence(name, sequence)?;
                    }
                }
                InsertMethodArg::ClusterAllSome => {
                    sbt.insert_cluster_sequences_all_some(&records, cluster_prefix_bits)?
                }
                InsertMethodArg::ClusterLevelPairing => {
                    sbt.insert_cluster_sequences_level_pairing(&records, cluster_prefix_bits)?
                }
            }
            sbt.save(&output)?;
            info!(sequences = records.len(), path = %output.display(), "built tree");
        }
        Command::Query { tree, input, method, report } => {
            let sbt = Sbt::load(&tree)?;
            let records = read_records(&input)?;
            let rows: Vec<BenchRow> = records
                .par_iter()
                .map(|(name, sequence)| {
                    let start = Instant::now();
                    let hits = match method {
                        QueryMethodArg::Normal => sbt.query_sequence(sequence),
                        QueryMethodArg::Fast => sbt.fast_query_sequence(sequence),
                        QueryMethodArg::Faster => sbt.faster_query_sequence(sequence),
                    };
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                    match &hits {
                        Ok(matches) => println!("{name}\t{}", matches.join(",")),
                        Err(e) => eprintln!("{name}: query failed: {e}"),
                    }
                    BenchRow {
                        operation: format!("query:{name}"),
                        variant: sbt.config().variant,
                        kernel: sbt.config().kernel,
                        n_sequences: sbt.leaf_count(),
                        bloom_filter_length: sbt.config().bloom_filter_length,
                        k: sbt.config().k,
                        hash_functions: sbt.config().hash_functions,
                        threshold: sbt.config().threshold,
                        elapsed_ms,
                        matches_found: hits.map(|m| m.len()).unwrap_or(0),
                    }
                })
                .collect();
            if let Some(report_path) = report {
                let file = BufWriter::new(File::create(report_path)?);
                write_report_csv(&rows, file)?;
            }
        }
        Command::Render { tree, mode, output, dump } => {
            let sbt = Sbt::load(&tree)?;
            if dump {
                let mut file = BufWriter::new(File::create(&output)?);
                sbt.dump(&mut file)?;
            } else {
                let mode = match mode {
                    RenderModeArg::Names => RenderMode::Names,
                    RenderModeArg::Bits => RenderMode::Bits,
                };
                std::fs::write(&output, sbt.render_graph(mode))?;
            }
        }
    }
    Ok(())
}
