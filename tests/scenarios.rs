//! Integration tests exercising full build/insert/query/clustering paths
//! through the public API only.

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sbt_index::kernel::KernelKind;
use sbt_index::node::{Filters, Node, NodeVariant};
use sbt_index::{Sbt, SbtConfig};

fn config(variant: NodeVariant, hash_functions: usize, k: usize, threshold: f64, m: usize) -> SbtConfig {
    SbtConfig {
        bloom_filter_length: m,
        k,
        hash_functions,
        threshold,
        variant,
        kernel: KernelKind::Jaccard,
        hash_fraction: 1.0,
        seed: 11,
    }
}

fn random_sequence(rng: &mut ChaCha8Rng, len: usize) -> Vec<u8> {
    const ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];
    (0..len).map(|_| ALPHABET[rng.gen_range(0..4)]).collect()
}

fn bf_with_bits(bits: &[usize], len: usize) -> sbt_index::BitFilter {
    let mut bf = sbt_index::BitFilter::zeros(len);
    for &b in bits {
        bf.set(b);
    }
    bf
}

/// Scenario 1: a hand-built 5-leaf Base tree's root union filter is exactly
/// the OR of all five leaf filters.
#[test]
fn scenario_manual_five_leaf_union() {
    let a = Box::new(Node::new_leaf(1, "a".into(), NodeVariant::Base, bf_with_bits(&[0, 1], 8)));
    let b = Box::new(Node::new_leaf(2, "b".into(), NodeVariant::Base, bf_with_bits(&[1, 2], 8)));
    let c = Box::new(Node::new_leaf(3, "c".into(), NodeVariant::Base, bf_with_bits(&[4], 8)));
    let d = Box::new(Node::new_leaf(4, "d".into(), NodeVariant::Base, bf_with_bits(&[5], 8)));
    let e = Box::new(Node::new_leaf(5, "e".into(), NodeVariant::Base, bf_with_bits(&[6, 7], 8)));

    let ab = Box::new(Node::from_children(6, a, b));
    let abc = Box::new(Node::from_children(7, ab, c));
    let de = Box::new(Node::from_children(8, d, e));
    let root = Node::from_children(9, abc, de);

    let Filters::Base { bf } = &root.filters else { panic!("expected Base filters") };
    assert_eq!(bf.to_bit_string(), "11101111");

    let mut names = root.leaf_names();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
}

/// Scenario 2: an exactly-inserted sequence is recalled at threshold 1.0,
/// and an unrelated sequence is not.
#[test]
fn scenario_exact_recall_at_full_threshold() {
    let mut sbt = Sbt::new(config(NodeVariant::HowDe, 1, 3, 1.0, 64)).unwrap();
    sbt.insert_sequence("ref", b"ACGTACGTACGT").unwrap();

    let hits = sbt.query_sequence(b"ACGTACGTACGT").unwrap();
    assert_eq!(hits, vec!["ref".to_string()]);

    let no_hits = sbt.query_sequence(b"TTTTTTTTTTTT").unwrap();
    assert!(no_hits.is_empty());
}

/// Scenario 3: a 60%-overlapping query passes at threshold 0.5 but fails at
/// threshold 1.0.
#[test]
fn scenario_partial_match_respects_threshold() {
    let reference: &[u8] = b"AAAACCCCGGGG";
    let query: &[u8] = b"AAAACCCCTTTT";

    let mut lenient = Sbt::new(config(NodeVariant::Base, 1, 3, 0.5, 256)).unwrap();
    lenient.insert_sequence("ref", reference).unwrap();
    assert_eq!(lenient.query_sequence(query).unwrap(), vec!["ref".to_string()]);

    let mut strict = Sbt::new(config(NodeVariant::Base, 1, 3, 1.0, 256)).unwrap();
    strict.insert_sequence("ref", reference).unwrap();
    assert!(strict.query_sequence(query).unwrap().is_empty());
}

/// Scenario 4: disjoint single-kmer sequences never cross-match each other,
/// exercising the pruning path across a tree with real internal nodes.
#[test]
fn scenario_disjoint_sequences_never_cross_match() {
    let mut sbt = Sbt::new(config(NodeVariant::HowDe, 1, 3, 0.9, 512)).unwrap();
    let names: Vec<String> = (0u8..8).map(|i| format!("seq{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        let byte = b'a' + i as u8;
        let sequence = vec![byte; 12];
        sbt.insert_sequence(name, &sequence).unwrap();
    }
    for (i, name) in names.iter().enumerate() {
        let byte = b'a' + i as u8;
        let sequence = vec![byte; 12];
        let hits = sbt.query_sequence(&sequence).unwrap();
        assert_eq!(hits, vec![name.clone()], "sequence {i} should only recall itself");
    }
}

/// Scenario 5 / property P7: Base, SSBT, and HowDe built from the same
/// insertion order agree on every query's match set.
#[test]
fn scenario_variant_equivalence() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let sequences: Vec<(String, Vec<u8>)> = (0..20)
        .map(|i| (format!("s{i}"), random_sequence(&mut rng, 40)))
        .collect();
    let queries: Vec<Vec<u8>> = (0..50).map(|_| random_sequence(&mut rng, 40)).collect();

    let mut base = Sbt::new(config(NodeVariant::Base, 2, 6, 0.6, 2048)).unwrap();
    let mut ssbt = Sbt::new(config(NodeVariant::Ssbt, 1, 6, 0.6, 2048)).unwrap();
    let mut howde = Sbt::new(config(NodeVariant::HowDe, 1, 6, 0.6, 2048)).unwrap();
    for (name, seq) in &sequences {
        base.insert_sequence(name, seq).unwrap();
    }
    for (name, seq) in &sequences {
        ssbt.insert_sequence(name, seq).unwrap();
    }
    for (name, seq) in &sequences {
        howde.insert_sequence(name, seq).unwrap();
    }

    for query in &queries {
        let mut b = base.query_sequence(query).unwrap();
        let mut s = ssbt.query_sequence(query).unwrap();
        let mut h = howde.query_sequence(query).unwrap();
        b.sort();
        s.sort();
        h.sort();
        assert_eq!(b, h, "base and howde disagreed on a query");
        // SSBT is restricted to a single hash function; Base here uses two,
        // so compare SSBT only against a single-hash Base run for parity.
        let _ = &s;
    }
}

/// Scenario 5b: with matching single-hash-function configuration, Base and
/// SSBT also agree exactly.
#[test]
fn scenario_variant_equivalence_single_hash() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let sequences: Vec<(String, Vec<u8>)> = (0..20)
        .map(|i| (format!("s{i}"), random_sequence(&mut rng, 40)))
        .collect();
    let queries: Vec<Vec<u8>> = (0..50).map(|_| random_sequence(&mut rng, 40)).collect();

    let mut base = Sbt::new(config(NodeVariant::Base, 1, 6, 0.6, 2048)).unwrap();
    let mut ssbt = Sbt::new(config(NodeVariant::Ssbt, 1, 6, 0.6, 2048)).unwrap();
    let mut howde = Sbt::new(config(NodeVariant::HowDe, 1, 6, 0.6, 2048)).unwrap();
    for (name, seq) in &sequences {
        base.insert_sequence(name, seq).unwrap();
        ssbt.insert_sequence(name, seq).unwrap();
        howde.insert_sequence(name, seq).unwrap();
    }

    for query in &queries {
        let mut b = base.query_sequence(query).unwrap();
        let mut s = ssbt.query_sequence(query).unwrap();
        let mut h = howde.query_sequence(query).unwrap();
        b.sort();
        s.sort();
        h.sort();
        assert_eq!(b, s);
        assert_eq!(b, h);
    }
}

/// Scenario 6 / property P8: fast queries always agree with normal queries,
/// since per-position weighting and per-k-mer enumeration are mathematically
/// interchangeable — `classify` only depends on a position's value, never on
/// which k-mer instance produced it.
#[test]
fn scenario_fast_agrees_with_normal() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let sequences: Vec<(String, Vec<u8>)> = (0..15)
        .map(|i| (format!("t{i}"), random_sequence(&mut rng, 50)))
        .collect();
    let queries: Vec<Vec<u8>> = (0..100).map(|_| random_sequence(&mut rng, 50)).collect();

    let mut sbt = Sbt::new(config(NodeVariant::HowDe, 1, 8, 0.4, 4096)).unwrap();
    for (name, seq) in &sequences {
        sbt.insert_sequence(name, seq).unwrap();
    }

    for query in &queries {
        let mut normal = sbt.query_sequence(query).unwrap();
        let mut fast = sbt.fast_query_sequence(query).unwrap();
        normal.sort();
        fast.sort();
        assert_eq!(normal, fast);
    }
}

/// Faster queries agree with normal queries when a query's k-mers all hash
/// to distinct positions, since `faster_units` only diverges from
/// `normal_units` by collapsing repeated positions down to weight 1.
#[test]
fn scenario_faster_agrees_with_normal_when_positions_are_distinct() {
    use sbt_index::hash::HashFamily;
    use sbt_index::kmer::extract_kmers;
    use std::collections::HashSet;

    let mut sbt = Sbt::new(config(NodeVariant::HowDe, 1, 8, 0.4, 4096)).unwrap();
    sbt.insert_sequence("t0", b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTAC").unwrap();
    sbt.insert_sequence("t1", b"TTTTGGGGCCCCAAAATTTTGGGGCCCCAAAATTTTGGGGCCCCAAAATT").unwrap();

    let k = sbt.config().k;
    let modulus = sbt.config().bloom_filter_length;
    let seed = sbt.config().seed;
    // Reproduce the tree's actual single hash function the same way
    // `Sbt::new` derives it, so "distinct positions" matches what the tree
    // itself will see.
    let family = HashFamily::new(seed, 1);
    let hash = family.iter().next().unwrap();

    // Search for a query whose k-mers all hash to distinct positions, so
    // faster_units' dedup step never actually collapses anything.
    let mut rng = ChaCha8Rng::seed_from_u64(123);
    let query = loop {
        let candidate = random_sequence(&mut rng, 50);
        let mut seen = HashSet::new();
        let distinct = extract_kmers(&candidate, k)
            .into_iter()
            .all(|kmer| seen.insert(hash.hash_index(kmer, modulus)));
        if distinct {
            break candidate;
        }
    };

    let mut normal = sbt.query_sequence(&query).unwrap();
    let mut faster = sbt.faster_query_sequence(&query).unwrap();
    normal.sort();
    faster.sort();
    assert_eq!(normal, faster);
}

/// A query with a repeated k-mer can make faster undercount relative to
/// normal: normal counts every occurrence, faster counts each distinct
/// position once. Both remain well-defined, non-panicking query results.
#[test]
fn scenario_faster_may_diverge_from_normal_on_repeated_kmers() {
    let mut sbt = Sbt::new(config(NodeVariant::HowDe, 1, 4, 0.9, 512)).unwrap();
    sbt.insert_sequence("rep", b"AAAACCCCGGGGTTTT").unwrap();

    // "AAAAAAAA" is eight A's: the 4-mer "AAAA" repeats five times.
    let query: &[u8] = b"AAAAAAAA";
    let normal = sbt.query_sequence(query).unwrap();
    let faster = sbt.faster_query_sequence(query).unwrap();
    // Both calls must succeed and return a result; they are not required to
    // agree once a query's k-mers collapse onto repeated positions.
    let _ = (normal, faster);
}

/// Property P9: clustering bulk-builders insert the same leaf set as
/// sequential greedy insertion, regardless of merge strategy.
#[test]
fn clustering_methods_match_greedy_leaf_set() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let sequences: Vec<(String, Vec<u8>)> = (0..12)
        .map(|i| (format!("c{i}"), random_sequence(&mut rng, 30)))
        .collect();

    let mut greedy = Sbt::new(config(NodeVariant::Base, 1, 5, 0.5, 1024)).unwrap();
    for (name, seq) in &sequences {
        greedy.insert_sequence(name, seq).unwrap();
    }

    let mut all_some = Sbt::new(config(NodeVariant::Base, 1, 5, 0.5, 1024)).unwrap();
    all_some.insert_cluster_sequences_all_some(&sequences, None).unwrap();

    let mut level_pairing = Sbt::new(config(NodeVariant::Base, 1, 5, 0.5, 1024)).unwrap();
    level_pairing.insert_cluster_sequences_level_pairing(&sequences, None).unwrap();

    let mut expected: Vec<&str> = sequences.iter().map(|(n, _)| n.as_str()).collect();
    expected.sort();

    for sbt in [&greedy, &all_some, &level_pairing] {
        let mut leaves = sbt.root().unwrap().leaf_names();
        leaves.sort();
        assert_eq!(leaves, expected);
    }
}

/// Saving and reloading a tree preserves its query behavior exactly.
#[test]
fn save_and_load_round_trip_preserves_queries() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("sbt-index-scenario-persist-{}.sbt", std::process::id()));

    let mut sbt = Sbt::new(config(NodeVariant::Ssbt, 1, 4, 0.7, 1024)).unwrap();
    sbt.insert_sequence("p", b"ACGTACGTACGTACGT").unwrap();
    sbt.insert_sequence("q", b"GGGGCCCCAAAATTTT").unwrap();
    let before = sbt.query_sequence(b"ACGTACGTACGTACGT").unwrap();
    sbt.save(&path).unwrap();

    let loaded = Sbt::load(&path).unwrap();
    let after = loaded.query_sequence(b"ACGTACGTACGTACGT").unwrap();
    assert_eq!(before, after);

    std::fs::remove_file(&path).ok();
}
