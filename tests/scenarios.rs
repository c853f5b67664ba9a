//! Concrete end-to-end scenarios from `spec.md` §8 (E1-E6), each built with
//! K = 5, the DNA alphabet, a forward hasher, and an exact `HashSet` store
//! exactly as the spec's worked examples stipulate.

use std::sync::Arc;

use cdbg_stream::alphabet::Dna;
use cdbg_stream::cdbg::NodeMeta;
use cdbg_stream::compactor::Compactor;
use cdbg_stream::dbg::Dbg;
use cdbg_stream::filters::DiginormFilter;
use cdbg_stream::hashing::cyclic::CyclicHasher;
use cdbg_stream::storage::hashsetstore::HashSetStore;

const K: usize = 5;

fn compactor() -> Compactor<CyclicHasher<Dna>> {
    let dbg = Dbg::new(Arc::new(HashSetStore::new()), K, Dna::SYMBOLS.to_vec());
    Compactor::new(dbg)
}

/// E1 — Single linear read: one ISLAND unitig, no decision nodes.
///
/// "ACGTACGTAC" is itself a 4-periodic repeat at K=5 (its 5th and 6th 5-mers
/// re-occur the 1st and 2nd), so the segmenter's per-read novelty rule (a
/// k-mer already seen earlier in *this* read classifies OLD, same as one
/// already in the store) closes the novel run at the first repeat. The
/// installed island is the prefix up to there, not the full literal read.
#[test]
fn e1_single_linear_read() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();

    assert_eq!(c.cdbg().n_unodes(), 1);
    let report = c.report();
    assert_eq!(report.n_islands, 1);
    assert_eq!(report.n_dnodes, 0);

    let node = c.cdbg().get_unode(cdbg_stream::cdbg::UnitigId(0)).unwrap();
    assert_eq!(node.sequence, "ACGTACGT");
    assert_eq!(node.meta, NodeMeta::Island);
}

/// E2 — Extending an existing island grows the same unitig in place.
#[test]
fn e2_extending_an_existing_island() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();
    c.insert_sequence(b"CGTACGTACA").unwrap();

    assert_eq!(c.cdbg().n_unodes(), 1);
    let report = c.report();
    assert_eq!(report.n_extends, 1);

    let node = c.cdbg().get_unode(cdbg_stream::cdbg::UnitigId(0)).unwrap();
    assert_eq!(node.sequence, "ACGTACGTACA");
    assert_eq!(node.meta, NodeMeta::Island);
}

/// E3 — A branch induces a decision node and splits the original unitig.
#[test]
fn e3_branch_induces_a_decision_node() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();
    c.insert_sequence(b"GTACGTAG").unwrap();

    let report = c.report();
    assert_eq!(report.n_dnodes, 1, "exactly one decision k-mer should be discovered");
    assert!(report.n_splits >= 1, "the original unitig must be split around the branch");
    assert_eq!(c.cdbg().n_unodes(), 3, "left piece + two right branches");
}

/// E4 — Two islands joined by a bridging read merge into one unitig.
#[test]
fn e4_merging_two_islands() {
    let c = compactor();
    c.insert_sequence(b"AAAAAT").unwrap();
    c.insert_sequence(b"ATTTTT").unwrap();
    assert_eq!(c.cdbg().n_unodes(), 2);

    c.insert_sequence(b"AAAATATTTT").unwrap();
    let report = c.report();
    assert_eq!(report.n_merges, 1);
    assert_eq!(c.cdbg().n_unodes(), 1);
}

/// E5a — A homopolymer read is period-1: its second k-mer position repeats
/// the first, so the segmenter's per-read novelty rule (same one that
/// truncates E1) closes the novel run after a single k-mer. One call can
/// never observe `left_flank`/`right_flank` on a fresh graph either (nothing
/// exists yet to be a unique neighbor of), so the one-call self-contained
/// CIRCULAR path in `install_segment` can't fire; the installed node is the
/// single repeated k-mer itself, classified TRIVIAL.
#[test]
fn e5a_homopolymer_read_collapses_to_a_trivial_kmer() {
    let c = compactor();
    c.insert_sequence(b"AAAAAAA").unwrap();

    let report = c.report();
    assert_eq!(report.n_trivial, 1);
    assert_eq!(c.cdbg().n_unodes(), 1);

    let node = c.cdbg().get_unode(cdbg_stream::cdbg::UnitigId(0)).unwrap();
    assert_eq!(node.sequence, "AAAAA");
    assert_eq!(node.left_end, node.right_end);
    assert_eq!(node.meta, NodeMeta::Trivial);
}

/// E5b — A self-overlapping read folds into a CIRCULAR unitig once a second
/// read closes the loop back onto an existing unitig's own two ends
/// (`spec.md` §4.5 MERGE_UNODES, `became_circular` case).
#[test]
fn e5b_bridging_reads_own_ends_closes_a_circular_unitig() {
    let c = compactor();
    c.insert_sequence(b"AAAAATTTTT").unwrap();
    assert_eq!(c.cdbg().n_unodes(), 1);

    c.insert_sequence(b"TTTTTAAAAA").unwrap();
    let report = c.report();
    assert_eq!(report.n_circular_merges, 1);
    assert_eq!(c.cdbg().n_unodes(), 1);

    let node = c.cdbg().get_unode(cdbg_stream::cdbg::UnitigId(0)).unwrap();
    assert_eq!(node.left_end, node.right_end);
    assert_eq!(node.meta, NodeMeta::Circular);
}

/// E6 — Diginorm gating: repeated insertion of the same read eventually
/// saturates the counting graph and gets filtered out.
#[test]
fn e6_diginorm_gating() {
    // HashSet only ever reports 0/1; a counting store is needed to see the
    // cutoff = 2 threshold actually bite, per §4.7's "auxiliary counting dBG".
    let counts = Dbg::new(
        Arc::new(cdbg_stream::storage::hashmapstore::HashMapStore::new()),
        K,
        Dna::SYMBOLS.to_vec(),
    );
    let filter = DiginormFilter::new(counts, 2);
    let read: &[u8] = b"AAAAATTTTTGGGGGCCCCCA";

    let first = filter.filter(read).unwrap();
    assert!(first.accepted, "first pass: counting graph starts empty");

    let second = filter.filter(read).unwrap();
    assert!(second.accepted, "second pass: median count is 1, still < cutoff");

    let third = filter.filter(read).unwrap();
    assert!(!third.accepted, "third pass: median count has reached cutoff");
}
