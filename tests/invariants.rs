//! Cross-module invariant checks (`spec.md` §8, items 1-11) plus the
//! round-trip/involution laws, run against a forward `HashSet`-backed
//! compactor exactly as the spec's worked examples are framed.

use std::sync::Arc;

use cdbg_stream::alphabet::{Alphabet, Dna};
use cdbg_stream::cdbg::NodeMeta;
use cdbg_stream::compactor::Compactor;
use cdbg_stream::dbg::Dbg;
use cdbg_stream::hashing::cyclic::CyclicHasher;
use cdbg_stream::hashing::canonical::CanonicalHasher;
use cdbg_stream::hashing::{static_hash, HashShifter, NewWithK};
use cdbg_stream::storage::hashsetstore::HashSetStore;

const K: usize = 5;

fn compactor() -> Compactor<CyclicHasher<Dna>> {
    let dbg = Dbg::new(Arc::new(HashSetStore::new()), K, Dna::SYMBOLS.to_vec());
    Compactor::new(dbg)
}

/// Invariant 1: every inserted k-mer is present in the dBG afterward.
#[test]
fn invariant_1_every_kmer_is_present_after_insertion() {
    let c = compactor();
    let s = b"ACGTACGTACGTAC";
    c.insert_sequence(s).unwrap();
    for h in c.dbg().hashes_of(s).unwrap() {
        assert!(c.dbg().query(h) >= 1);
    }
}

/// Invariant 2: a unitig's stored ends are the hash of its first/last k-mer.
///
/// Enumerates via [`cdbg_stream::cdbg::CdbgStore::unodes`] rather than
/// `0..n_unodes()` — ids are monotonic with tombstoned gaps left by
/// splits/merges, so after any structural mutation the live count no longer
/// bounds the live id space.
#[test]
fn invariant_2_ends_match_sequence_boundaries() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTACGTAC").unwrap();
    let nodes = c.cdbg().unodes();
    assert!(!nodes.is_empty());
    for node in &nodes {
        let expect_left = static_hash::<CyclicHasher<Dna>>(&node.sequence.as_bytes()[..K], K).unwrap();
        let expect_right =
            static_hash::<CyclicHasher<Dna>>(&node.sequence.as_bytes()[node.sequence.len() - K..], K).unwrap();
        assert_eq!(node.left_end, expect_left);
        assert_eq!(node.right_end, expect_right);
    }
}

/// Invariant 4: every unitig's ends resolve back to it in `end_index`
/// (a circular unitig has left_end == right_end, a single map entry).
#[test]
fn invariant_4_end_index_resolves_back_to_owner() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTACGTAC").unwrap();
    let nodes = c.cdbg().unodes();
    assert!(!nodes.is_empty());
    for node in &nodes {
        assert_eq!(c.cdbg().find_by_end(node.left_end), Some(node.id));
        assert_eq!(c.cdbg().find_by_end(node.right_end), Some(node.id));
    }
}

/// Invariant 2 and the merge half of invariant 9, exercised over an actual
/// merge (`spec.md` §8 E4): two islands bridged by a third read must collapse
/// into one unitig whose sequence is the full left+bridge+right concatenation
/// with the k-1 overlaps trimmed, not the bridge segment alone.
#[test]
fn merged_unitig_carries_the_full_concatenated_sequence() {
    let dbg = Dbg::new(Arc::new(HashSetStore::new()), 5, Dna::SYMBOLS.to_vec());
    let c: Compactor<CyclicHasher<Dna>> = Compactor::new(dbg);
    c.insert_sequence(b"AAAAAT").unwrap();
    c.insert_sequence(b"ATTTTT").unwrap();
    c.insert_sequence(b"AAAATATTTT").unwrap();

    let nodes = c.cdbg().unodes();
    assert_eq!(nodes.len(), 1, "the bridge must merge the two islands into one unitig");
    let merged = &nodes[0];
    assert_eq!(merged.sequence, "AAAAATATTTTT");
    assert_eq!(merged.left_end, static_hash::<CyclicHasher<Dna>>(b"AAAAA", 5).unwrap());
    assert_eq!(merged.right_end, static_hash::<CyclicHasher<Dna>>(b"TTTTT", 5).unwrap());
    assert_eq!(c.cdbg().find_by_end(merged.left_end), Some(merged.id));
    assert_eq!(c.cdbg().find_by_end(merged.right_end), Some(merged.id));
}

/// Invariant 5: every decision node satisfies ldegree > 1 || rdegree > 1.
#[test]
fn invariant_5_decision_nodes_are_valid() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();
    c.insert_sequence(b"ACGTACGTAG").unwrap();
    // Walk every possible 5-mer over the inserted sequences' alphabet isn't
    // practical here; instead assert the closed-form invariant on whatever
    // decision nodes got built.
    for h in c.dbg().hashes_of(b"ACGTACGTAC").unwrap() {
        if let Some(dn) = c.cdbg().get_dnode(h) {
            assert!(dn.is_valid_decision());
        }
    }
}

/// Invariant 7 (round-trip law): under canonical hashing, inserting a
/// sequence and its reverse complement produce the same final multiset of
/// (meta, sequence-length) pairs.
#[test]
fn invariant_7_canonical_hash_is_strand_independent() {
    let make = |s: &[u8]| {
        let dbg = Dbg::new(Arc::new(HashSetStore::new()), K, Dna::SYMBOLS.to_vec());
        let c: Compactor<CanonicalHasher<Dna>> = Compactor::new(dbg);
        c.insert_sequence(s).unwrap();
        c.report()
    };
    let s = b"ACGTACGTACGTAC";
    let rc = Dna::reverse_complement(s).unwrap();
    let r1 = make(s);
    let r2 = make(&rc);
    assert_eq!(r1.n_unodes, r2.n_unodes);
    assert_eq!(r1.n_islands, r2.n_islands);
}

/// Invariant 8: idempotence under repeated insertion of the same read.
#[test]
fn invariant_8_repeated_insertion_is_idempotent() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTACGTAC").unwrap();
    let before = c.report();
    c.insert_sequence(b"ACGTACGTACGTAC").unwrap();
    let after = c.report();
    assert_eq!(before.n_unodes, after.n_unodes);
    assert_eq!(before.n_full, after.n_full);
    assert_eq!(before.n_islands, after.n_islands);
}

/// Invariant 10: the per-meta counters sum to the total unitig count.
#[test]
fn invariant_10_metrics_consistency() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();
    c.insert_sequence(b"AAAAATTTTT").unwrap();
    c.insert_sequence(b"AAAATATTTT").unwrap();
    let report = c.report();
    assert!(report.unode_count_is_consistent());
}

/// Invariant 11: every successful mutation increments n_updates.
#[test]
fn invariant_11_updates_counter_is_monotonic() {
    let c = compactor();
    let mut last = c.report().n_updates;
    for s in [&b"ACGTACGTAC"[..], &b"CGTACGTACA"[..], &b"AAAAATTTTT"[..]] {
        c.insert_sequence(s).unwrap();
        let now = c.report().n_updates;
        assert!(now >= last);
        last = now;
    }
}

/// Round-trip law: `hash_base(s)` matches rolling `shift_right` from the
/// first window.
#[test]
fn rolling_hash_restart_matches_incremental_shifts() {
    let s = b"ACGTACGTACGTAC";
    let mut rolling = CyclicHasher::<Dna>::new_with_k(K);
    rolling.hash_base(&s[0..K]).unwrap();
    for i in 0..(s.len() - K) {
        rolling.shift_right(s[i], s[i + K]);
        let fresh = static_hash::<CyclicHasher<Dna>>(&s[i + 1..i + 1 + K], K).unwrap();
        assert_eq!(rolling.value(), fresh);
    }
}

/// Round-trip law: canonical hashing is invariant under reverse complement.
#[test]
fn canonical_hash_involution_law() {
    let s = b"ACGTACGTA";
    let rc = Dna::reverse_complement(s).unwrap();
    let a = static_hash::<CanonicalHasher<Dna>>(s, s.len()).unwrap();
    let b = static_hash::<CanonicalHasher<Dna>>(&rc, rc.len()).unwrap();
    assert_eq!(a, b);
}

/// Invariant 3: every tag of every unitig resolves back to it in
/// `unitig_tag_map`.
#[test]
fn invariant_3_tag_index_resolves_back_to_owner() {
    let dbg = Dbg::new(Arc::new(HashSetStore::new()), K, Dna::SYMBOLS.to_vec());
    let c = Compactor::new(dbg).with_minimizer_window(2);
    c.insert_sequence(b"ACGTACGTACGTACGTACGTA").unwrap();
    let nodes = c.cdbg().unodes();
    assert!(!nodes.is_empty());
    for node in &nodes {
        for &tag in &node.tags {
            assert_eq!(c.cdbg().find_by_tag(tag), Some(node.id));
        }
    }
}

/// Invariant 6: no interior k-mer of a unitig is itself a decision-node key.
#[test]
fn invariant_6_interior_kmers_are_never_decision_nodes() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();
    c.insert_sequence(b"ACGTACGTAG").unwrap();
    let nodes = c.cdbg().unodes();
    assert!(!nodes.is_empty());
    for node in &nodes {
        let bytes = node.sequence.as_bytes();
        if bytes.len() <= K {
            continue;
        }
        for i in 1..(bytes.len() - K) {
            let h = static_hash::<CyclicHasher<Dna>>(&bytes[i..i + K], K).unwrap();
            assert!(
                c.cdbg().get_dnode(h).is_none(),
                "interior k-mer at offset {i} of unitig {} must not be a decision node",
                node.id.0
            );
        }
    }
}

/// Invariant 2 and 6 together, exercised over an actual split (`spec.md` §8
/// E3): a second read that branches off an existing unitig's interior must
/// carve a real DecisionNode out of it, leaving the two resulting unitig
/// fragments with correct, non-overlapping sequences/ends rather than a
/// vacuous no-op.
#[test]
fn split_unitig_fragments_have_correct_sequences_and_ends() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();
    c.insert_sequence(b"ACGTACGTAG").unwrap();

    let report = c.report();
    assert!(report.n_dnodes >= 1, "the branch must induce at least one decision node");

    let nodes = c.cdbg().unodes();
    assert!(nodes.len() >= 2, "splitting must leave more than one unitig fragment");
    for node in &nodes {
        let bytes = node.sequence.as_bytes();
        assert!(bytes.len() >= K);
        let expect_left = static_hash::<CyclicHasher<Dna>>(&bytes[..K], K).unwrap();
        let expect_right = static_hash::<CyclicHasher<Dna>>(&bytes[bytes.len() - K..], K).unwrap();
        assert_eq!(node.left_end, expect_left);
        assert_eq!(node.right_end, expect_right);
        assert_eq!(c.cdbg().find_by_end(node.left_end), Some(node.id));
        assert_eq!(c.cdbg().find_by_end(node.right_end), Some(node.id));
    }
}

/// Invariant 9: walking a unitig's own sequence through the dBG from its
/// left end reaches its right end without ever crossing a decision k-mer.
#[test]
fn invariant_9_unitig_reconstructs_via_walk() {
    use cdbg_stream::traversal::{walk, Direction, WalkEnd};

    let c = compactor();
    c.insert_sequence(b"ACGTACGTACGTAC").unwrap();
    let nodes = c.cdbg().unodes();
    assert!(!nodes.is_empty());
    for node in &nodes {
        if node.is_circular() || node.sequence.len() == K {
            continue;
        }
        let bytes = node.sequence.as_bytes();
        let w = walk(c.dbg(), &bytes[..K], Direction::Right, |_| false, None).unwrap();
        let reconstructed: Vec<u8> = bytes[..K].iter().copied().chain(w.path.iter().copied()).collect();
        assert_eq!(reconstructed, bytes.to_vec());
        assert!(matches!(w.end_state, WalkEnd::DecisionFwd | WalkEnd::DeadEnd));
    }
}

/// Serializer round-trip law: `load(save(store))` preserves membership.
#[test]
fn serializer_round_trip_preserves_membership() {
    use cdbg_stream::storage::hashsetstore::HashSetStore as HSS;
    use cdbg_stream::storage::{load_any, MembershipStore};

    let store = HSS::new();
    for h in [1u64, 2, 3, 100, 1000] {
        store.insert(h).unwrap();
    }
    let mut buf = Vec::new();
    store.save(&mut buf).unwrap();
    let loaded = load_any(&mut &buf[..]).unwrap();
    for h in [1u64, 2, 3, 100, 1000] {
        assert_eq!(loaded.query(h), 1);
    }
    assert_eq!(loaded.n_unique_kmers(), store.n_unique_kmers());
}

/// Meta classifications stay within the closed set of six categories.
#[test]
fn all_unitig_metas_are_closed_set_members() {
    let c = compactor();
    c.insert_sequence(b"ACGTACGTAC").unwrap();
    c.insert_sequence(b"ACGTACGTAG").unwrap();
    let nodes = c.cdbg().unodes();
    assert!(!nodes.is_empty());
    for node in &nodes {
        assert!(NodeMeta::ALL.contains(&node.meta));
    }
}
