//! Per-node-type and per-operation gauges (`spec.md` §3, §6), plus the
//! plain, `Copy`-able [`Report`] snapshot external collaborators receive.
//!
//! Grounded on `examples/original_source/include/boink/cdbg/metrics.hh` and
//! `include/boink/metrics.hh`, which expose exactly this shape (one counter
//! per node meta, one per cDBG operation). Implemented as a struct of
//! `AtomicU64` counters rather than pulling in an external metrics crate
//! (e.g. `prometheus`), since `spec.md` §1's Non-goals exclude "metrics
//! dumping" as an *output format* — the counters themselves are ambient and
//! always present, per `spec.md` §9's "bounded channel of snapshots"
//! re-architecture; only an external exporter would be out of scope.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::cdbg::node::NodeMeta;

/// A point-in-time copy of every cDBG counter (`spec.md` §6 Outputs).
/// Background reporters only ever see one of these, never a live reference
/// into the store (`spec.md` §5's "Shared-resource policy").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub n_full: u64,
    pub n_tips: u64,
    pub n_islands: u64,
    pub n_trivial: u64,
    pub n_circular: u64,
    pub n_loops: u64,
    pub n_dnodes: u64,
    pub n_unodes: u64,
    pub n_updates: u64,
    pub n_splits: u64,
    pub n_merges: u64,
    pub n_extends: u64,
    pub n_clips: u64,
    pub n_deletes: u64,
    pub n_circular_merges: u64,
    pub n_tags: u64,
    pub n_unique: u64,
}

impl Report {
    /// `spec.md` §8 property 10: the meta-specific counts must sum to the
    /// total unitig count.
    pub fn unode_count_is_consistent(&self) -> bool {
        self.n_unodes
            == self.n_full + self.n_tips + self.n_islands + self.n_trivial + self.n_circular + self.n_loops
    }
}

#[derive(Default)]
struct MetaGauges {
    full: AtomicU64,
    tip: AtomicU64,
    island: AtomicU64,
    circular: AtomicU64,
    loop_: AtomicU64,
    trivial: AtomicU64,
}

impl MetaGauges {
    fn counter(&self, meta: NodeMeta) -> &AtomicU64 {
        match meta {
            NodeMeta::Full => &self.full,
            NodeMeta::Tip => &self.tip,
            NodeMeta::Island => &self.island,
            NodeMeta::Circular => &self.circular,
            NodeMeta::Loop => &self.loop_,
            NodeMeta::Trivial => &self.trivial,
        }
    }

    fn inc(&self, meta: NodeMeta) {
        self.counter(meta).fetch_add(1, Ordering::Relaxed);
    }

    fn dec(&self, meta: NodeMeta) {
        self.counter(meta).fetch_sub(1, Ordering::Relaxed);
    }
}

/// Live, concurrently-updatable counters backing a cDBG store. Every
/// mutation increments `n_updates` and the relevant per-meta / per-operation
/// gauge (`spec.md` §3).
#[derive(Default)]
pub struct Metrics {
    node_meta: MetaGauges,
    n_dnodes: AtomicU64,
    n_updates: AtomicU64,
    n_splits: AtomicU64,
    n_merges: AtomicU64,
    n_extends: AtomicU64,
    n_clips: AtomicU64,
    n_deletes: AtomicU64,
    n_circular_merges: AtomicU64,
    n_tags: AtomicU64,
    n_unique: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_new_unode(&self, meta: NodeMeta) {
        self.node_meta.inc(meta);
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclassify(&self, from: NodeMeta, to: NodeMeta) {
        if std::mem::discriminant(&from) != std::mem::discriminant(&to) {
            self.node_meta.dec(from);
            self.node_meta.inc(to);
        }
    }

    pub fn record_delete_unode(&self, meta: NodeMeta) {
        self.node_meta.dec(meta);
        self.n_deletes.fetch_add(1, Ordering::Relaxed);
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_new_dnode(&self) {
        self.n_dnodes.fetch_add(1, Ordering::Relaxed);
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete_dnode(&self) {
        self.n_dnodes.fetch_sub(1, Ordering::Relaxed);
        self.n_deletes.fetch_add(1, Ordering::Relaxed);
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_split(&self) {
        self.n_splits.fetch_add(1, Ordering::Relaxed);
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merge(&self, became_circular: bool) {
        self.n_merges.fetch_add(1, Ordering::Relaxed);
        if became_circular {
            self.n_circular_merges.fetch_add(1, Ordering::Relaxed);
        }
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extend(&self) {
        self.n_extends.fetch_add(1, Ordering::Relaxed);
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clip(&self) {
        self.n_clips.fetch_add(1, Ordering::Relaxed);
        self.n_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tags(&self, n: usize) {
        self.n_tags.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn sub_tags(&self, n: usize) {
        self.n_tags.fetch_sub(n as u64, Ordering::Relaxed);
    }

    pub fn set_n_unique(&self, n: u64) {
        self.n_unique.store(n, Ordering::Relaxed);
    }

    pub fn n_unodes(&self) -> u64 {
        self.node_meta.full.load(Ordering::Relaxed)
            + self.node_meta.tip.load(Ordering::Relaxed)
            + self.node_meta.island.load(Ordering::Relaxed)
            + self.node_meta.trivial.load(Ordering::Relaxed)
            + self.node_meta.circular.load(Ordering::Relaxed)
            + self.node_meta.loop_.load(Ordering::Relaxed)
    }

    /// A point-in-time copy of every counter.
    pub fn snapshot(&self) -> Report {
        Report {
            n_full: self.node_meta.full.load(Ordering::Relaxed),
            n_tips: self.node_meta.tip.load(Ordering::Relaxed),
            n_islands: self.node_meta.island.load(Ordering::Relaxed),
            n_trivial: self.node_meta.trivial.load(Ordering::Relaxed),
            n_circular: self.node_meta.circular.load(Ordering::Relaxed),
            n_loops: self.node_meta.loop_.load(Ordering::Relaxed),
            n_dnodes: self.n_dnodes.load(Ordering::Relaxed),
            n_unodes: self.n_unodes(),
            n_updates: self.n_updates.load(Ordering::Relaxed),
            n_splits: self.n_splits.load(Ordering::Relaxed),
            n_merges: self.n_merges.load(Ordering::Relaxed),
            n_extends: self.n_extends.load(Ordering::Relaxed),
            n_clips: self.n_clips.load(Ordering::Relaxed),
            n_deletes: self.n_deletes.load(Ordering::Relaxed),
            n_circular_merges: self.n_circular_merges.load(Ordering::Relaxed),
            n_tags: self.n_tags.load(Ordering::Relaxed),
            n_unique: self.n_unique.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_internally_consistent() {
        let m = Metrics::new();
        m.record_new_unode(NodeMeta::Island);
        m.record_new_unode(NodeMeta::Full);
        let report = m.snapshot();
        assert!(report.unode_count_is_consistent());
        assert_eq!(report.n_unodes, 2);
        assert_eq!(report.n_updates, 2);
    }

    #[test]
    fn reclassify_moves_between_gauges() {
        let m = Metrics::new();
        m.record_new_unode(NodeMeta::Island);
        m.record_reclassify(NodeMeta::Island, NodeMeta::Tip);
        let report = m.snapshot();
        assert_eq!(report.n_islands, 0);
        assert_eq!(report.n_tips, 1);
    }
}
