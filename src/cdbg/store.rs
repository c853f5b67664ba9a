//! The mutable cDBG store: an arena of [`UnitigNode`]s plus the decision-node
//! map and the two lookup indices that must stay consistent with it
//! (`spec.md` §3, §4.5). All mutation goes through `&self` methods that take
//! the lock internally, following the teacher's `Graph` methods (`shrink`,
//! `close`) which mutate through a single owned structure rather than
//! exposing field access to callers.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::cdbg::node::{DecisionId, DecisionNode, NodeMeta, UnitigId, UnitigNode};
use crate::error::{CdbgError, InvariantError};
use crate::metrics::{Metrics, Report};

struct Inner {
    /// Tombstone-on-delete arena: `None` marks a freed slot so handles
    /// elsewhere never dangle onto a reused id (`spec.md` §9).
    unodes: Vec<Option<UnitigNode>>,
    dnodes: HashMap<u64, DecisionNode>,
    /// Maps a unitig's `left_end`/`right_end` hash to its id.
    end_index: HashMap<u64, UnitigId>,
    /// Maps an interior tag (minimizer) hash to the unitig that carries it.
    tag_index: HashMap<u64, UnitigId>,
    next_id: u64,
}

impl Inner {
    fn new() -> Self {
        Inner {
            unodes: Vec::new(),
            dnodes: HashMap::new(),
            end_index: HashMap::new(),
            tag_index: HashMap::new(),
            next_id: 0,
        }
    }

    fn alloc_id(&mut self) -> UnitigId {
        let id = UnitigId(self.next_id);
        self.next_id += 1;
        id
    }

    fn slot(&self, id: UnitigId) -> Option<&UnitigNode> {
        self.unodes.get(id.0 as usize).and_then(|o| o.as_ref())
    }

    fn index(&mut self, node: &UnitigNode) {
        self.end_index.insert(node.left_end, node.id);
        self.end_index.insert(node.right_end, node.id);
        for &t in &node.tags {
            self.tag_index.insert(t, node.id);
        }
    }

    fn unindex(&mut self, node: &UnitigNode) {
        self.end_index.remove(&node.left_end);
        if node.right_end != node.left_end {
            self.end_index.remove(&node.right_end);
        }
        for &t in &node.tags {
            self.tag_index.remove(&t);
        }
    }

    fn insert_node(&mut self, node: UnitigNode) -> UnitigId {
        let id = node.id;
        self.index(&node);
        let idx = id.0 as usize;
        if idx == self.unodes.len() {
            self.unodes.push(Some(node));
        } else {
            self.unodes[idx] = Some(node);
        }
        id
    }

    fn take_node(&mut self, id: UnitigId) -> Result<UnitigNode, CdbgError> {
        let node = self
            .unodes
            .get_mut(id.0 as usize)
            .and_then(|o| o.take())
            .ok_or_else(|| InvariantError::Violation {
                context: format!("no unitig at {:?}", id),
            })?;
        self.unindex(&node);
        Ok(node)
    }
}

/// Mutex-protected store of unitig and decision nodes, with an independent
/// `Metrics` block (no need to hold the lock to read a counter).
pub struct CdbgStore {
    inner: Mutex<Inner>,
    metrics: Metrics,
}

impl Default for CdbgStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CdbgStore {
    pub fn new() -> Self {
        CdbgStore {
            inner: Mutex::new(Inner::new()),
            metrics: Metrics::new(),
        }
    }

    pub fn report(&self) -> Report {
        self.metrics.snapshot()
    }

    pub fn get_unode(&self, id: UnitigId) -> Option<UnitigNode> {
        self.inner.lock().slot(id).cloned()
    }

    pub fn get_dnode(&self, hash: u64) -> Option<DecisionNode> {
        self.inner.lock().dnodes.get(&hash).cloned()
    }

    pub fn find_by_end(&self, hash: u64) -> Option<UnitigId> {
        self.inner.lock().end_index.get(&hash).copied()
    }

    pub fn find_by_tag(&self, hash: u64) -> Option<UnitigId> {
        self.inner.lock().tag_index.get(&hash).copied()
    }

    /// Snapshot of every live `UnitigNode` (`spec.md` §6 Outputs: "Iterators
    /// over UnitigNodes ... for export"). Ids are monotonic with tombstoned
    /// gaps left by splits/merges, so callers must never substitute `0..
    /// n_unodes()` for this — the live id space outgrows the live count as
    /// soon as anything is retired.
    pub fn unodes(&self) -> Vec<UnitigNode> {
        self.inner.lock().unodes.iter().filter_map(|o| o.clone()).collect()
    }

    /// Snapshot of every live `DecisionNode` (`spec.md` §6 Outputs).
    pub fn dnodes(&self) -> Vec<DecisionNode> {
        self.inner.lock().dnodes.values().cloned().collect()
    }

    /// Allocate and index a brand new unitig (`spec.md` §4.5 `BUILD_UNODE`).
    pub fn build_unode(
        &self,
        sequence: String,
        left_end: u64,
        right_end: u64,
        tags: Vec<u64>,
        meta: NodeMeta,
    ) -> UnitigId {
        let mut inner = self.inner.lock();
        let id = inner.alloc_id();
        let n_tags = tags.len();
        let node = UnitigNode {
            id,
            sequence,
            left_end,
            right_end,
            tags,
            meta,
        };
        let id = inner.insert_node(node);
        drop(inner);
        self.metrics.record_new_unode(meta);
        self.metrics.add_tags(n_tags);
        id
    }

    /// Insert a decision node, or bump its occurrence count if one already
    /// exists at this k-mer hash (`spec.md` §4.5 `BUILD_DNODE`: decision
    /// nodes are deduplicated by k-mer, not re-created per induction).
    pub fn build_dnode(
        &self,
        id: DecisionId,
        sequence: String,
        left_degree: u32,
        right_degree: u32,
    ) {
        let mut inner = self.inner.lock();
        let is_new = !inner.dnodes.contains_key(&id.0);
        inner
            .dnodes
            .entry(id.0)
            .and_modify(|existing| {
                existing.left_degree = existing.left_degree.max(left_degree);
                existing.right_degree = existing.right_degree.max(right_degree);
                existing.count += 1;
            })
            .or_insert(DecisionNode {
                id,
                sequence,
                left_degree,
                right_degree,
                count: 1,
            });
        drop(inner);
        if is_new {
            self.metrics.record_new_dnode();
        }
    }

    /// Append (`Direction::Right`) or prepend (`Direction::Left`) one or more
    /// trailing symbols of a segment that docked onto an existing end,
    /// replacing the extended end's hash (`spec.md` §4.5 `EXTEND_UNODE`).
    /// `chunk` is the segment's new content past the k-1 overlap with the
    /// unitig's current end, in left-to-right order — one symbol per new
    /// k-mer the segment added. The caller supplies `new_end_hash` since
    /// hashing is the compactor's concern, not the store's.
    pub fn extend_unode(
        &self,
        id: UnitigId,
        extend_right: bool,
        chunk: &str,
        new_end_hash: u64,
    ) -> Result<(), CdbgError> {
        let mut inner = self.inner.lock();
        let mut node = inner.take_node(id)?;
        if extend_right {
            inner.end_index.remove(&node.right_end);
            node.sequence.push_str(chunk);
            node.right_end = new_end_hash;
        } else {
            inner.end_index.remove(&node.left_end);
            node.sequence.insert_str(0, chunk);
            node.left_end = new_end_hash;
        }
        inner.end_index.insert(node.left_end, id);
        inner.end_index.insert(node.right_end, id);
        let idx = id.0 as usize;
        inner.unodes[idx] = Some(node);
        drop(inner);
        self.metrics.record_extend();
        Ok(())
    }

    /// Add an interior tag (minimizer) to an existing unitig, keeping the
    /// tag index consistent (`spec.md` §3's "tag index" invariant).
    pub fn add_tag(&self, id: UnitigId, tag: u64) -> Result<(), CdbgError> {
        let mut inner = self.inner.lock();
        let idx = id.0 as usize;
        let node = inner
            .unodes
            .get_mut(idx)
            .and_then(|o| o.as_mut())
            .ok_or_else(|| InvariantError::Violation {
                context: format!("no unitig at {:?}", id),
            })?;
        node.tags.push(tag);
        inner.tag_index.insert(tag, id);
        drop(inner);
        self.metrics.add_tags(1);
        Ok(())
    }

    /// Replace a unitig's full tag set, keeping `tag_index` consistent
    /// (`spec.md` §8 invariant 3). Used after `extend_unode` shifts which
    /// interior k-mers the unitig covers.
    pub fn replace_tags(&self, id: UnitigId, new_tags: Vec<u64>) -> Result<(), CdbgError> {
        let mut inner = self.inner.lock();
        let idx = id.0 as usize;
        let node = inner
            .unodes
            .get_mut(idx)
            .and_then(|o| o.as_mut())
            .ok_or_else(|| InvariantError::Violation {
                context: format!("no unitig at {:?}", id),
            })?;
        let old_tags = std::mem::replace(&mut node.tags, new_tags.clone());
        for t in &old_tags {
            inner.tag_index.remove(t);
        }
        for &t in &new_tags {
            inner.tag_index.insert(t, id);
        }
        drop(inner);
        if new_tags.len() > old_tags.len() {
            self.metrics.add_tags(new_tags.len() - old_tags.len());
        } else if old_tags.len() > new_tags.len() {
            self.metrics.sub_tags(old_tags.len() - new_tags.len());
        }
        Ok(())
    }

    /// Replace one unitig with two, split at a decision k-mer discovered
    /// mid-sequence (`spec.md` §4.5 `SPLIT_UNODE`). `left`/`right` are the
    /// pre-computed sequence, end-hash, tag, and meta data for each half;
    /// the original id is retired.
    #[allow(clippy::too_many_arguments)]
    pub fn split_unode(
        &self,
        id: UnitigId,
        left_seq: String,
        left_end: (u64, u64),
        left_tags: Vec<u64>,
        left_meta: NodeMeta,
        right_seq: String,
        right_end: (u64, u64),
        right_tags: Vec<u64>,
        right_meta: NodeMeta,
    ) -> Result<(UnitigId, UnitigId), CdbgError> {
        let mut inner = self.inner.lock();
        let old = inner.take_node(id)?;
        let old_meta = old.meta;

        let left_id = inner.alloc_id();
        let n_left_tags = left_tags.len();
        inner.insert_node(UnitigNode {
            id: left_id,
            sequence: left_seq,
            left_end: left_end.0,
            right_end: left_end.1,
            tags: left_tags,
            meta: left_meta,
        });

        let right_id = inner.alloc_id();
        let n_right_tags = right_tags.len();
        inner.insert_node(UnitigNode {
            id: right_id,
            sequence: right_seq,
            left_end: right_end.0,
            right_end: right_end.1,
            tags: right_tags,
            meta: right_meta,
        });
        drop(inner);

        self.metrics.record_delete_unode(old_meta);
        self.metrics.record_new_unode(left_meta);
        self.metrics.record_new_unode(right_meta);
        self.metrics.add_tags(n_left_tags + n_right_tags);
        self.metrics.record_split();
        Ok((left_id, right_id))
    }

    /// Merge two unitigs across a degree-1 decision k-mer into one
    /// (`spec.md` §4.5 `MERGE_UNODES`). If `left_id == right_id`, this is a
    /// closure merge: the unitig becomes `Circular` and its own id is kept
    /// rather than retired.
    pub fn merge_unodes(
        &self,
        left_id: UnitigId,
        right_id: UnitigId,
        merged_sequence: String,
        left_end: u64,
        right_end: u64,
        tags: Vec<u64>,
        meta: NodeMeta,
    ) -> Result<UnitigId, CdbgError> {
        let became_circular = matches!(meta, NodeMeta::Circular);
        let mut inner = self.inner.lock();

        if left_id == right_id {
            let old = inner.take_node(left_id)?;
            let old_meta = old.meta;
            let n_tags = tags.len();
            let new_id = inner.alloc_id();
            inner.insert_node(UnitigNode {
                id: new_id,
                sequence: merged_sequence,
                left_end,
                right_end,
                tags,
                meta,
            });
            drop(inner);
            self.metrics.record_delete_unode(old_meta);
            self.metrics.record_new_unode(meta);
            self.metrics.add_tags(n_tags);
            self.metrics.record_merge(became_circular);
            return Ok(new_id);
        }

        let left = inner.take_node(left_id)?;
        let right = inner.take_node(right_id)?;
        let n_tags = tags.len();
        let new_id = inner.alloc_id();
        inner.insert_node(UnitigNode {
            id: new_id,
            sequence: merged_sequence,
            left_end,
            right_end,
            tags,
            meta,
        });
        drop(inner);
        self.metrics.record_delete_unode(left.meta);
        self.metrics.record_delete_unode(right.meta);
        self.metrics.record_new_unode(meta);
        self.metrics.add_tags(n_tags);
        self.metrics.record_merge(became_circular);
        Ok(new_id)
    }

    /// Discard a tip or island whose degenerate coverage never earned it a
    /// decision neighbor (`spec.md` §4.5 `CLIP_UNODE`).
    pub fn clip_unode(&self, id: UnitigId) -> Result<UnitigNode, CdbgError> {
        let node = self.delete_unode(id)?;
        self.metrics.record_clip();
        Ok(node)
    }

    /// Update a unitig's [`NodeMeta`] in place, keeping the per-meta gauges
    /// consistent (`spec.md` §4.5's `extend_unode` "re-classifies meta").
    pub fn reclassify_unode(&self, id: UnitigId, new_meta: NodeMeta) -> Result<(), CdbgError> {
        let mut inner = self.inner.lock();
        let idx = id.0 as usize;
        let node = inner
            .unodes
            .get_mut(idx)
            .and_then(|o| o.as_mut())
            .ok_or_else(|| InvariantError::Violation {
                context: format!("no unitig at {:?}", id),
            })?;
        let old_meta = node.meta;
        node.meta = new_meta;
        drop(inner);
        self.metrics.record_reclassify(old_meta, new_meta);
        Ok(())
    }

    pub fn delete_unode(&self, id: UnitigId) -> Result<UnitigNode, CdbgError> {
        let mut inner = self.inner.lock();
        let node = inner.take_node(id)?;
        drop(inner);
        self.metrics.sub_tags(node.tags.len());
        self.metrics.record_delete_unode(node.meta);
        Ok(node)
    }

    pub fn delete_dnode(&self, hash: u64) -> Result<DecisionNode, CdbgError> {
        let mut inner = self.inner.lock();
        let node = inner
            .dnodes
            .remove(&hash)
            .ok_or_else(|| InvariantError::Violation {
                context: format!("no decision node at {:#x}", hash),
            })?;
        drop(inner);
        self.metrics.record_delete_dnode();
        Ok(node)
    }

    pub fn n_unodes(&self) -> u64 {
        self.metrics.n_unodes()
    }

    pub fn n_dnodes(&self) -> u64 {
        self.inner.lock().dnodes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_find_unode_by_end() {
        let store = CdbgStore::new();
        let id = store.build_unode("ACGTACGT".into(), 10, 20, vec![15], NodeMeta::Island);
        assert_eq!(store.find_by_end(10), Some(id));
        assert_eq!(store.find_by_end(20), Some(id));
        assert_eq!(store.find_by_tag(15), Some(id));
        assert_eq!(store.n_unodes(), 1);
    }

    #[test]
    fn delete_unode_clears_indices() {
        let store = CdbgStore::new();
        let id = store.build_unode("ACGT".into(), 1, 2, vec![99], NodeMeta::Trivial);
        store.delete_unode(id).unwrap();
        assert_eq!(store.find_by_end(1), None);
        assert_eq!(store.find_by_end(2), None);
        assert_eq!(store.find_by_tag(99), None);
        assert_eq!(store.n_unodes(), 0);
    }

    #[test]
    fn split_unode_retires_original_and_adds_two() {
        let store = CdbgStore::new();
        let id = store.build_unode("ACGTACGTGGT".into(), 1, 2, vec![], NodeMeta::Full);
        let (left, right) = store
            .split_unode(
                id,
                "ACGTA".into(),
                (1, 50),
                vec![],
                NodeMeta::Tip,
                "CGTGGT".into(),
                (51, 2),
                vec![],
                NodeMeta::Tip,
            )
            .unwrap();
        assert!(store.get_unode(id).is_none());
        assert!(store.get_unode(left).is_some());
        assert!(store.get_unode(right).is_some());
        assert_eq!(store.find_by_end(50), Some(left));
        assert_eq!(store.find_by_end(51), Some(right));
        assert_eq!(store.n_unodes(), 2);
        assert_eq!(store.report().n_splits, 1);
    }

    #[test]
    fn merge_unodes_combines_into_one() {
        let store = CdbgStore::new();
        let l = store.build_unode("ACGT".into(), 1, 2, vec![], NodeMeta::Tip);
        let r = store.build_unode("GGTA".into(), 2, 3, vec![], NodeMeta::Tip);
        let merged = store
            .merge_unodes(l, r, "ACGTGGTA".into(), 1, 3, vec![], NodeMeta::Island)
            .unwrap();
        assert!(store.get_unode(l).is_none());
        assert!(store.get_unode(r).is_none());
        assert_eq!(store.get_unode(merged).unwrap().sequence, "ACGTGGTA");
        assert_eq!(store.n_unodes(), 1);
    }

    #[test]
    fn merge_same_id_closes_a_circle() {
        let store = CdbgStore::new();
        let id = store.build_unode("ACGTACGT".into(), 5, 6, vec![], NodeMeta::Full);
        let merged = store
            .merge_unodes(id, id, "ACGTACGT".into(), 5, 5, vec![], NodeMeta::Circular)
            .unwrap();
        assert!(store.get_unode(merged).unwrap().is_circular());
        assert_eq!(store.report().n_circular_merges, 1);
    }

    #[test]
    fn replace_tags_keeps_tag_index_consistent() {
        let store = CdbgStore::new();
        let id = store.build_unode("ACGTACGT".into(), 10, 20, vec![1, 2], NodeMeta::Island);
        assert_eq!(store.find_by_tag(1), Some(id));
        store.replace_tags(id, vec![3, 4]).unwrap();
        assert_eq!(store.find_by_tag(1), None);
        assert_eq!(store.find_by_tag(2), None);
        assert_eq!(store.find_by_tag(3), Some(id));
        assert_eq!(store.find_by_tag(4), Some(id));
    }

    #[test]
    fn build_dnode_dedupes_by_hash() {
        let store = CdbgStore::new();
        let id = DecisionId(7);
        store.build_dnode(id, "ACGT".into(), 1, 2);
        store.build_dnode(id, "ACGT".into(), 2, 1);
        let dn = store.get_dnode(7).unwrap();
        assert_eq!(dn.count, 2);
        assert_eq!(dn.left_degree, 2);
        assert_eq!(store.n_dnodes(), 1);
    }
}
