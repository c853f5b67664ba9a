//! The streaming compactor (`spec.md` §4.6): incrementally folds each
//! inserted sequence into the cDBG, keeping every unitig/decision-node
//! invariant intact after every call.
//!
//! Grounded on `examples/original_source/include/boink/cdbg/compactor.hh`'s
//! `StreamingCompactor::Compactor`: method names below (`segment`,
//! `scan_decision_kmers`, `induce_decisions`, `install_decisions`,
//! `install_segments`, `insert_into_dbg`) are a 1:1 relabeling of that
//! class's `find_new_segments` / the decision-scan loop inside
//! `update_from_segments` / `_induce_decision_nodes` / `_try_split_unode` /
//! `_update_unode` / the final `dbg.insert_sequence` call, restructured as
//! private steps on one `Compactor` type per `spec.md` §4.6's six-step
//! numbering (see `DESIGN.md` for the split-offset derivation, which the
//! reference computes inline in `_try_split_unode` using raw pointer
//! arithmetic over `unode_to_split->sequence`).

use std::collections::HashSet;

use tracing::{debug, instrument, trace, warn};

use crate::cdbg::{CdbgStore, DecisionId, NodeMeta, UnitigId};
use crate::dbg::Dbg;
use crate::error::{CdbgError, InvariantError};
use crate::hashing::{static_hash, HashShifter, NewWithK};
use crate::metrics::Report;
use crate::minimizer::interior_tags;
use crate::traversal::{walk, Direction, WalkEnd};

/// A maximal run of novel k-mer positions inside an inserted sequence
/// (`spec.md` §4.6 step 1's `compact_segment`), expressed as a half-open
/// range of indices into the sequence's hash array.
#[derive(Clone, Debug)]
struct Segment {
    start_idx: usize,
    end_idx: usize,
    left_anchor: u64,
    right_anchor: u64,
    left_flank: Option<u64>,
    right_flank: Option<u64>,
}

impl Segment {
    fn len_kmers(&self) -> usize {
        self.end_idx - self.start_idx + 1
    }
}

/// A discovered decision k-mer awaiting `build_dnode` + unitig split
/// (`spec.md` §4.6 steps 2-4).
#[derive(Clone, Debug)]
struct Candidate {
    idx: usize,
    hash: u64,
}

/// Per-sequence outcome, surfaced to callers and filter front-ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub n_kmers: usize,
    pub n_new_kmers: usize,
    pub n_decisions_found: usize,
    pub n_splits: usize,
}

/// Default window size for interior minimizer tags (`spec.md` §6's
/// `minimizer_window` parameter, REDESIGN FLAGS: "tunable with no semantic
/// effect on correctness, only on tag density").
pub const DEFAULT_MINIMIZER_WINDOW: usize = 8;

/// Couples a [`Dbg`] with a [`CdbgStore`] and runs the six-step algorithm
/// over each inserted sequence (`spec.md` §4.6).
pub struct Compactor<H: HashShifter + NewWithK> {
    dbg: Dbg<H>,
    cdbg: CdbgStore,
    minimizer_window: usize,
}

impl<H: HashShifter + NewWithK> Compactor<H> {
    pub fn new(dbg: Dbg<H>) -> Self {
        Compactor {
            dbg,
            cdbg: CdbgStore::new(),
            minimizer_window: DEFAULT_MINIMIZER_WINDOW,
        }
    }

    /// Overrides the interior-tag window size (`spec.md` §6); chainable so
    /// existing `Compactor::new(dbg)` call sites keep working unchanged.
    pub fn with_minimizer_window(mut self, window: usize) -> Self {
        self.minimizer_window = window.max(1);
        self
    }

    /// Interior minimizer tags for a unitig's full sequence, computed fresh
    /// from its own k-mer hashes (`spec.md` §3 GLOSSARY "tag").
    fn tags_for(&self, seq: &[u8]) -> Result<Vec<u64>, CdbgError> {
        let hashes = self.dbg.hashes_of(seq)?;
        Ok(interior_tags(&hashes, self.minimizer_window))
    }

    pub fn dbg(&self) -> &Dbg<H> {
        &self.dbg
    }

    pub fn cdbg(&self) -> &CdbgStore {
        &self.cdbg
    }

    pub fn report(&self) -> Report {
        self.cdbg.report()
    }

    fn k(&self) -> usize {
        self.dbg.k()
    }

    /// Run the full six-step algorithm over `s` (`spec.md` §4.6).
    #[instrument(skip(self, s), fields(len = s.len()))]
    pub fn insert_sequence(&self, s: &[u8]) -> Result<InsertOutcome, CdbgError> {
        let hashes = self.dbg.hashes_of(s)?;

        // Step 1.
        let (segments, new_kmer_hashes) = self.segment(s, &hashes)?;
        trace!(n_segments = segments.len(), "segmented sequence");

        // Step 2: split segments around interior decision k-mers discovered
        // purely from this sequence's own new connectivity.
        let (segments, new_decisions) = self.scan_decision_kmers(s, &hashes, segments, &new_kmer_hashes)?;

        // Step 3: induce pre-existing k-mers at segment flanks into decision
        // k-mers, now that this sequence gives them an extra neighbor.
        let induced = self.induce_decisions(s, &hashes, &segments, &new_kmer_hashes)?;

        // Step 4: build decision nodes (new and induced), splitting the
        // unitigs that the induced ones used to belong to.
        let n_decisions_found = new_decisions.len() + induced.len();
        for d in &new_decisions {
            self.build_decision(s, d)?;
        }
        let n_splits = self.install_decisions(s, induced, &new_kmer_hashes)?;

        // Step 5: install/extend/merge the remaining (non-decision) segments.
        for segment in &segments {
            self.install_segment(s, segment)?;
        }

        // Step 6: only now fold every hash of s into the membership store.
        let mut n_new_kmers = 0;
        for &h in &hashes {
            if self.dbg.insert(h)? {
                n_new_kmers += 1;
            }
        }

        Ok(InsertOutcome {
            n_kmers: hashes.len(),
            n_new_kmers,
            n_decisions_found,
            n_splits,
        })
    }

    // ---- Step 1 ---------------------------------------------------------

    fn segment(
        &self,
        s: &[u8],
        hashes: &[u64],
    ) -> Result<(Vec<Segment>, HashSet<u64>), CdbgError> {
        let mut local_new = HashSet::new();
        let mut is_new = Vec::with_capacity(hashes.len());
        for &h in hashes {
            let new = self.dbg.query(h) == 0 && !local_new.contains(&h);
            if new {
                local_new.insert(h);
            }
            is_new.push(new);
        }

        let mut segments = Vec::new();
        let mut i = 0;
        while i < is_new.len() {
            if !is_new[i] {
                i += 1;
                continue;
            }
            let start = i;
            while i < is_new.len() && is_new[i] {
                i += 1;
            }
            let end = i - 1;

            let left_flank = if start > 0 {
                Some(hashes[start - 1])
            } else {
                self.unique_neighbor(s, start, Direction::Left)?
            };
            let right_flank = if end + 1 < hashes.len() {
                Some(hashes[end + 1])
            } else {
                self.unique_neighbor(s, end, Direction::Right)?
            };

            segments.push(Segment {
                start_idx: start,
                end_idx: end,
                left_anchor: hashes[start],
                right_anchor: hashes[end],
                left_flank,
                right_flank,
            });
        }

        Ok((segments, local_new))
    }

    fn unique_neighbor(&self, s: &[u8], idx: usize, direction: Direction) -> Result<Option<u64>, CdbgError> {
        let k = self.k();
        let kmer = &s[idx..idx + k];
        let neighbors = match direction {
            Direction::Left => self.dbg.left_neighbors(kmer)?,
            Direction::Right => self.dbg.right_neighbors(kmer)?,
        };
        Ok(if neighbors.len() == 1 {
            Some(neighbors[0].1)
        } else {
            None
        })
    }

    // ---- Step 2 ---------------------------------------------------------

    /// Degree of `kmer` in `direction`, counting both existing store
    /// neighbors and the connection implied by `seq_neighbor` (the adjacent
    /// position in the sequence being inserted, which may not be in the
    /// store yet).
    fn degree_extended(
        &self,
        kmer: &[u8],
        direction: Direction,
        seq_neighbor: Option<u64>,
    ) -> Result<usize, CdbgError> {
        let mut hashes: Vec<u64> = match direction {
            Direction::Left => self.dbg.left_neighbors(kmer)?,
            Direction::Right => self.dbg.right_neighbors(kmer)?,
        }
        .into_iter()
        .map(|(_, h)| h)
        .collect();
        if let Some(h) = seq_neighbor {
            if !hashes.contains(&h) {
                hashes.push(h);
            }
        }
        Ok(hashes.len())
    }

    fn is_decision_extended(
        &self,
        s: &[u8],
        hashes: &[u64],
        idx: usize,
    ) -> Result<bool, CdbgError> {
        let k = self.k();
        let kmer = &s[idx..idx + k];
        let left_seq_neighbor = if idx > 0 { Some(hashes[idx - 1]) } else { None };
        let right_seq_neighbor = if idx + 1 < hashes.len() { Some(hashes[idx + 1]) } else { None };
        let ld = self.degree_extended(kmer, Direction::Left, left_seq_neighbor)?;
        let rd = self.degree_extended(kmer, Direction::Right, right_seq_neighbor)?;
        Ok(ld > 1 || rd > 1)
    }

    /// Cut each segment around any interior position that is a decision
    /// k-mer once this sequence's own adjacencies are accounted for
    /// (`spec.md` §4.6 step 2).
    fn scan_decision_kmers(
        &self,
        s: &[u8],
        hashes: &[u64],
        segments: Vec<Segment>,
        new_kmer_hashes: &HashSet<u64>,
    ) -> Result<(Vec<Segment>, Vec<Candidate>), CdbgError> {
        let mut decisions = Vec::new();
        let mut kept = Vec::new();

        for segment in segments {
            let mut cut_points = Vec::new();
            for idx in segment.start_idx..=segment.end_idx {
                if self.is_decision_extended(s, hashes, idx)? {
                    cut_points.push(idx);
                }
            }
            if cut_points.is_empty() {
                kept.push(segment);
                continue;
            }

            debug!(n = cut_points.len(), "segment cut around new decision k-mers");
            let mut cursor = segment.start_idx;
            for &d in &cut_points {
                if d > cursor {
                    kept.push(Segment {
                        start_idx: cursor,
                        end_idx: d - 1,
                        left_anchor: hashes[cursor],
                        right_anchor: hashes[d - 1],
                        left_flank: if cursor == segment.start_idx {
                            segment.left_flank
                        } else {
                            Some(hashes[cursor - 1])
                        },
                        right_flank: Some(hashes[d]),
                    });
                }
                let _ = new_kmer_hashes;
                decisions.push(Candidate { idx: d, hash: hashes[d] });
                cursor = d + 1;
            }
            if cursor <= segment.end_idx {
                kept.push(Segment {
                    start_idx: cursor,
                    end_idx: segment.end_idx,
                    left_anchor: hashes[cursor],
                    right_anchor: hashes[segment.end_idx],
                    left_flank: Some(hashes[cursor - 1]),
                    right_flank: segment.right_flank,
                });
            }
        }

        Ok((kept, decisions))
    }

    fn build_decision(&self, s: &[u8], d: &Candidate) -> Result<(), CdbgError> {
        let k = self.k();
        let kmer = String::from_utf8_lossy(&s[d.idx..d.idx + k]).into_owned();
        let left_degree = self.degree_extended(&s[d.idx..d.idx + k], Direction::Left, None)? as u32;
        let right_degree = self.degree_extended(&s[d.idx..d.idx + k], Direction::Right, None)? as u32;
        self.cdbg.build_dnode(DecisionId(d.hash), kmer, left_degree.max(1), right_degree.max(1));
        Ok(())
    }

    // ---- Step 3 ---------------------------------------------------------

    /// Re-check the in-dBG neighbors flanking each remaining segment: a
    /// flank that used to be linear can become a decision k-mer once it
    /// gains this segment as a new neighbor (`spec.md` §4.6 step 3).
    fn induce_decisions(
        &self,
        s: &[u8],
        hashes: &[u64],
        segments: &[Segment],
        new_kmer_hashes: &HashSet<u64>,
    ) -> Result<Vec<Candidate>, CdbgError> {
        let mut induced = Vec::new();
        let mut seen = HashSet::new();

        for segment in segments {
            if segment.start_idx > 0 && !new_kmer_hashes.contains(&hashes[segment.start_idx - 1]) {
                let flank_idx = segment.start_idx - 1;
                if seen.insert(flank_idx)
                    && self.is_decision_extended(s, hashes, flank_idx)?
                    && self.cdbg.get_dnode(hashes[flank_idx]).is_none()
                {
                    induced.push(Candidate {
                        idx: flank_idx,
                        hash: hashes[flank_idx],
                    });
                }
            }
            if segment.end_idx + 1 < hashes.len() && !new_kmer_hashes.contains(&hashes[segment.end_idx + 1]) {
                let flank_idx = segment.end_idx + 1;
                if seen.insert(flank_idx)
                    && self.is_decision_extended(s, hashes, flank_idx)?
                    && self.cdbg.get_dnode(hashes[flank_idx]).is_none()
                {
                    induced.push(Candidate {
                        idx: flank_idx,
                        hash: hashes[flank_idx],
                    });
                }
            }
        }

        Ok(induced)
    }

    // ---- Step 4 -----------------------------------------------------------

    /// Build a decision node for every induced k-mer, then split the unitig
    /// each one used to belong to, via a bounded dependency-safe retry loop
    /// (`spec.md` §4.6 step 4: `4 * |induced|` attempts).
    fn install_decisions(
        &self,
        s: &[u8],
        induced: Vec<Candidate>,
        new_kmer_hashes: &HashSet<u64>,
    ) -> Result<usize, CdbgError> {
        if induced.is_empty() {
            return Ok(0);
        }
        for d in &induced {
            self.build_decision(s, d)?;
        }

        let max_attempts = 4 * induced.len();
        let mut pending: std::collections::VecDeque<Candidate> = induced.into_iter().collect();
        let mut processed = HashSet::new();
        let mut attempts = 0;
        let mut n_splits = 0;

        while let Some(d) = pending.pop_front() {
            if processed.contains(&d.hash) {
                continue;
            }
            attempts += 1;
            if attempts > max_attempts {
                return Err(InvariantError::SplitRetryExhausted { attempts }.into());
            }
            let k = self.k();
            let kmer = &s[d.idx..d.idx + k];
            if self.try_split_unode(kmer, d.hash, new_kmer_hashes, &processed)? {
                processed.insert(d.hash);
                n_splits += 1;
            } else {
                pending.push_back(d);
            }
        }

        Ok(n_splits)
    }

    /// Attempt to split the unitig containing `root_hash` (an induced
    /// decision k-mer), per `examples/original_source/.../compactor.hh`'s
    /// `_try_split_unode`. Returns `false` (retry later) when the unitig's
    /// boundaries are still in flux because of another pending split.
    fn try_split_unode(
        &self,
        root_kmer: &[u8],
        root_hash: u64,
        new_kmer_hashes: &HashSet<u64>,
        processed: &HashSet<u64>,
    ) -> Result<bool, CdbgError> {
        if let Some(id) = self.cdbg.find_by_end(root_hash) {
            return self.split_at_existing_end(id, root_hash);
        }

        let left_candidates: Vec<(u8, u64)> = self
            .dbg
            .left_neighbors(root_kmer)?
            .into_iter()
            .filter(|(_, h)| !new_kmer_hashes.contains(h) && !processed.contains(h))
            .collect();
        let right_candidates: Vec<(u8, u64)> = self
            .dbg
            .right_neighbors(root_kmer)?
            .into_iter()
            .filter(|(_, h)| !new_kmer_hashes.contains(h) && !processed.contains(h))
            .collect();

        if let Some(&(lsym, lhash)) = left_candidates.first() {
            let mut neighbor_kmer = root_kmer.to_vec();
            neighbor_kmer.pop();
            neighbor_kmer.insert(0, lsym);
            let w = walk(&self.dbg, &neighbor_kmer, Direction::Left, |_| false, None)?;
            if w.end_state == WalkEnd::StopSeen {
                warn!("unitig to split is a pure cycle; skipping this attempt");
                return Ok(false);
            }
            if let Some(old_id) = self.cdbg.find_by_end(w.tail_hash) {
                return self.split_left_of(old_id, root_kmer, root_hash, lhash, w.path.len());
            }
            return Ok(false);
        }

        if let Some(&(rsym, rhash)) = right_candidates.first() {
            let mut neighbor_kmer = root_kmer.to_vec();
            neighbor_kmer.remove(0);
            neighbor_kmer.push(rsym);
            let w = walk(&self.dbg, &neighbor_kmer, Direction::Right, |_| false, None)?;
            if w.end_state == WalkEnd::StopSeen {
                warn!("unitig to split is a pure cycle; skipping this attempt");
                return Ok(false);
            }
            if let Some(old_id) = self.cdbg.find_by_end(w.tail_hash) {
                return self.split_right_of(old_id, root_kmer, root_hash, rhash, w.path.len());
            }
            return Ok(false);
        }

        // Flanked by other still-pending induced decisions on both sides;
        // the caller will retry once one of those resolves.
        Ok(false)
    }

    /// `root_hash` is itself an existing unitig end (`spec.md` §9's open
    /// question: the reference treats this as "induced an end k-mer").
    fn split_at_existing_end(&self, id: UnitigId, root_hash: u64) -> Result<bool, CdbgError> {
        let node = self
            .cdbg
            .get_unode(id)
            .ok_or_else(|| InvariantError::Violation {
                context: format!("end index pointed at missing unode {:?}", id),
            })?;

        if matches!(node.meta, NodeMeta::Trivial) {
            self.cdbg.delete_unode(id)?;
            return Ok(true);
        }

        let k = self.k();
        if matches!(node.meta, NodeMeta::Circular) {
            // Convert the cycle to a single linear fragment starting just
            // past root, ending just before it again.
            let bytes = node.sequence.as_bytes();
            let new_seq: String = bytes[1..].iter().chain(bytes[..1].iter()).map(|&b| b as char).collect();
            let new_left = static_hash::<H>(&new_seq.as_bytes()[..k], k)?;
            let new_right = static_hash::<H>(&new_seq.as_bytes()[new_seq.len() - k..], k)?;
            let tags = self.tags_for(new_seq.as_bytes())?;
            self.cdbg.delete_unode(id)?;
            self.cdbg
                .build_unode(new_seq, new_left, new_right, tags, NodeMeta::Full);
            return Ok(true);
        }

        // Trim one symbol off whichever end matches root.
        let trim_left = root_hash == node.left_end;
        let (new_sequence, new_end_hash) = if trim_left {
            let rest = &node.sequence[1..];
            let h = static_hash::<H>(&rest.as_bytes()[..k], k)?;
            (rest.to_string(), h)
        } else {
            let rest = &node.sequence[..node.sequence.len() - 1];
            let h = static_hash::<H>(&rest.as_bytes()[rest.len() - k..], k)?;
            (rest.to_string(), h)
        };
        let (left_end, right_end) = if trim_left {
            (new_end_hash, node.right_end)
        } else {
            (node.left_end, new_end_hash)
        };
        let tags = self.tags_for(new_sequence.as_bytes())?;
        self.cdbg.delete_unode(id)?;
        let meta = self.classify_meta(left_end, right_end, new_sequence.len());
        self.cdbg.build_unode(new_sequence, left_end, right_end, tags, meta);
        Ok(true)
    }

    fn split_left_of(
        &self,
        old_id: UnitigId,
        root_kmer: &[u8],
        _root_hash: u64,
        left_neighbor_hash: u64,
        steps_from_neighbor: usize,
    ) -> Result<bool, CdbgError> {
        let k = self.k();
        let old = self
            .cdbg
            .get_unode(old_id)
            .ok_or_else(|| InvariantError::Violation {
                context: "split target vanished mid-retry".into(),
            })?;

        let split_point = steps_from_neighbor + 1; // kmers strictly left of root, inclusive of old_end
        let old_bytes = old.sequence.as_bytes();
        if split_point + k - 1 > old_bytes.len() {
            return Ok(false);
        }
        let left_seq = String::from_utf8_lossy(&old_bytes[..split_point + k - 1]).into_owned();
        let right_start = split_point + 1;
        if right_start + k > old_bytes.len() + 1 {
            return Ok(false);
        }
        let right_seq = String::from_utf8_lossy(&old_bytes[right_start..]).into_owned();

        let _ = root_kmer;
        let left_end = old.left_end;
        let right_end = left_neighbor_hash;
        let new_right_left = static_hash::<H>(&right_seq.as_bytes()[..k.min(right_seq.len())], k)?;
        let right_end_hash = old.right_end;

        let left_meta = self.classify_meta(left_end, right_end, left_seq.len());
        let right_meta = self.classify_meta(new_right_left, right_end_hash, right_seq.len());
        let left_tags = self.tags_for(left_seq.as_bytes())?;
        let right_tags = self.tags_for(right_seq.as_bytes())?;

        self.cdbg.split_unode(
            old_id,
            left_seq,
            (left_end, right_end),
            left_tags,
            left_meta,
            right_seq,
            (new_right_left, right_end_hash),
            right_tags,
            right_meta,
        )?;
        Ok(true)
    }

    fn split_right_of(
        &self,
        old_id: UnitigId,
        root_kmer: &[u8],
        _root_hash: u64,
        right_neighbor_hash: u64,
        steps_from_neighbor: usize,
    ) -> Result<bool, CdbgError> {
        let k = self.k();
        let old = self
            .cdbg
            .get_unode(old_id)
            .ok_or_else(|| InvariantError::Violation {
                context: "split target vanished mid-retry".into(),
            })?;

        let old_bytes = old.sequence.as_bytes();
        let total_kmers = old_bytes.len() - k + 1;
        let right_kmer_count = steps_from_neighbor + 1;
        if right_kmer_count + 1 > total_kmers {
            return Ok(false);
        }
        let split_point = total_kmers - right_kmer_count - 1;

        let left_seq = String::from_utf8_lossy(&old_bytes[..split_point + k - 1]).into_owned();
        let right_seq = String::from_utf8_lossy(&old_bytes[split_point + 1..]).into_owned();

        let _ = root_kmer;
        let left_end = old.left_end;
        let new_left_right = static_hash::<H>(&left_seq.as_bytes()[left_seq.len() - k..], k)?;
        let right_end = old.right_end;

        let left_meta = self.classify_meta(left_end, new_left_right, left_seq.len());
        let right_meta = self.classify_meta(right_neighbor_hash, right_end, right_seq.len());
        let left_tags = self.tags_for(left_seq.as_bytes())?;
        let right_tags = self.tags_for(right_seq.as_bytes())?;

        self.cdbg.split_unode(
            old_id,
            left_seq,
            (left_end, new_left_right),
            left_tags,
            left_meta,
            right_seq,
            (right_neighbor_hash, right_end),
            right_tags,
            right_meta,
        )?;
        Ok(true)
    }

    fn classify_meta(&self, left_end: u64, right_end: u64, seq_len: usize) -> NodeMeta {
        if seq_len == self.k() {
            return NodeMeta::Trivial;
        }
        if left_end == right_end {
            return NodeMeta::Circular;
        }
        let left_decision = self.cdbg.get_dnode(left_end).is_some();
        let right_decision = self.cdbg.get_dnode(right_end).is_some();
        match (left_decision, right_decision) {
            (true, true) => NodeMeta::Full,
            (true, false) | (false, true) => NodeMeta::Tip,
            (false, false) => NodeMeta::Island,
        }
    }

    // ---- Step 5 -----------------------------------------------------------

    /// Install, extend, or merge a non-decision segment, per the
    /// `has_left_unode`/`has_right_unode` table in `spec.md` §4.6 step 5.
    fn install_segment(&self, s: &[u8], segment: &Segment) -> Result<(), CdbgError> {
        let k = self.k();
        let seq = String::from_utf8_lossy(&s[segment.start_idx..segment.end_idx + k]).into_owned();

        if segment.left_anchor == segment.right_anchor
            && segment.left_flank == Some(segment.left_anchor)
            && segment.right_flank == Some(segment.right_anchor)
            && segment.len_kmers() > 1
        {
            let tags = self.tags_for(seq.as_bytes())?;
            self.cdbg
                .build_unode(seq, segment.left_anchor, segment.left_anchor, tags, NodeMeta::Circular);
            return Ok(());
        }

        let has_left = segment.left_flank.map(|h| self.cdbg.find_by_end(h)).flatten();
        let has_right = segment.right_flank.map(|h| self.cdbg.find_by_end(h)).flatten();

        // The segment's content past the k-1 overlap with whichever
        // existing end it docks onto — one new symbol per k-mer the
        // segment added (`spec.md` §4.5 EXTEND_UNODE), always in
        // left-to-right order. A segment of a single new k-mer reduces
        // this to the old one-symbol append/prepend.
        let new_suffix = &seq[k - 1..];
        let new_prefix = &seq[..seq.len() - (k - 1)];

        match (has_left, has_right) {
            (None, None) => {
                let meta = self.classify_meta(segment.left_anchor, segment.right_anchor, seq.len());
                let tags = self.tags_for(seq.as_bytes())?;
                self.cdbg
                    .build_unode(seq, segment.left_anchor, segment.right_anchor, tags, meta);
            }
            (Some(left_id), None) => {
                self.cdbg.extend_unode(left_id, true, new_suffix, segment.right_anchor)?;
                self.reclassify(left_id)?;
                self.retag(left_id)?;
            }
            (None, Some(right_id)) => {
                self.cdbg.extend_unode(right_id, false, new_prefix, segment.left_anchor)?;
                self.reclassify(right_id)?;
                self.retag(right_id)?;
            }
            (Some(left_id), Some(right_id)) => {
                let became_circular = left_id == right_id;
                let left = self.cdbg.get_unode(left_id);
                let right = self.cdbg.get_unode(right_id);

                // Rebuild the merged unitig's full sequence from the left
                // unitig's body, the bridge segment, and the right
                // unitig's body, trimming the k-1 overlap at each
                // junction (`spec.md` §4.5 MERGE_UNODES). `seq` alone is
                // only the bridge and must never stand in for the merged
                // node's sequence (spec §8 invariant 2).
                let merged_sequence = match (&left, &right) {
                    (Some(l), _) if became_circular => format!("{}{}", l.sequence, new_suffix),
                    (Some(l), Some(r)) => format!("{}{}{}", l.sequence, new_suffix, &r.sequence[k - 1..]),
                    _ => seq.clone(),
                };
                let (final_left_end, final_right_end) = match (&left, &right) {
                    (Some(l), _) if became_circular => (l.left_end, l.left_end),
                    (Some(l), Some(r)) => (l.left_end, r.right_end),
                    _ => (segment.left_anchor, segment.right_anchor),
                };
                let meta = if became_circular {
                    NodeMeta::Circular
                } else {
                    self.classify_meta(final_left_end, final_right_end, merged_sequence.len())
                };
                let tags = self.tags_for(merged_sequence.as_bytes())?;
                self.cdbg.merge_unodes(
                    left_id,
                    right_id,
                    merged_sequence,
                    final_left_end,
                    final_right_end,
                    tags,
                    meta,
                )?;
            }
        }
        Ok(())
    }

    /// Recompute and install a unitig's tags from its current sequence
    /// (`spec.md` §8 invariant 3), called after an edit that may have
    /// shifted which interior k-mers it covers.
    fn retag(&self, id: UnitigId) -> Result<(), CdbgError> {
        if let Some(node) = self.cdbg.get_unode(id) {
            let tags = self.tags_for(node.sequence.as_bytes())?;
            self.cdbg.replace_tags(id, tags)?;
        }
        Ok(())
    }

    /// Re-evaluate and, if needed, update a unitig's meta after an edit
    /// that may have changed whether an end borders a decision k-mer
    /// (`spec.md` §4.5: "Re-classifies meta (ISLAND -> TIP, TIP -> FULL,
    /// etc.)").
    fn reclassify(&self, id: UnitigId) -> Result<(), CdbgError> {
        if let Some(node) = self.cdbg.get_unode(id) {
            let meta = self.classify_meta(node.left_end, node.right_end, node.sequence.len());
            if meta != node.meta {
                self.cdbg.reclassify_unode(id, meta)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{Alphabet, Dna};
    use crate::hashing::cyclic::CyclicHasher;
    use crate::storage::hashsetstore::HashSetStore;
    use std::sync::Arc;

    fn compactor() -> Compactor<CyclicHasher<Dna>> {
        let dbg = Dbg::new(Arc::new(HashSetStore::new()), 4, Dna::SYMBOLS.to_vec());
        Compactor::new(dbg)
    }

    #[test]
    fn single_read_builds_one_island() {
        let c = compactor();
        let outcome = c.insert_sequence(b"ACGTACGTAC").unwrap();
        // "ACGTACGTAC" at K=4 is a 4-periodic repeat of "ACGT": only its 4
        // distinct 4-mers (ACGT, CGTA, GTAC, TACG) are new; the trailing
        // ACGT/CGTA/GTAC are re-occurrences step 6 inserts as no-ops.
        assert_eq!(outcome.n_new_kmers, 4);
        assert_eq!(c.cdbg().n_unodes(), 1);
        let report = c.report();
        assert_eq!(report.n_islands, 1);
    }

    #[test]
    fn extending_island_keeps_single_unode() {
        let c = compactor();
        c.insert_sequence(b"ACGTACGTAC").unwrap();
        c.insert_sequence(b"CGTACGTACA").unwrap();
        assert_eq!(c.cdbg().n_unodes(), 1);
        assert_eq!(c.report().n_extends, 1);
    }

    #[test]
    fn repeated_insertion_is_idempotent() {
        let c = compactor();
        c.insert_sequence(b"ACGTACGTAC").unwrap();
        let before = c.report();
        c.insert_sequence(b"ACGTACGTAC").unwrap();
        let after = c.report();
        assert_eq!(before.n_unodes, after.n_unodes);
    }

    #[test]
    fn long_island_carries_interior_tags() {
        let dbg = Dbg::new(Arc::new(HashSetStore::new()), 4, Dna::SYMBOLS.to_vec());
        let c = Compactor::new(dbg).with_minimizer_window(2);
        c.insert_sequence(b"ACGTACGTACGTACGT").unwrap();
        let node = c.cdbg().get_unode(UnitigId(0)).unwrap();
        assert!(!node.tags.is_empty(), "a long island should pick up at least one interior tag");
        for &tag in &node.tags {
            assert_eq!(c.cdbg().find_by_tag(tag), Some(UnitigId(0)));
        }
    }

    #[test]
    fn extending_a_unitig_keeps_tag_index_consistent() {
        let dbg = Dbg::new(Arc::new(HashSetStore::new()), 4, Dna::SYMBOLS.to_vec());
        let c = Compactor::new(dbg).with_minimizer_window(2);
        c.insert_sequence(b"ACGTACGTAC").unwrap();
        c.insert_sequence(b"CGTACGTACA").unwrap();
        assert_eq!(c.cdbg().n_unodes(), 1);
        let node = c.cdbg().get_unode(UnitigId(0)).unwrap();
        for &tag in &node.tags {
            assert_eq!(c.cdbg().find_by_tag(tag), Some(UnitigId(0)));
        }
    }
}
