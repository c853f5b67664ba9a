//! Node types held by the cDBG store (`spec.md` §3).

use serde::{Deserialize, Serialize};

/// Handle into the unitig arena. Per `spec.md` §9's arena re-architecture,
/// this replaces the raw-pointer `UnitigNode*` the original reference uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitigId(pub u64);

/// A decision node's id *is* the hash of its k-mer (`spec.md` §3), so this
/// is a transparent wrapper rather than an arena index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionId(pub u64);

/// Classification of a [`UnitigNode`] (`spec.md` §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeMeta {
    /// Both ends border a decision k-mer.
    Full,
    /// Exactly one end borders a decision k-mer; the other is a dead end.
    Tip,
    /// Neither end borders a decision k-mer (an isolated linear component).
    Island,
    /// `left_end == right_end` and length > K: a closed loop with no
    /// distinguished start.
    Circular,
    /// Both ends border the *same* decision k-mer (a self-loop back to one
    /// branch point).
    Loop,
    /// Sequence length exactly K: a single k-mer with no interior.
    Trivial,
}

impl NodeMeta {
    pub const ALL: [NodeMeta; 6] = [
        NodeMeta::Full,
        NodeMeta::Tip,
        NodeMeta::Island,
        NodeMeta::Circular,
        NodeMeta::Loop,
        NodeMeta::Trivial,
    ];
}

/// A maximal non-branching chain in the dBG (`spec.md` §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitigNode {
    pub id: UnitigId,
    pub sequence: String,
    pub left_end: u64,
    pub right_end: u64,
    /// Interior minimizer hashes used to find this unitig by content.
    pub tags: Vec<u64>,
    pub meta: NodeMeta,
}

impl UnitigNode {
    pub fn is_circular(&self) -> bool {
        matches!(self.meta, NodeMeta::Circular)
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }
}

/// A k-mer whose in-degree or out-degree exceeds one in the underlying dBG
/// (`spec.md` §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionNode {
    pub id: DecisionId,
    pub sequence: String,
    pub left_degree: u32,
    pub right_degree: u32,
    pub count: u32,
}

impl DecisionNode {
    /// `spec.md` §3's invariant: `left_degree > 1 || right_degree > 1`.
    pub fn is_valid_decision(&self) -> bool {
        self.left_degree > 1 || self.right_degree > 1
    }
}
