//! Directional walks over the dBG (`spec.md` §4.4), used by the streaming
//! compactor to find unitig boundaries and by decision-kmer induction to
//! re-check neighbor degree.

use std::collections::HashSet;

use crate::dbg::Dbg;
use crate::error::CdbgError;
use crate::hashing::{HashShifter, NewWithK};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Why a walk stopped, per `spec.md` §4.4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEnd {
    /// The neighbor's hash was already in this walk's seen-set (circular).
    StopSeen,
    /// The caller's stop predicate accepted the neighbor.
    StopMasked,
    /// The current node has more than one neighbor in `direction`.
    DecisionFwd,
    /// The single neighbor ahead has more than one neighbor looking back.
    DecisionBwd,
    /// There is no neighbor in `direction`.
    DeadEnd,
    /// The walk's step budget was exhausted before any other condition.
    Step,
}

pub struct Walk {
    /// Symbols appended to the path, in walk order (does not include the
    /// starting k-mer itself).
    pub path: Vec<u8>,
    pub end_state: WalkEnd,
    /// The hash of the k-mer at the cursor when the walk stopped.
    pub tail_hash: u64,
}

/// Walk the dBG from `start` (a length-k sequence) in `direction`, stopping
/// when a decision k-mer is reached, the predicate accepts a neighbor, a
/// dead end or cycle is hit, or (if given) `max_steps` is exceeded.
pub fn walk<H: HashShifter + NewWithK>(
    dbg: &Dbg<H>,
    start: &[u8],
    direction: Direction,
    mut stop_predicate: impl FnMut(u64) -> bool,
    max_steps: Option<usize>,
) -> Result<Walk, CdbgError> {
    let k = dbg.k();
    let mut cursor: Vec<u8> = start[..k].to_vec();
    let mut hasher = H::new_with_k(k);
    hasher.hash_base(&cursor)?;

    let mut seen: HashSet<u64> = HashSet::new();
    seen.insert(hasher.value());

    let mut path = Vec::new();
    let mut steps = 0usize;

    loop {
        if let Some(max) = max_steps {
            if steps >= max {
                return Ok(Walk {
                    path,
                    end_state: WalkEnd::Step,
                    tail_hash: hasher.value(),
                });
            }
        }

        let neighbors = match direction {
            Direction::Right => dbg.right_neighbors(&cursor)?,
            Direction::Left => dbg.left_neighbors(&cursor)?,
        };

        if neighbors.is_empty() {
            return Ok(Walk {
                path,
                end_state: WalkEnd::DeadEnd,
                tail_hash: hasher.value(),
            });
        }
        if neighbors.len() > 1 {
            return Ok(Walk {
                path,
                end_state: WalkEnd::DecisionFwd,
                tail_hash: hasher.value(),
            });
        }

        let (symbol, neighbor_hash) = neighbors[0];

        let mut next_kmer = cursor.clone();
        match direction {
            Direction::Right => {
                next_kmer.remove(0);
                next_kmer.push(symbol);
            }
            Direction::Left => {
                next_kmer.pop();
                next_kmer.insert(0, symbol);
            }
        }

        let opposite_degree = match direction {
            Direction::Right => dbg.left_neighbors(&next_kmer)?.len(),
            Direction::Left => dbg.right_neighbors(&next_kmer)?.len(),
        };
        if opposite_degree > 1 {
            return Ok(Walk {
                path,
                end_state: WalkEnd::DecisionBwd,
                tail_hash: hasher.value(),
            });
        }

        if seen.contains(&neighbor_hash) {
            return Ok(Walk {
                path,
                end_state: WalkEnd::StopSeen,
                tail_hash: hasher.value(),
            });
        }
        if stop_predicate(neighbor_hash) {
            return Ok(Walk {
                path,
                end_state: WalkEnd::StopMasked,
                tail_hash: hasher.value(),
            });
        }

        match direction {
            Direction::Right => {
                hasher.shift_right(cursor[0], symbol);
            }
            Direction::Left => {
                hasher.shift_left(symbol, cursor[k - 1]);
            }
        }
        cursor = next_kmer;
        path.push(symbol);
        seen.insert(neighbor_hash);
        steps += 1;
    }
}
