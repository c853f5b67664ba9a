//! Pre-compactor filters (`spec.md` §4.7): gate a read before it ever
//! reaches [`crate::compactor::Compactor::insert_sequence`]. Both variants
//! are plain median/proportion arithmetic over k-mer counts; neither touches
//! the cDBG, so they share no locking with [`crate::cdbg::CdbgStore`] and can
//! run ahead of the compactor on a different thread if the caller wants to.
//!
//! Grounded on `spec.md` §4.7 and the worked gating example in §8's E6; see
//! `DESIGN.md` for the one open question E6 forces (§4.7's prose and its own
//! worked example disagree on the accept direction).

use crate::dbg::Dbg;
use crate::error::CdbgError;
use crate::hashing::{HashShifter, NewWithK};

/// Outcome of running one read through a filter front-end.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterOutcome {
    pub accepted: bool,
    pub n_kmers: usize,
}

fn median_u64(counts: &mut [u64]) -> u64 {
    if counts.is_empty() {
        return 0;
    }
    counts.sort_unstable();
    let n = counts.len();
    if n % 2 == 1 {
        counts[n / 2]
    } else {
        (counts[n / 2 - 1] + counts[n / 2]) / 2
    }
}

/// Digital normalization (`spec.md` §4.7): holds an auxiliary counting dBG
/// separate from the compactor's own dBG, and accepts a read iff the median
/// count of its k-mers in that auxiliary graph is still below `cutoff` — once
/// a region's coverage saturates, further reads covering only that region are
/// dropped. Accepted reads are folded into the auxiliary graph so later
/// near-duplicates saturate and get rejected in turn.
pub struct DiginormFilter<H: HashShifter + NewWithK> {
    counts: Dbg<H>,
    cutoff: u32,
}

impl<H: HashShifter + NewWithK> DiginormFilter<H> {
    pub fn new(counts: Dbg<H>, cutoff: u32) -> Self {
        DiginormFilter { counts, cutoff }
    }

    pub fn counts(&self) -> &Dbg<H> {
        &self.counts
    }

    /// `spec.md` §8 E6: accept while the read's k-mers are still rare in
    /// `counts`, then fold the read's k-mers in regardless of K length.
    pub fn filter(&self, s: &[u8]) -> Result<FilterOutcome, CdbgError> {
        let hashes = self.counts.hashes_of(s)?;
        let mut kmer_counts: Vec<u64> = hashes.iter().map(|&h| self.counts.query(h)).collect();
        let median = median_u64(&mut kmer_counts);
        let accepted = median < self.cutoff as u64;
        if accepted {
            for &h in &hashes {
                self.counts.insert(h)?;
            }
        }
        Ok(FilterOutcome {
            accepted,
            n_kmers: hashes.len(),
        })
    }
}

/// Solidity filter (`spec.md` §4.7): wraps the compactor's own dBG and
/// accepts a read iff enough of its k-mers are already well-attested
/// (count ≥ `solid_threshold`) in that graph. Accepted reads are counted
/// into the same graph the compactor queries, so the dBG passed in must be
/// the one the caller goes on to hand to the compactor.
pub struct SolidFilter {
    min_prop_solid: f64,
    solid_threshold: u32,
}

impl SolidFilter {
    pub fn new(min_prop_solid: f64, solid_threshold: u32) -> Self {
        SolidFilter {
            min_prop_solid,
            solid_threshold,
        }
    }

    pub fn filter<H: HashShifter + NewWithK>(&self, dbg: &Dbg<H>, s: &[u8]) -> Result<FilterOutcome, CdbgError> {
        let hashes = dbg.hashes_of(s)?;
        let n_solid = hashes
            .iter()
            .filter(|&&h| dbg.query(h) >= self.solid_threshold as u64)
            .count();
        let prop = if hashes.is_empty() {
            0.0
        } else {
            n_solid as f64 / hashes.len() as f64
        };
        let accepted = prop >= self.min_prop_solid;
        if accepted {
            for &h in &hashes {
                dbg.insert(h)?;
            }
        }
        Ok(FilterOutcome {
            accepted,
            n_kmers: hashes.len(),
        })
    }
}
