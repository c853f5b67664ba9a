//! Rolling hash layer (`spec.md` §4.2).
//!
//! Two concrete [`HashShifter`] implementations: [`cyclic::CyclicHasher`]
//! (forward-only) and [`canonical::CanonicalHasher`] (min of forward /
//! reverse-complement). Grounded on the rolling-update contract of
//! `nthash-rs` (`examples/other_examples/23d24396_haradama-nthash-rs__src-lib.rs.rs`
//! and sibling `kmer.rs`/`util.rs` files in that pack entry), which is the
//! only crate in the retrieval pack that implements a DNA k-mer rolling
//! hash; the concrete update formulas here are a cyclic-polynomial (buzhash)
//! scheme rather than ntHash's multiplicative one, per `spec.md`'s explicit
//! "cyclic polynomial hash" requirement in §4.2.

pub mod canonical;
pub mod cyclic;

use crate::error::HashError;

/// Common contract for a rolling hash over a fixed window size `k`.
///
/// `hash_base` must be called before any `shift_left`/`shift_right` call;
/// the hash value for the empty window is unspecified (`spec.md` §4.2).
pub trait HashShifter: Clone {
    /// The window size this hasher was constructed with.
    fn k(&self) -> usize;

    /// Compute the hash of `s[0..k]` from scratch, replacing any prior state.
    fn hash_base(&mut self, s: &[u8]) -> Result<(), HashError>;

    /// Transition the hash of window `[out, ...] -> [..., in]`: drop the
    /// leftmost symbol `out`, append `in` on the right. O(1).
    fn shift_right(&mut self, out: u8, inb: u8) -> u64;

    /// Inverse of [`shift_right`](Self::shift_right): prepend `in` on the
    /// left, drop the rightmost symbol `out`. O(1).
    fn shift_left(&mut self, inb: u8, out: u8) -> u64;

    /// The current hash value.
    fn value(&self) -> u64;

    /// The value `shift_right(out, in)` would produce, without mutating
    /// `self`. Used by neighbor expansion, which must try several candidate
    /// symbols against the same starting window.
    fn peek_right(&self, out: u8, inb: u8) -> u64 {
        let mut c = self.clone();
        c.shift_right(out, inb)
    }

    /// The value `shift_left(in, out)` would produce, without mutating
    /// `self`.
    fn peek_left(&self, inb: u8, out: u8) -> u64 {
        let mut c = self.clone();
        c.shift_left(inb, out)
    }
}

/// Compute the hash of `s[0..k]` with a fresh, independent hasher instance.
///
/// `spec.md` §4.2 requires `hash_base(s)` to equal `static_hash(s, K)` for
/// any independent instance constructed with the same `K`; this is that
/// independent instance, used by tests and by callers (e.g. traversal) that
/// need a one-off hash without holding a long-lived hasher.
pub fn static_hash<H: HashShifter + NewWithK>(s: &[u8], k: usize) -> Result<u64, HashError> {
    let mut h = H::new_with_k(k);
    h.hash_base(s)?;
    Ok(h.value())
}

/// Constructors for hashers that need to know `k` before use.
pub trait NewWithK {
    fn new_with_k(k: usize) -> Self;
}
