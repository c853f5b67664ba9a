//! Canonical (strand-independent) rolling hash: tracks both the forward and
//! reverse-complement hash of the current window, exposing `value()` as
//! their minimum (`spec.md` §3, §4.2).

use super::cyclic::CyclicHasher;
use super::{HashShifter, NewWithK};
use crate::alphabet::Alphabet;
use crate::error::HashError;

/// Wraps a forward hasher `fw` and a reverse-complement hasher `rc`.
///
/// When the forward window is extended to the right (a symbol is appended),
/// the reverse-complement window — which reads the complement of the
/// forward window back to front — gets the complement of that symbol
/// prepended on its left. So `shift_right` on the canonical hasher is
/// `fw.shift_right` paired with `rc.shift_left`, and vice versa; see
/// `DESIGN.md` for the derivation.
#[derive(Clone, Debug)]
pub struct CanonicalHasher<A: Alphabet> {
    fw: CyclicHasher<A>,
    rc: CyclicHasher<A>,
}

impl<A: Alphabet> CanonicalHasher<A> {
    pub fn new(k: usize) -> Self {
        CanonicalHasher {
            fw: CyclicHasher::new(k),
            rc: CyclicHasher::new(k),
        }
    }

    /// `true` iff the forward strand is lexicographically (by hash value)
    /// no greater than the reverse-complement strand, i.e. `value()` came
    /// from the forward hasher.
    pub fn sign(&self) -> bool {
        self.fw.value() <= self.rc.value()
    }

    pub fn forward_value(&self) -> u64 {
        self.fw.value()
    }

    pub fn reverse_complement_value(&self) -> u64 {
        self.rc.value()
    }
}

impl<A: Alphabet> NewWithK for CanonicalHasher<A> {
    fn new_with_k(k: usize) -> Self {
        Self::new(k)
    }
}

impl<A: Alphabet> HashShifter for CanonicalHasher<A> {
    fn k(&self) -> usize {
        self.fw.k()
    }

    fn hash_base(&mut self, s: &[u8]) -> Result<(), HashError> {
        self.fw.hash_base(s)?;
        let rc_seq = A::reverse_complement(&s[..self.k()])?;
        self.rc.hash_base(&rc_seq)?;
        Ok(())
    }

    fn shift_right(&mut self, out: u8, inb: u8) -> u64 {
        self.fw.shift_right(out, inb);
        self.rc.shift_left(A::complement(inb), A::complement(out));
        self.value()
    }

    fn shift_left(&mut self, inb: u8, out: u8) -> u64 {
        self.fw.shift_left(inb, out);
        self.rc.shift_right(A::complement(out), A::complement(inb));
        self.value()
    }

    fn value(&self) -> u64 {
        self.fw.value().min(self.rc.value())
    }
}
