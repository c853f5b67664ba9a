//! The de Bruijn graph (`spec.md` §4.4): a [`MembershipStore`] paired with a
//! rolling [`HashShifter`], exposing insert/query/neighbor-expansion
//! primitives. The store is held as `Arc<dyn MembershipStore>` (acceptable
//! at this outer boundary per `spec.md` §9); the hasher type is a generic
//! parameter so the per-symbol rolling loop in [`Dbg::insert_sequence`]
//! never pays for dynamic dispatch.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{CdbgError, HashError};
use crate::hashing::{HashShifter, NewWithK};
use crate::storage::MembershipStore;

/// Composes a membership store with a rolling hasher of type `H`.
pub struct Dbg<H: HashShifter + NewWithK> {
    store: Arc<dyn MembershipStore>,
    k: usize,
    /// The alphabet's symbol set, used by neighbor expansion to try every
    /// possible extension (`spec.md` §4.4: "for each symbol c in Sigma").
    symbols: Vec<u8>,
    _hasher: PhantomData<H>,
}

impl<H: HashShifter + NewWithK> Dbg<H> {
    pub fn new(store: Arc<dyn MembershipStore>, k: usize, symbols: Vec<u8>) -> Self {
        Dbg {
            store,
            k,
            symbols,
            _hasher: PhantomData,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn store(&self) -> &Arc<dyn MembershipStore> {
        &self.store
    }

    fn new_hasher(&self) -> H {
        H::new_with_k(self.k)
    }

    fn check_len(&self, s: &[u8]) -> Result<(), CdbgError> {
        if s.len() < self.k {
            return Err(HashError::SequenceTooShort {
                len: s.len(),
                k: self.k,
            }
            .into());
        }
        Ok(())
    }

    pub fn insert(&self, h: u64) -> Result<bool, CdbgError> {
        self.store.insert(h)
    }

    /// Hash every k-mer of `s` via rolling updates, returning the count of
    /// k-mers newly inserted.
    pub fn insert_sequence(&self, s: &[u8]) -> Result<usize, CdbgError> {
        let mut count = 0;
        for h in self.hashes_of(s)? {
            if self.store.insert(h)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn query(&self, h: u64) -> u64 {
        self.store.query(h)
    }

    /// The hash of every k-mer of `s`, in order, computed with a single
    /// rolling hasher (`spec.md` §4.4's `H = [h_0, ..., h_{|s|-K}]`).
    pub fn hashes_of(&self, s: &[u8]) -> Result<Vec<u64>, CdbgError> {
        self.check_len(s)?;
        let mut hasher = self.new_hasher();
        hasher.hash_base(&s[0..self.k])?;
        let mut out = Vec::with_capacity(s.len() - self.k + 1);
        out.push(hasher.value());
        for i in 0..(s.len() - self.k) {
            hasher.shift_right(s[i], s[i + self.k]);
            out.push(hasher.value());
        }
        Ok(out)
    }

    /// `(hash, count)` for every k-mer of `s`.
    pub fn query_sequence(&self, s: &[u8]) -> Result<Vec<(u64, u64)>, CdbgError> {
        Ok(self
            .hashes_of(s)?
            .into_iter()
            .map(|h| (h, self.store.query(h)))
            .collect())
    }

    /// For each symbol `c` in the alphabet, extend `kmer` to the left by
    /// `c` and keep it iff the resulting k-mer is present in the store.
    pub fn left_neighbors(&self, kmer: &[u8]) -> Result<Vec<(u8, u64)>, CdbgError> {
        self.check_len(kmer)?;
        let mut hasher = self.new_hasher();
        hasher.hash_base(&kmer[..self.k])?;
        let out = kmer[self.k - 1];
        let mut result = Vec::new();
        for &c in &self.symbols {
            let v = hasher.peek_left(c, out);
            if self.store.query(v) > 0 {
                result.push((c, v));
            }
        }
        Ok(result)
    }

    /// For each symbol `c` in the alphabet, extend `kmer` to the right by
    /// `c` and keep it iff the resulting k-mer is present in the store.
    pub fn right_neighbors(&self, kmer: &[u8]) -> Result<Vec<(u8, u64)>, CdbgError> {
        self.check_len(kmer)?;
        let mut hasher = self.new_hasher();
        hasher.hash_base(&kmer[..self.k])?;
        let out = kmer[0];
        let mut result = Vec::new();
        for &c in &self.symbols {
            let v = hasher.peek_right(out, c);
            if self.store.query(v) > 0 {
                result.push((c, v));
            }
        }
        Ok(result)
    }

    pub fn degree_left(&self, kmer: &[u8]) -> Result<usize, CdbgError> {
        Ok(self.left_neighbors(kmer)?.len())
    }

    pub fn degree_right(&self, kmer: &[u8]) -> Result<usize, CdbgError> {
        Ok(self.right_neighbors(kmer)?.len())
    }

    /// A decision k-mer has in-degree > 1 or out-degree > 1 (`spec.md` §3).
    pub fn is_decision(&self, kmer: &[u8]) -> Result<bool, CdbgError> {
        Ok(self.degree_left(kmer)? > 1 || self.degree_right(kmer)? > 1)
    }
}
