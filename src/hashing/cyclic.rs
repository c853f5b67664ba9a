//! Forward-only cyclic polynomial (buzhash-style) rolling hash.

use std::marker::PhantomData;

use super::{HashShifter, NewWithK};
use crate::alphabet::Alphabet;
use crate::error::HashError;

/// `splitmix64`, used to derive a pseudo-random 64-bit code per symbol
/// without carrying a 256-entry lookup table around. Any fixed, distinct,
/// well-spread mapping from symbol byte to `u64` satisfies `spec.md`'s
/// "parameterized by symbol_codes" requirement; this is the teacher-absent,
/// pack-wide convention (`haradama-nthash-rs` precomputes a similar table
/// offline) re-expressed as a pure function so it needs no static data.
#[inline]
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn symbol_code(symbol: u8) -> u64 {
    splitmix64(symbol as u64)
}

#[inline]
fn rol(x: u64, n: u32) -> u64 {
    x.rotate_left(n % 64)
}

#[inline]
fn ror(x: u64, n: u32) -> u64 {
    x.rotate_right(n % 64)
}

/// A single-window cyclic polynomial hash over alphabet `A`.
///
/// `hash = XOR_{j=0}^{k-1} rol(code(s[j]), k-1-j)`. The O(1) shift formulas
/// are derived from (and verified against) that definition in `DESIGN.md`.
#[derive(Clone, Debug)]
pub struct CyclicHasher<A: Alphabet> {
    k: usize,
    hash: u64,
    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> CyclicHasher<A> {
    pub fn new(k: usize) -> Self {
        CyclicHasher {
            k,
            hash: 0,
            _alphabet: PhantomData,
        }
    }
}

impl<A: Alphabet> NewWithK for CyclicHasher<A> {
    fn new_with_k(k: usize) -> Self {
        Self::new(k)
    }
}

impl<A: Alphabet> HashShifter for CyclicHasher<A> {
    fn k(&self) -> usize {
        self.k
    }

    fn hash_base(&mut self, s: &[u8]) -> Result<(), HashError> {
        if s.len() < self.k {
            return Err(HashError::SequenceTooShort {
                len: s.len(),
                k: self.k,
            });
        }
        let validated = A::validate_all(&s[..self.k])?;
        let mut h = 0u64;
        for (j, &c) in validated.iter().enumerate() {
            h ^= rol(symbol_code(c), (self.k - 1 - j) as u32);
        }
        self.hash = h;
        Ok(())
    }

    fn shift_right(&mut self, out: u8, inb: u8) -> u64 {
        self.hash = rol(self.hash, 1) ^ rol(symbol_code(out), self.k as u32) ^ symbol_code(inb);
        self.hash
    }

    fn shift_left(&mut self, inb: u8, out: u8) -> u64 {
        self.hash =
            ror(self.hash, 1) ^ ror(symbol_code(out), 1) ^ rol(symbol_code(inb), (self.k - 1) as u32);
        self.hash
    }

    fn value(&self) -> u64 {
        self.hash
    }
}
