//! Bloom filter with `n_tables` independent tables of prime bit-length,
//! grounded on `examples/original_source/include/goetia/storage/bitstorage.hh`.
//! No counting; tunable false-positive rate via `(max_table_bytes, n_tables)`.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{read_header, type_tag, MembershipStore, STORE_ABI_VERSION};
use crate::error::CdbgError;

#[derive(Clone, Copy, Debug)]
pub struct BitStoreParams {
    pub max_table_bytes: u64,
    pub n_tables: u16,
}

impl Default for BitStoreParams {
    fn default() -> Self {
        BitStoreParams {
            max_table_bytes: 1_000_000,
            n_tables: 4,
        }
    }
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut i = 3u64;
    while i.saturating_mul(i) <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Largest prime <= `n` (falls back to `n` for tiny/degenerate inputs).
fn prev_prime(n: u64) -> u64 {
    let mut x = n.max(2);
    while x > 2 && !is_prime(x) {
        x -= 1;
    }
    x
}

#[inline]
fn mix(h: u64, table: u16) -> u64 {
    let salted = h ^ (table as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut z = salted;
    z = (z ^ (z >> 33)).wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    z = (z ^ (z >> 33)).wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    z ^ (z >> 33)
}

pub struct BitStore {
    params: BitStoreParams,
    /// One bit-packed `AtomicU64` table per hash function, sized to a prime
    /// number of bits.
    tables: Vec<Vec<AtomicU64>>,
    table_bits: Vec<u64>,
    n_unique: AtomicU64,
    n_occupied: AtomicUsize,
}

impl BitStore {
    pub fn new(params: BitStoreParams) -> Self {
        let bits_requested = (params.max_table_bytes * 8).max(64);
        let mut table_bits = Vec::with_capacity(params.n_tables as usize);
        let mut tables = Vec::with_capacity(params.n_tables as usize);
        for t in 0..params.n_tables {
            // Vary the candidate size slightly per table so tables are not
            // forced to an identical prime (reduces correlated collisions).
            let candidate = bits_requested.saturating_sub(t as u64 * 2).max(64);
            let bits = prev_prime(candidate);
            let words = ((bits + 63) / 64) as usize;
            table_bits.push(bits);
            tables.push((0..words).map(|_| AtomicU64::new(0)).collect());
        }
        BitStore {
            params,
            tables,
            table_bits,
            n_unique: AtomicU64::new(0),
            n_occupied: AtomicUsize::new(0),
        }
    }

    fn bit_position(&self, table: u16, h: u64) -> (usize, u64) {
        let bits = self.table_bits[table as usize];
        let pos = mix(h, table) % bits;
        ((pos / 64) as usize, 1u64 << (pos % 64))
    }

    /// Sets all table bits for `h`; returns true iff any bit was previously
    /// unset (i.e. `h` was newly added, per `spec.md` §4.3).
    fn set_all(&self, h: u64) -> bool {
        let mut was_new = false;
        for t in 0..self.params.n_tables {
            let (word, mask) = self.bit_position(t, h);
            let prev = self.tables[t as usize][word].fetch_or(mask, Ordering::AcqRel);
            if prev & mask == 0 {
                was_new = true;
                self.n_occupied.fetch_add(1, Ordering::Relaxed);
            }
        }
        was_new
    }
}

impl MembershipStore for BitStore {
    fn insert(&self, h: u64) -> Result<bool, CdbgError> {
        let newly = self.set_all(h);
        if newly {
            self.n_unique.fetch_add(1, Ordering::Relaxed);
        }
        Ok(newly)
    }

    fn insert_and_query(&self, h: u64) -> Result<u64, CdbgError> {
        self.insert(h)?;
        Ok(1)
    }

    fn query(&self, h: u64) -> u64 {
        for t in 0..self.params.n_tables {
            let (word, mask) = self.bit_position(t, h);
            if self.tables[t as usize][word].load(Ordering::Acquire) & mask == 0 {
                return 0;
            }
        }
        1
    }

    fn n_unique_kmers(&self) -> u64 {
        self.n_unique.load(Ordering::Relaxed)
    }

    fn n_occupied(&self) -> u64 {
        self.n_occupied.load(Ordering::Relaxed) as u64
    }

    fn estimated_fp(&self) -> f64 {
        let n_tables = self.params.n_tables as f64;
        if n_tables == 0.0 {
            return 0.0;
        }
        // Average per-table occupancy fraction, raised to n_tables (spec.md §4.3).
        let avg_bins: f64 = self.table_bits.iter().map(|&b| b as f64).sum::<f64>() / n_tables;
        let occupied_per_table = self.n_occupied() as f64 / n_tables;
        (occupied_per_table / avg_bins).powf(n_tables)
    }

    fn save(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(&type_tag("BitStor"))?;
        w.write_u64::<LittleEndian>(STORE_ABI_VERSION)?;
        w.write_u64::<LittleEndian>(self.params.max_table_bytes)?;
        w.write_u16::<LittleEndian>(self.params.n_tables)?;
        w.write_u64::<LittleEndian>(self.n_unique.load(Ordering::Acquire))?;
        for table in &self.tables {
            for word in table {
                w.write_u64::<LittleEndian>(word.load(Ordering::Acquire))?;
            }
        }
        Ok(())
    }
}

impl BitStore {
    /// Inverse of [`MembershipStore::save`]: rebuilds a store whose tables
    /// are sized identically to the one that wrote `r` (params are
    /// deterministic, so [`BitStore::new`] reproduces the same table
    /// geometry) before overwriting its words with the saved bits.
    /// `n_occupied` is re-derived from the popcount of the loaded bits
    /// (exact, since every set bit is occupied); `n_unique` is not
    /// recoverable from the bits alone and is persisted directly.
    pub fn load(r: &mut dyn Read) -> io::Result<Self> {
        read_header(r, "BitStor")?;
        let max_table_bytes = r.read_u64::<LittleEndian>()?;
        let n_tables = r.read_u16::<LittleEndian>()?;
        let n_unique = r.read_u64::<LittleEndian>()?;
        let store = BitStore::new(BitStoreParams {
            max_table_bytes,
            n_tables,
        });
        let mut n_occupied = 0usize;
        for table in &store.tables {
            for word in table {
                let v = r.read_u64::<LittleEndian>()?;
                n_occupied += v.count_ones() as usize;
                word.store(v, Ordering::Release);
            }
        }
        store.n_occupied.store(n_occupied, Ordering::Relaxed);
        store.n_unique.store(n_unique, Ordering::Relaxed);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_query_finds_member() {
        let s = BitStore::new(BitStoreParams {
            max_table_bytes: 4096,
            n_tables: 3,
        });
        assert!(s.insert(123).unwrap());
        assert_eq!(s.query(123), 1);
    }

    #[test]
    fn second_insert_is_not_newly_added() {
        let s = BitStore::new(BitStoreParams::default());
        s.insert(1).unwrap();
        assert!(!s.insert(1).unwrap());
    }

    #[test]
    fn fp_rate_is_bounded_fraction() {
        let s = BitStore::new(BitStoreParams {
            max_table_bytes: 1024,
            n_tables: 2,
        });
        for i in 0..100u64 {
            s.insert(i * 17 + 3).unwrap();
        }
        assert!(s.estimated_fp() >= 0.0);
    }

    #[test]
    fn save_then_load_round_trips_membership() {
        let s = BitStore::new(BitStoreParams {
            max_table_bytes: 2048,
            n_tables: 3,
        });
        for i in 0..50u64 {
            s.insert(i * 31 + 7).unwrap();
        }
        let mut buf = Vec::new();
        s.save(&mut buf).unwrap();
        let loaded = BitStore::load(&mut &buf[..]).unwrap();
        for i in 0..50u64 {
            assert_eq!(loaded.query(i * 31 + 7), 1);
        }
        assert_eq!(loaded.n_occupied(), s.n_occupied());
    }
}
