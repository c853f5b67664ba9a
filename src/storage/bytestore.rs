//! Count-min sketch with 8-bit saturating counters, plus a spill map that
//! tracks counts beyond 255 so counting is effectively unbounded, grounded
//! on `examples/original_source/include/goetia/storage/bytestorage.hh`.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;

use super::{read_header, type_tag, MembershipStore, STORE_ABI_VERSION};
use crate::error::CdbgError;

pub const BYTE_MAX: u8 = 255;

#[derive(Clone, Copy, Debug)]
pub struct ByteStoreParams {
    pub max_table_bytes: u64,
    pub n_tables: u16,
}

impl Default for ByteStoreParams {
    fn default() -> Self {
        ByteStoreParams {
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

pub struct ByteStore {
    params: ByteStoreParams,
    tables: Vec<Vec<AtomicU8>>,
    table_slots: Vec<u64>,
    /// Extra count accumulated once a hash's minimum counter has saturated
    /// at [`BYTE_MAX`] in every table.
    spill: Mutex<HashMap<u64, u64>>,
    n_unique: AtomicU64,
}

impl ByteStore {
    pub fn new(params: ByteStoreParams) -> Self {
        let slots_requested = params.max_table_bytes.max(16);
        let mut table_slots = Vec::with_capacity(params.n_tables as usize);
        let mut tables = Vec::with_capacity(params.n_tables as usize);
        for t in 0..params.n_tables {
            let candidate = slots_requested.saturating_sub(t as u64 * 2).max(16);
            let slots = prev_prime(candidate);
            table_slots.push(slots);
            tables.push((0..slots as usize).map(|_| AtomicU8::new(0)).collect());
        }
        ByteStore {
            params,
            tables,
            table_slots,
            spill: Mutex::new(HashMap::new()),
            n_unique: AtomicU64::new(0),
        }
    }

    fn slot(&self, table: u16, h: u64) -> usize {
        (mix(h, table) % self.table_slots[table as usize]) as usize
    }

    fn bump(&self, table: u16, h: u64) -> u8 {
        let slot = self.slot(table, h);
        let cell = &self.tables[table as usize][slot];
        loop {
            let current = cell.load(Ordering::Acquire);
            let after = current.saturating_add(1);
            if cell
                .compare_exchange_weak(current, after, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return current;
            }
        }
    }

    fn read(&self, table: u16, h: u64) -> u8 {
        let slot = self.slot(table, h);
        self.tables[table as usize][slot].load(Ordering::Acquire)
    }

    fn min_byte(&self, h: u64) -> u8 {
        (0..self.params.n_tables).map(|t| self.read(t, h)).min().unwrap_or(0)
    }
}

impl MembershipStore for ByteStore {
    fn insert(&self, h: u64) -> Result<bool, CdbgError> {
        let mut min_before = BYTE_MAX;
        for t in 0..self.params.n_tables {
            min_before = min_before.min(self.bump(t, h));
        }
        if min_before == BYTE_MAX {
            *self.spill.lock().entry(h).or_insert(0) += 1;
        }
        let newly = min_before == 0;
        if newly {
            self.n_unique.fetch_add(1, Ordering::Relaxed);
        }
        Ok(newly)
    }

    fn insert_and_query(&self, h: u64) -> Result<u64, CdbgError> {
        self.insert(h)?;
        Ok(self.query(h))
    }

    fn query(&self, h: u64) -> u64 {
        let min_byte = self.min_byte(h);
        if min_byte == BYTE_MAX {
            min_byte as u64 + self.spill.lock().get(&h).copied().unwrap_or(0)
        } else {
            min_byte as u64
        }
    }

    fn n_unique_kmers(&self) -> u64 {
        self.n_unique.load(Ordering::Relaxed)
    }

    fn n_occupied(&self) -> u64 {
        self.tables
            .iter()
            .flat_map(|t| t.iter())
            .filter(|b| b.load(Ordering::Acquire) != 0)
            .count() as u64
    }

    fn estimated_fp(&self) -> f64 {
        let n_tables = self.params.n_tables as f64;
        if n_tables == 0.0 {
            return 0.0;
        }
        let avg_slots: f64 = self.table_slots.iter().map(|&s| s as f64).sum::<f64>() / n_tables;
        (self.n_unique_kmers() as f64 / avg_slots).powf(n_tables)
    }

    fn save(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(&type_tag("ByteStor"))?;
        w.write_u64::<LittleEndian>(STORE_ABI_VERSION)?;
        w.write_u64::<LittleEndian>(self.params.max_table_bytes)?;
        w.write_u16::<LittleEndian>(self.params.n_tables)?;
        w.write_u64::<LittleEndian>(self.n_unique.load(Ordering::Acquire))?;
        for table in &self.tables {
            for byte in table {
                w.write_u8(byte.load(Ordering::Acquire))?;
            }
        }
        let spill = self.spill.lock();
        w.write_u64::<LittleEndian>(spill.len() as u64)?;
        for (&h, &extra) in spill.iter() {
            w.write_u64::<LittleEndian>(h)?;
            w.write_u64::<LittleEndian>(extra)?;
        }
        Ok(())
    }
}

impl ByteStore {
    /// Inverse of [`MembershipStore::save`]. `n_unique` is persisted
    /// directly rather than re-derived, since min-byte-nonzero over the
    /// loaded tables is not the same predicate that counted it originally.
    pub fn load(r: &mut dyn Read) -> io::Result<Self> {
        read_header(r, "ByteStor")?;
        let max_table_bytes = r.read_u64::<LittleEndian>()?;
        let n_tables = r.read_u16::<LittleEndian>()?;
        let n_unique = r.read_u64::<LittleEndian>()?;
        let store = ByteStore::new(ByteStoreParams {
            max_table_bytes,
            n_tables,
        });
        for table in &store.tables {
            for byte in table {
                byte.store(r.read_u8()?, Ordering::Release);
            }
        }
        let spill_len = r.read_u64::<LittleEndian>()?;
        let mut spill = store.spill.lock();
        for _ in 0..spill_len {
            let h = r.read_u64::<LittleEndian>()?;
            let extra = r.read_u64::<LittleEndian>()?;
            spill.insert(h, extra);
        }
        drop(spill);
        store.n_unique.store(n_unique, Ordering::Relaxed);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_beyond_255_use_the_spill_map() {
        let s = ByteStore::new(ByteStoreParams {
            max_table_bytes: 64,
            n_tables: 2,
        });
        for _ in 0..300 {
            s.insert(11).unwrap();
        }
        assert_eq!(s.query(11), 300);
    }

    #[test]
    fn first_insert_is_newly_added() {
        let s = ByteStore::new(ByteStoreParams::default());
        assert!(s.insert(1).unwrap());
        assert!(!s.insert(1).unwrap());
    }

    #[test]
    fn save_then_load_round_trips_counts_and_spill() {
        let s = ByteStore::new(ByteStoreParams {
            max_table_bytes: 64,
            n_tables: 2,
        });
        for _ in 0..300 {
            s.insert(11).unwrap();
        }
        s.insert(23).unwrap();
        let mut buf = Vec::new();
        s.save(&mut buf).unwrap();
        let loaded = ByteStore::load(&mut &buf[..]).unwrap();
        assert_eq!(loaded.query(11), 300);
        assert_eq!(loaded.query(23), 1);
        assert_eq!(loaded.n_unique_kmers(), s.n_unique_kmers());
    }
}
