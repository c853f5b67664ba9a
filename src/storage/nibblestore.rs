//! Count-min sketch with 4-bit saturating counters (max count 15), grounded
//! on `examples/original_source/include/goetia/storage/nibblestorage.hh`.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{read_header, type_tag, MembershipStore, STORE_ABI_VERSION};
use crate::error::CdbgError;

pub const NIBBLE_MAX: u8 = 15;

#[derive(Clone, Copy, Debug)]
pub struct NibbleStoreParams {
    pub max_table_bytes: u64,
    pub n_tables: u16,
}

impl Default for NibbleStoreParams {
    fn default() -> Self {
        NibbleStoreParams {
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

pub struct NibbleStore {
    params: NibbleStoreParams,
    tables: Vec<Vec<AtomicU8>>,
    table_slots: Vec<u64>,
    n_unique: AtomicU64,
}

impl NibbleStore {
    pub fn new(params: NibbleStoreParams) -> Self {
        let slots_requested = (params.max_table_bytes * 2).max(16);
        let mut table_slots = Vec::with_capacity(params.n_tables as usize);
        let mut tables = Vec::with_capacity(params.n_tables as usize);
        for t in 0..params.n_tables {
            let candidate = slots_requested.saturating_sub(t as u64 * 2).max(16);
            let slots = prev_prime(candidate);
            let bytes = ((slots + 1) / 2) as usize;
            table_slots.push(slots);
            tables.push((0..bytes).map(|_| AtomicU8::new(0)).collect());
        }
        NibbleStore {
            params,
            tables,
            table_slots,
            n_unique: AtomicU64::new(0),
        }
    }

    fn slot(&self, table: u16, h: u64) -> u64 {
        mix(h, table) % self.table_slots[table as usize]
    }

    fn get_nibble(byte: u8, hi: bool) -> u8 {
        if hi {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    fn set_nibble(byte: u8, hi: bool, value: u8) -> u8 {
        if hi {
            (byte & 0x0F) | (value << 4)
        } else {
            (byte & 0xF0) | value
        }
    }

    /// Increments the counter for `h` in `table`, saturating at
    /// [`NIBBLE_MAX`]. Returns the counter's value *before* this increment.
    fn bump(&self, table: u16, h: u64) -> u8 {
        let slot = self.slot(table, h);
        let byte_idx = (slot / 2) as usize;
        let hi = slot % 2 == 1;
        let cell = &self.tables[table as usize][byte_idx];
        loop {
            let current = cell.load(Ordering::Acquire);
            let before = Self::get_nibble(current, hi);
            let after = before.saturating_add(1).min(NIBBLE_MAX);
            let updated = Self::set_nibble(current, hi, after);
            if cell
                .compare_exchange_weak(current, updated, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return before;
            }
        }
    }

    fn read(&self, table: u16, h: u64) -> u8 {
        let slot = self.slot(table, h);
        let byte_idx = (slot / 2) as usize;
        let hi = slot % 2 == 1;
        Self::get_nibble(self.tables[table as usize][byte_idx].load(Ordering::Acquire), hi)
    }
}

impl MembershipStore for NibbleStore {
    fn insert(&self, h: u64) -> Result<bool, CdbgError> {
        let mut min_before = NIBBLE_MAX;
        for t in 0..self.params.n_tables {
            min_before = min_before.min(self.bump(t, h));
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
        (0..self.params.n_tables)
            .map(|t| self.read(t, h))
            .min()
            .unwrap_or(0) as u64
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
        let avg_slots: f64 =
            self.table_slots.iter().map(|&s| s as f64).sum::<f64>() / n_tables;
        (self.n_unique_kmers() as f64 / avg_slots).powf(n_tables)
    }

    fn save(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(&type_tag("Nibble"))?;
        w.write_u64::<LittleEndian>(STORE_ABI_VERSION)?;
        w.write_u64::<LittleEndian>(self.params.max_table_bytes)?;
        w.write_u16::<LittleEndian>(self.params.n_tables)?;
        w.write_u64::<LittleEndian>(self.n_unique.load(Ordering::Acquire))?;
        for table in &self.tables {
            for byte in table {
                w.write_u8(byte.load(Ordering::Acquire))?;
            }
        }
        Ok(())
    }
}

impl NibbleStore {
    pub fn load(r: &mut dyn Read) -> io::Result<Self> {
        read_header(r, "Nibble")?;
        let max_table_bytes = r.read_u64::<LittleEndian>()?;
        let n_tables = r.read_u16::<LittleEndian>()?;
        let n_unique = r.read_u64::<LittleEndian>()?;
        let store = NibbleStore::new(NibbleStoreParams {
            max_table_bytes,
            n_tables,
        });
        for table in &store.tables {
            for byte in table {
                byte.store(r.read_u8()?, Ordering::Release);
            }
        }
        store.n_unique.store(n_unique, Ordering::Relaxed);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_saturate_at_fifteen() {
        let s = NibbleStore::new(NibbleStoreParams {
            max_table_bytes: 64,
            n_tables: 2,
        });
        for _ in 0..30 {
            s.insert(9).unwrap();
        }
        assert_eq!(s.query(9), NIBBLE_MAX as u64);
    }

    #[test]
    fn first_insert_is_newly_added() {
        let s = NibbleStore::new(NibbleStoreParams::default());
        assert!(s.insert(5).unwrap());
        assert!(!s.insert(5).unwrap());
    }

    #[test]
    fn save_then_load_round_trips_counts() {
        let s = NibbleStore::new(NibbleStoreParams {
            max_table_bytes: 64,
            n_tables: 2,
        });
        for _ in 0..5 {
            s.insert(9).unwrap();
        }
        let mut buf = Vec::new();
        s.save(&mut buf).unwrap();
        let loaded = NibbleStore::load(&mut &buf[..]).unwrap();
        assert_eq!(loaded.query(9), 5);
        assert_eq!(loaded.n_unique_kmers(), s.n_unique_kmers());
    }
}
