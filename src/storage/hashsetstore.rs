//! Exact set of 64-bit hashes. No false positives, no counting.

use std::collections::HashSet;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::RwLock;

use super::{read_header, type_tag, MembershipStore, STORE_ABI_VERSION};
use crate::error::CdbgError;

#[derive(Default)]
pub struct HashSetStore {
    set: RwLock<HashSet<u64>>,
    n_unique: AtomicU64,
}

impl HashSetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipStore for HashSetStore {
    fn insert(&self, h: u64) -> Result<bool, CdbgError> {
        let newly = self.set.write().insert(h);
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
        if self.set.read().contains(&h) {
            1
        } else {
            0
        }
    }

    fn n_unique_kmers(&self) -> u64 {
        self.n_unique.load(Ordering::Relaxed)
    }

    fn n_occupied(&self) -> u64 {
        self.set.read().len() as u64
    }

    fn estimated_fp(&self) -> f64 {
        0.0
    }

    fn save(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(&type_tag("HashSet"))?;
        w.write_u64::<LittleEndian>(STORE_ABI_VERSION)?;
        let guard = self.set.read();
        w.write_u64::<LittleEndian>(guard.len() as u64)?;
        for &h in guard.iter() {
            w.write_u64::<LittleEndian>(h)?;
        }
        Ok(())
    }
}

impl HashSetStore {
    pub fn load(r: &mut dyn Read) -> io::Result<Self> {
        read_header(r, "HashSet")?;
        let n = r.read_u64::<LittleEndian>()?;
        let store = HashSetStore::new();
        let mut set = store.set.write();
        for _ in 0..n {
            set.insert(r.read_u64::<LittleEndian>()?);
        }
        drop(set);
        store.n_unique.store(n, Ordering::Relaxed);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_newness_exactly_once() {
        let s = HashSetStore::new();
        assert!(s.insert(42).unwrap());
        assert!(!s.insert(42).unwrap());
        assert_eq!(s.query(42), 1);
        assert_eq!(s.n_unique_kmers(), 1);
    }

    #[test]
    fn query_is_zero_fp_for_absent_hash() {
        let s = HashSetStore::new();
        assert_eq!(s.query(7), 0);
        assert_eq!(s.estimated_fp(), 0.0);
    }

    #[test]
    fn save_then_load_round_trips_membership() {
        let s = HashSetStore::new();
        for i in 0..20u64 {
            s.insert(i * 5 + 1).unwrap();
        }
        let mut buf = Vec::new();
        s.save(&mut buf).unwrap();
        let loaded = HashSetStore::load(&mut &buf[..]).unwrap();
        for i in 0..20u64 {
            assert_eq!(loaded.query(i * 5 + 1), 1);
        }
        assert_eq!(loaded.n_unique_kmers(), s.n_unique_kmers());
    }
}
