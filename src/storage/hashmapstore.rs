//! Exact map hash -> count. No false positives; counting is unbounded.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::RwLock;

use super::{read_header, type_tag, MembershipStore, STORE_ABI_VERSION};
use crate::error::CdbgError;

#[derive(Default)]
pub struct HashMapStore {
    map: RwLock<HashMap<u64, u64>>,
    n_unique: AtomicU64,
}

impl HashMapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipStore for HashMapStore {
    fn insert(&self, h: u64) -> Result<bool, CdbgError> {
        let mut guard = self.map.write();
        let entry = guard.entry(h).or_insert(0);
        let newly = *entry == 0;
        *entry += 1;
        drop(guard);
        if newly {
            self.n_unique.fetch_add(1, Ordering::Relaxed);
        }
        Ok(newly)
    }

    fn insert_and_query(&self, h: u64) -> Result<u64, CdbgError> {
        let mut guard = self.map.write();
        let entry = guard.entry(h).or_insert(0);
        let newly = *entry == 0;
        *entry += 1;
        let count = *entry;
        drop(guard);
        if newly {
            self.n_unique.fetch_add(1, Ordering::Relaxed);
        }
        Ok(count)
    }

    fn query(&self, h: u64) -> u64 {
        *self.map.read().get(&h).unwrap_or(&0)
    }

    fn n_unique_kmers(&self) -> u64 {
        self.n_unique.load(Ordering::Relaxed)
    }

    fn n_occupied(&self) -> u64 {
        self.map.read().len() as u64
    }

    fn estimated_fp(&self) -> f64 {
        0.0
    }

    fn save(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(&type_tag("HashMap"))?;
        w.write_u64::<LittleEndian>(STORE_ABI_VERSION)?;
        let guard = self.map.read();
        w.write_u64::<LittleEndian>(guard.len() as u64)?;
        for (&h, &c) in guard.iter() {
            w.write_u64::<LittleEndian>(h)?;
            w.write_u64::<LittleEndian>(c)?;
        }
        Ok(())
    }
}

impl HashMapStore {
    pub fn load(r: &mut dyn Read) -> io::Result<Self> {
        read_header(r, "HashMap")?;
        let n = r.read_u64::<LittleEndian>()?;
        let store = HashMapStore::new();
        let mut map = store.map.write();
        for _ in 0..n {
            let h = r.read_u64::<LittleEndian>()?;
            let c = r.read_u64::<LittleEndian>()?;
            map.insert(h, c);
        }
        drop(map);
        store.n_unique.store(n, Ordering::Relaxed);
        Ok(store)
    }
}
