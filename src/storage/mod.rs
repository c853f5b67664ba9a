//! Membership stores (`spec.md` §4.3): set- or counting-valued mappings from
//! hash to presence/count, with a closed set of six concrete variants
//! dispatched by construction-time tag rather than `dyn` trait objects in
//! hot loops, per `spec.md` §9's capability-set re-architecture.
//!
//! Grounded on `examples/original_source/include/goetia/storage/*.hh`
//! (`bitstorage`, `nibblestorage`, `bytestorage`, `qfstorage`, `phmapstorage`)
//! for the six variants' shapes, and on the wider pack's convergence on
//! `parking_lot` for interior-mutable shared state under concurrent access
//! (`Dicklesworthstone-glibc_rust`, `seanchatmangpt-knhk`).

pub mod bitstore;
pub mod bytestore;
pub mod hashmapstore;
pub mod hashsetstore;
pub mod nibblestore;
pub mod qfstore;

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{CdbgError, StoreError};

/// Common contract every membership store implements (`spec.md` §4.3).
///
/// All methods take `&self`: concurrent `insert` must be safe against
/// itself, so implementations use interior locking or atomics rather than
/// requiring exclusive access.
pub trait MembershipStore: Send + Sync {
    /// Insert `h`, returning `true` iff it was newly added (count
    /// transitioned from zero to at least one). For probabilistic stores
    /// this is true iff at least one underlying table bit/counter was zero
    /// before the insert.
    fn insert(&self, h: u64) -> Result<bool, CdbgError>;

    /// Insert `h` and return its post-insert count (0 or 1 for presence
    /// variants; clamped to the store's maximum for counting variants).
    fn insert_and_query(&self, h: u64) -> Result<u64, CdbgError>;

    /// The current count for `h`, without mutating the store.
    fn query(&self, h: u64) -> u64;

    /// Number of distinct hashes ever reported as newly inserted.
    fn n_unique_kmers(&self) -> u64;

    /// Number of occupied bins/counters/slots, store-specific.
    fn n_occupied(&self) -> u64;

    /// Estimated false-positive rate; `0.0` for exact stores.
    fn estimated_fp(&self) -> f64;

    /// Serialize this store's parameters and tables. The container format
    /// is opaque to the compactor (`spec.md` §4.3) but fixed per store type:
    /// an 8-byte type name, an 8-byte ABI version, then variant-specific
    /// parameters, then raw table bytes.
    fn save(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Current on-disk ABI version for every store's serialization format.
pub const STORE_ABI_VERSION: u64 = 1;

/// Pads `name` (must be <= 8 bytes) to an 8-byte type tag.
pub fn type_tag(name: &str) -> [u8; 8] {
    let mut tag = [b' '; 8];
    let bytes = name.as_bytes();
    let n = bytes.len().min(8);
    tag[..n].copy_from_slice(&bytes[..n]);
    tag
}

/// Reads the common "8-byte type name + 8-byte ABI version" header every
/// store's [`MembershipStore::save`] writes (`spec.md` §6 Outputs), checking
/// the tag matches `expect` and the version is one this build understands.
/// Each concrete store's `load` calls this before reading its own params and
/// table bytes.
pub(crate) fn read_header(r: &mut dyn Read, expect: &str) -> io::Result<()> {
    let mut tag = [0u8; 8];
    r.read_exact(&mut tag)?;
    if tag != type_tag(expect) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected store type tag {:?}, found {:?}", type_tag(expect), tag),
        ));
    }
    let version = r.read_u64::<LittleEndian>()?;
    if version != STORE_ABI_VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported store ABI version {version}"),
        ));
    }
    Ok(())
}

pub(crate) fn full_error() -> CdbgError {
    CdbgError::Store(StoreError::StoreFull)
}

/// Reads a store's leading 8-byte type tag without consuming it, by loading
/// the whole stream into memory first. `save`/`load` are used for
/// end-of-run persistence (`spec.md` §6 Outputs), not hot-path I/O, so this
/// one-shot buffering is acceptable.
pub fn load_any(r: &mut dyn Read) -> io::Result<Box<dyn MembershipStore>> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    if buf.len() < 8 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "store stream too short for a type tag",
        ));
    }
    let tag = &buf[..8];
    let mut cursor = &buf[..];
    if tag == type_tag("BitStor") {
        Ok(Box::new(bitstore::BitStore::load(&mut cursor)?))
    } else if tag == type_tag("Nibble") {
        Ok(Box::new(nibblestore::NibbleStore::load(&mut cursor)?))
    } else if tag == type_tag("ByteStor") {
        Ok(Box::new(bytestore::ByteStore::load(&mut cursor)?))
    } else if tag == type_tag("QF") {
        Ok(Box::new(qfstore::QfStore::load(&mut cursor)?))
    } else if tag == type_tag("HashSet") {
        Ok(Box::new(hashsetstore::HashSetStore::load(&mut cursor)?))
    } else if tag == type_tag("HashMap") {
        Ok(Box::new(hashmapstore::HashMapStore::load(&mut cursor)?))
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unrecognized store type tag {:?}", tag),
        ))
    }
}
