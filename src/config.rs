//! Typed, explicit configuration (`spec.md` §6). Every parameter the
//! compactor needs is constructed up front rather than discovered at
//! runtime, following the teacher's preference for explicit construction
//! (`Graph::new(k)`) generalized to the larger parameter set this engine
//! needs. Serializable with `serde` so the CLI can load it from a file, the
//! convention the wider pack's bioinformatics/systems crates use for their
//! own config layers (`seanchatmangpt-knhk`, `eric9n-Kun-peng`).

use serde::{Deserialize, Serialize};

use crate::error::CdbgError;
use crate::storage::bitstore::{BitStore, BitStoreParams};
use crate::storage::bytestore::{ByteStore, ByteStoreParams};
use crate::storage::hashmapstore::HashMapStore;
use crate::storage::hashsetstore::HashSetStore;
use crate::storage::nibblestore::{NibbleStore, NibbleStoreParams};
use crate::storage::qfstore::QfStore;
use crate::storage::MembershipStore;

/// Selects a concrete [`MembershipStore`] implementation (`spec.md` §4.3).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorageKind {
    Bit,
    Nibble,
    Byte,
    Qf,
    HashSet,
    HashMap,
}

/// Variant-specific construction parameters for [`StorageKind`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum StorageParams {
    Bit { max_table_bytes: u64, n_tables: u16 },
    Nibble { max_table_bytes: u64, n_tables: u16 },
    Byte { max_table_bytes: u64, n_tables: u16 },
    Qf { log2_slots: u8 },
    Exact,
}

impl StorageParams {
    pub fn kind(&self) -> StorageKind {
        match self {
            StorageParams::Bit { .. } => StorageKind::Bit,
            StorageParams::Nibble { .. } => StorageKind::Nibble,
            StorageParams::Byte { .. } => StorageKind::Byte,
            StorageParams::Qf { .. } => StorageKind::Qf,
            StorageParams::Exact => StorageKind::HashSet,
        }
    }

    pub fn build(&self) -> Box<dyn MembershipStore> {
        match *self {
            StorageParams::Bit {
                max_table_bytes,
                n_tables,
            } => Box::new(BitStore::new(BitStoreParams {
                max_table_bytes,
                n_tables,
            })),
            StorageParams::Nibble {
                max_table_bytes,
                n_tables,
            } => Box::new(NibbleStore::new(NibbleStoreParams {
                max_table_bytes,
                n_tables,
            })),
            StorageParams::Byte {
                max_table_bytes,
                n_tables,
            } => Box::new(ByteStore::new(ByteStoreParams {
                max_table_bytes,
                n_tables,
            })),
            StorageParams::Qf { log2_slots } => Box::new(QfStore::new(log2_slots)),
            StorageParams::Exact => Box::new(HashSetStore::new()),
        }
    }

    /// A counting-capable store for the exact-count variants (diginorm's
    /// auxiliary `counts` dBG needs `HashMap`, not `HashSet`).
    pub fn build_counting(&self) -> Box<dyn MembershipStore> {
        match self.kind() {
            StorageKind::HashSet => Box::new(HashMapStore::new()),
            _ => self.build(),
        }
    }
}

impl Default for StorageParams {
    fn default() -> Self {
        StorageParams::Exact
    }
}

/// Selects a concrete rolling-hash variant (`spec.md` §4.2).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HasherKind {
    Forward,
    Canonical,
}

impl Default for HasherKind {
    fn default() -> Self {
        HasherKind::Canonical
    }
}

/// Selects the alphabet k-mers are validated against (`spec.md` §4.1).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlphabetKind {
    Dna,
    DnaN,
    Iupac,
}

impl Default for AlphabetKind {
    fn default() -> Self {
        AlphabetKind::Dna
    }
}

/// Selects an optional pre-compactor filter (`spec.md` §4.7).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum FilterKind {
    None,
    Diginorm { cutoff: u32 },
    Solid { min_prop_solid: f64, solid_threshold: u32 },
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::None
    }
}

/// Whether an invalid-symbol read is rejected (fatal) or skipped.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SymbolPolicy {
    Strict,
    Lenient,
}

impl Default for SymbolPolicy {
    fn default() -> Self {
        SymbolPolicy::Lenient
    }
}

/// All explicit parameters for a [`crate::compactor::Compactor`] run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub k: usize,
    pub storage: StorageParams,
    pub hasher: HasherKind,
    pub alphabet: AlphabetKind,
    pub minimizer_window: usize,
    pub filter: FilterKind,
    pub symbol_policy: SymbolPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            k: 21,
            storage: StorageParams::default(),
            hasher: HasherKind::default(),
            alphabet: AlphabetKind::default(),
            minimizer_window: 8,
            filter: FilterKind::default(),
            symbol_policy: SymbolPolicy::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), CdbgError> {
        if !(5..=31).contains(&self.k) {
            return Err(CdbgError::Config(format!(
                "k must be in 5..=31, got {}",
                self.k
            )));
        }
        if self.minimizer_window == 0 {
            return Err(CdbgError::Config("minimizer_window must be >= 1".into()));
        }
        Ok(())
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`], following the construction style of the wider
/// pack's config layers (explicit setters, `build()` validates).
#[derive(Default)]
pub struct ConfigBuilder {
    cfg: Config,
}

impl ConfigBuilder {
    pub fn k(mut self, k: usize) -> Self {
        self.cfg.k = k;
        self
    }

    pub fn storage(mut self, storage: StorageParams) -> Self {
        self.cfg.storage = storage;
        self
    }

    pub fn hasher(mut self, hasher: HasherKind) -> Self {
        self.cfg.hasher = hasher;
        self
    }

    pub fn alphabet(mut self, alphabet: AlphabetKind) -> Self {
        self.cfg.alphabet = alphabet;
        self
    }

    pub fn minimizer_window(mut self, window: usize) -> Self {
        self.cfg.minimizer_window = window;
        self
    }

    pub fn filter(mut self, filter: FilterKind) -> Self {
        self.cfg.filter = filter;
        self
    }

    pub fn symbol_policy(mut self, policy: SymbolPolicy) -> Self {
        self.cfg.symbol_policy = policy;
        self
    }

    pub fn build(self) -> Result<Config, CdbgError> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_k() {
        assert!(Config::builder().k(3).build().is_err());
        assert!(Config::builder().k(32).build().is_err());
        assert!(Config::builder().k(21).build().is_ok());
    }
}
