//! Streaming, incrementally-maintained compact de Bruijn graph engine.
//!
//! See `spec.md`/`SPEC_FULL.md` for the full functional specification and
//! `DESIGN.md` for the per-module grounding ledger. Module layout mirrors
//! the teacher's flat `src/` (`examples/DPDmancul-closed-unitigs`), widened
//! from its single-file `graph`/`unitig`/`utils` split into one module per
//! capability (`spec.md` §4).

pub mod alphabet;
pub mod cdbg;
pub mod cli;
pub mod compactor;
pub mod config;
pub mod dbg;
pub mod error;
pub mod filters;
pub mod hashing;
pub mod metrics;
pub mod minimizer;
pub mod serialize;
pub mod storage;
pub mod traversal;

pub use compactor::{Compactor, InsertOutcome};
pub use config::Config;
pub use error::CdbgError;
pub use metrics::Report;
