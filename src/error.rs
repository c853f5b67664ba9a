//! Crate-wide error taxonomy.
//!
//! Mirrors the layered-error pattern of the teacher crate's
//! `UnitigError`/`GraphError` split (`examples/DPDmancul-closed-unitigs/src/unitig.rs`,
//! `src/graph.rs`), but built on `thiserror` rather than `snafu` (see
//! `DESIGN.md`). Each layer gets its own error enum; [`CdbgError`] is the
//! top-level enum the rest of the crate returns, with `#[from]` conversions
//! bridging the layers the way `GraphError: From<UnitigError>` does in the
//! teacher.

use thiserror::Error;

/// Errors raised while validating or complementing alphabet symbols.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlphabetError {
    #[error("symbol '{symbol}' is not in the configured alphabet")]
    InvalidSymbol { symbol: char },
}

/// Errors raised by the rolling hash layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("sequence length ({len}) is shorter than k ({k})")]
    SequenceTooShort { len: usize, k: usize },

    #[error(transparent)]
    Alphabet(#[from] AlphabetError),
}

/// Errors raised by a [`crate::storage::MembershipStore`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store reached capacity and rejected an insert")]
    StoreFull,
}

/// Errors raised while mutating the cDBG store's indices.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("cdbg invariant violated: {context}")]
    Violation { context: String },

    #[error("split-retry loop failed to converge after {attempts} attempts")]
    SplitRetryExhausted { attempts: usize },
}

/// The crate-wide error type. Per `spec.md` §7, `StoreFull` and
/// `InvariantViolation` are treated as fatal by callers (they abort the
/// worker); `InvalidSymbol`/`SequenceTooShort` are per-read and are meant to
/// be caught and turned into a skip-and-count by the orchestrator.
#[derive(Debug, Error)]
pub enum CdbgError {
    #[error(transparent)]
    Alphabet(#[from] AlphabetError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CdbgError {
    /// True for the error classes `spec.md` §7 designates as fatal
    /// (the calling worker should abort rather than skip-and-continue).
    pub fn is_fatal(&self) -> bool {
        matches!(self, CdbgError::Store(_) | CdbgError::Invariant(_))
    }
}

pub type Result<T> = std::result::Result<T, CdbgError>;
