//! `cdbgctl` argument parsing and subcommand dispatch (`spec.md` §6's CLI
//! surface), kept separate from `src/bin/cdbgctl.rs` so the command logic is
//! unit-testable without a process boundary.
//!
//! Grounded on the wider pack's clap-derive convention (e.g.
//! `examples/Dicklesworthstone-glibc_rust/crates/glibc-rs-harness/src/bin/harness.rs`'s
//! `Parser`/`Subcommand` split) — the teacher's own `main.rs` parses
//! `std::env::args()` by hand, but `spec.md` §6 ADD calls for a real `clap`
//! surface, so this leans on the pack rather than the teacher for the CLI's
//! shape.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, Dna, DnaN, Iupac};
use crate::cdbg::NodeMeta;
use crate::compactor::Compactor;
use crate::config::{AlphabetKind, Config, HasherKind};
use crate::dbg::Dbg;
use crate::error::CdbgError;
use crate::hashing::canonical::CanonicalHasher;
use crate::hashing::cyclic::CyclicHasher;
use crate::hashing::{HashShifter, NewWithK};

/// `spec.md` §6: "Exit 0 on success; 1 on I/O error; 2 on invalid
/// configuration; 3 on internal invariant violation."
pub fn exit_code_for(err: &CdbgError) -> i32 {
    match err {
        CdbgError::Io(_) => 1,
        CdbgError::Config(_) => 2,
        CdbgError::Invariant(_) | CdbgError::Store(_) => 3,
        CdbgError::Alphabet(_) | CdbgError::Hash(_) => 2,
    }
}

#[derive(Debug, Parser)]
#[command(name = "cdbgctl")]
#[command(about = "Streaming compact de Bruijn graph engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fold reads from one or more FASTA-ish input files into a cDBG.
    Compact {
        /// Input files, one sequence per non-header line (lines starting
        /// with '>' are treated as record names and skipped).
        #[arg(long, required = true)]
        input: Vec<PathBuf>,
        /// Optional JSON config file (overrides the flags below where set).
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 21)]
        k: usize,
        #[arg(long, value_enum, default_value = "canonical")]
        hasher: CliHasherKind,
        #[arg(long, value_enum, default_value = "dna")]
        alphabet: CliAlphabetKind,
        /// Written as `<prefix>.report.json`.
        #[arg(long)]
        output_prefix: PathBuf,
    },
    /// Load a serialized [`crate::metrics::Report`] and print it.
    Inspect {
        #[arg(long)]
        report: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliHasherKind {
    Forward,
    Canonical,
}

impl From<CliHasherKind> for HasherKind {
    fn from(v: CliHasherKind) -> Self {
        match v {
            CliHasherKind::Forward => HasherKind::Forward,
            CliHasherKind::Canonical => HasherKind::Canonical,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliAlphabetKind {
    Dna,
    DnaN,
    Iupac,
}

impl From<CliAlphabetKind> for AlphabetKind {
    fn from(v: CliAlphabetKind) -> Self {
        match v {
            CliAlphabetKind::Dna => AlphabetKind::Dna,
            CliAlphabetKind::DnaN => AlphabetKind::DnaN,
            CliAlphabetKind::Iupac => AlphabetKind::Iupac,
        }
    }
}

/// A `Report` plus enough metadata to make a dumped JSON file self-describing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportFile {
    pub k: usize,
    pub n_sequences: usize,
    pub n_kmers_total: usize,
    pub n_new_kmers_total: usize,
    pub report: crate::metrics::Report,
}

fn read_sequences(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>, CdbgError> {
    let mut out = Vec::new();
    for path in paths {
        let file = File::open(path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('>') {
                continue;
            }
            out.push(line.as_bytes().to_vec());
        }
    }
    Ok(out)
}

fn run_compact_with<H: HashShifter + NewWithK>(
    cfg: &Config,
    symbols: Vec<u8>,
    sequences: &[Vec<u8>],
) -> Result<ReportFile, CdbgError> {
    let store = cfg.storage.build();
    let dbg = Dbg::new(Arc::from(store), cfg.k, symbols);
    let compactor = Compactor::<H>::new(dbg).with_minimizer_window(cfg.minimizer_window);

    let mut n_kmers_total = 0;
    let mut n_new_kmers_total = 0;
    let mut n_sequences = 0;
    for seq in sequences {
        if seq.len() < cfg.k {
            continue;
        }
        let outcome = compactor.insert_sequence(seq)?;
        n_kmers_total += outcome.n_kmers;
        n_new_kmers_total += outcome.n_new_kmers;
        n_sequences += 1;
    }

    Ok(ReportFile {
        k: cfg.k,
        n_sequences,
        n_kmers_total,
        n_new_kmers_total,
        report: compactor.report(),
    })
}

/// The hasher's alphabet is a compile-time type parameter, but `hasher_kind`
/// and `alphabet_kind` are both runtime-selected (`spec.md` §6's config
/// table); dispatch explicitly over all six closed combinations rather than
/// reaching for a `dyn` hasher, per `spec.md` §9's capability-set
/// abstraction.
fn run_compact(cfg: &Config, sequences: &[Vec<u8>]) -> Result<ReportFile, CdbgError> {
    match (cfg.hasher, cfg.alphabet) {
        (HasherKind::Forward, AlphabetKind::Dna) => {
            run_compact_with::<CyclicHasher<Dna>>(cfg, Dna::SYMBOLS.to_vec(), sequences)
        }
        (HasherKind::Forward, AlphabetKind::DnaN) => {
            run_compact_with::<CyclicHasher<DnaN>>(cfg, DnaN::SYMBOLS.to_vec(), sequences)
        }
        (HasherKind::Forward, AlphabetKind::Iupac) => {
            run_compact_with::<CyclicHasher<Iupac>>(cfg, Iupac::SYMBOLS.to_vec(), sequences)
        }
        (HasherKind::Canonical, AlphabetKind::Dna) => {
            run_compact_with::<CanonicalHasher<Dna>>(cfg, Dna::SYMBOLS.to_vec(), sequences)
        }
        (HasherKind::Canonical, AlphabetKind::DnaN) => {
            run_compact_with::<CanonicalHasher<DnaN>>(cfg, DnaN::SYMBOLS.to_vec(), sequences)
        }
        (HasherKind::Canonical, AlphabetKind::Iupac) => {
            run_compact_with::<CanonicalHasher<Iupac>>(cfg, Iupac::SYMBOLS.to_vec(), sequences)
        }
    }
}

pub fn dispatch(cli: Cli) -> Result<(), CdbgError> {
    match cli.command {
        Command::Compact {
            input,
            config,
            k,
            hasher,
            alphabet,
            output_prefix,
        } => {
            let cfg = match config {
                Some(path) => {
                    let text = std::fs::read_to_string(path)?;
                    serde_json::from_str::<Config>(&text)
                        .map_err(|e| CdbgError::Config(e.to_string()))?
                }
                None => Config::builder()
                    .k(k)
                    .hasher(hasher.into())
                    .alphabet(alphabet.into())
                    .build()?,
            };
            cfg.validate()?;

            let sequences = read_sequences(&input)?;
            let report = run_compact(&cfg, &sequences)?;

            let out_path = {
                let mut p = output_prefix.clone();
                let mut file_name = p.file_name().map(|s| s.to_owned()).unwrap_or_default();
                file_name.push(".report.json");
                p.set_file_name(file_name);
                p
            };
            let mut f = File::create(&out_path)?;
            let json = serde_json::to_string_pretty(&report).map_err(|e| CdbgError::Config(e.to_string()))?;
            f.write_all(json.as_bytes())?;

            tracing::info!(
                n_sequences = report.n_sequences,
                n_unodes = report.report.n_unodes,
                n_dnodes = report.report.n_dnodes,
                "compaction complete"
            );
            Ok(())
        }
        Command::Inspect { report } => {
            let text = std::fs::read_to_string(&report)?;
            let parsed: ReportFile = serde_json::from_str(&text).map_err(|e| CdbgError::Config(e.to_string()))?;
            println!("k                = {}", parsed.k);
            println!("n_sequences      = {}", parsed.n_sequences);
            println!("n_kmers_total    = {}", parsed.n_kmers_total);
            println!("n_new_kmers      = {}", parsed.n_new_kmers_total);
            println!("n_unodes         = {}", parsed.report.n_unodes);
            println!("  full           = {}", parsed.report.n_full);
            println!("  tips           = {}", parsed.report.n_tips);
            println!("  islands        = {}", parsed.report.n_islands);
            println!("  trivial        = {}", parsed.report.n_trivial);
            println!("  circular       = {}", parsed.report.n_circular);
            println!("  loops          = {}", parsed.report.n_loops);
            println!("n_dnodes         = {}", parsed.report.n_dnodes);
            println!("n_splits/merges  = {}/{}", parsed.report.n_splits, parsed.report.n_merges);
            println!("dominant meta    = {:?}", dominant_meta(&parsed.report));
            Ok(())
        }
    }
}

/// The most common [`NodeMeta`] category in a [`crate::metrics::Report`],
/// for `inspect`'s summary line.
fn dominant_meta(report: &crate::metrics::Report) -> NodeMeta {
    let pairs = [
        (NodeMeta::Full, report.n_full),
        (NodeMeta::Tip, report.n_tips),
        (NodeMeta::Island, report.n_islands),
        (NodeMeta::Trivial, report.n_trivial),
        (NodeMeta::Circular, report.n_circular),
        (NodeMeta::Loop, report.n_loops),
    ];
    pairs.into_iter().max_by_key(|(_, n)| *n).map(|(m, _)| m).unwrap_or(NodeMeta::Island)
}
