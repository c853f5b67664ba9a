//! Minimal FASTA/GFA1 emission over a [`CdbgStore`] (`spec.md` §6 Outputs),
//! off by default and scoped to what the E1-E6 scenarios need to round-trip:
//! unitig sequences in, unitig records out. Edge emission is left for a
//! separate feature per `spec.md` §9's open question on GraphML/GFA1 edges.
//!
//! Grounded on the teacher's `Graph::close`
//! (`examples/DPDmancul-closed-unitigs/src/graph.rs`), whose
//! `writeln!(fasta, ">\n{}", u)` convention this mirrors, generalized from a
//! bare header line to one carrying the unitig's id and [`NodeMeta`].

use std::io::{self, Write};

use crate::cdbg::{CdbgStore, NodeMeta};

/// Writes one FASTA record per live unitig: `>unitig_<id> meta=<META>`
/// followed by the sequence, in ascending id order.
///
/// Enumerates via [`CdbgStore::unodes`] rather than `0..n_unodes()` — ids
/// are monotonic with tombstoned gaps left by splits/merges, so the live
/// count under-covers the live id space as soon as anything has split or
/// merged.
pub fn write_fasta(store: &CdbgStore, w: &mut dyn Write) -> io::Result<()> {
    let mut nodes = store.unodes();
    nodes.sort_by_key(|n| n.id.0);
    for node in &nodes {
        writeln!(w, ">unitig_{} meta={}", node.id.0, meta_label(node.meta))?;
        writeln!(w, "{}", node.sequence)?;
    }
    Ok(())
}

/// Writes a node-only GFA1 subset: one `S` record per live unitig
/// (`S\t<id>\t<sequence>\tLN:i:<len>`), tagged with its [`NodeMeta`] as an
/// optional field. No `L` records are emitted (`spec.md` §9 open question).
pub fn write_gfa1(store: &CdbgStore, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "H\tVN:Z:1.0")?;
    let mut nodes = store.unodes();
    nodes.sort_by_key(|n| n.id.0);
    for node in &nodes {
        writeln!(
            w,
            "S\t{}\t{}\tLN:i:{}\tME:Z:{}",
            node.id.0,
            node.sequence,
            node.sequence.len(),
            meta_label(node.meta)
        )?;
    }
    Ok(())
}

fn meta_label(meta: NodeMeta) -> &'static str {
    match meta {
        NodeMeta::Full => "FULL",
        NodeMeta::Tip => "TIP",
        NodeMeta::Island => "ISLAND",
        NodeMeta::Circular => "CIRCULAR",
        NodeMeta::Loop => "LOOP",
        NodeMeta::Trivial => "TRIVIAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdbg::CdbgStore;

    #[test]
    fn fasta_emits_one_record_per_unitig() {
        let store = CdbgStore::new();
        store.build_unode("ACGTACGT".into(), 1, 2, vec![], NodeMeta::Island);
        store.build_unode("GGTTGGTT".into(), 3, 4, vec![], NodeMeta::Tip);

        let mut buf = Vec::new();
        write_fasta(&store, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().count(), 4);
        assert!(text.contains(">unitig_0 meta=ISLAND"));
        assert!(text.contains("ACGTACGT"));
        assert!(text.contains(">unitig_1 meta=TIP"));
        assert!(text.contains("GGTTGGTT"));
    }

    #[test]
    fn gfa1_emits_header_and_one_s_record_per_unitig() {
        let store = CdbgStore::new();
        store.build_unode("ACGTACGT".into(), 1, 2, vec![], NodeMeta::Island);

        let mut buf = Vec::new();
        write_gfa1(&store, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("H\tVN:Z:1.0"));
        assert_eq!(lines.next(), Some("S\t0\tACGTACGT\tLN:i:8\tME:Z:ISLAND"));
        assert_eq!(lines.next(), None);
    }
}
