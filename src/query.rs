//! Read path: stored transcripts and genes as seen through one submission.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::chain::{Interval, build_chain, cut};
use crate::codon;
use crate::error::Error;
use crate::fasta::IndexedFasta;
use crate::sequence::extract;
use crate::store::Store;
use crate::strand::Strand;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptView {
    pub tid: u64,
    pub sva_id: u64,
    pub transcript_id: String,
    pub seqid: String,
    pub strand: Strand,
    pub exons: Vec<Interval>,
    pub cds: Vec<Interval>,
    pub nucleotides: String,
    pub cds_nucleotides: String,
    /// `None` when the transcript has no CDS.
    pub protein: Option<String>,
    pub transcript_type: (String, String),
    pub attributes: BTreeMap<String, String>,
}

/// Assemble the view of internal transcript `tid` as submitted under
/// `transcript_id` by `sva_id`, named and sequenced under `nomenclature`.
///
/// The exon chain is rebuilt from the stored span and introns, then cut to the
/// submission's own span; the CDS chain is the same chain cut to its CDS span.
pub fn transcript_view<S: Store + ?Sized>(
    store: &S,
    assembly_id: u64,
    nomenclature: &str,
    tid: u64,
    sva_id: u64,
    transcript_id: &str,
) -> Result<TranscriptView, Error> {
    let sva = store
        .source_version_assembly(sva_id)
        .filter(|s| s.assembly_id == assembly_id)
        .ok_or_else(|| {
            Error::Validation(format!(
                "source version assembly {sva_id} does not belong to assembly {assembly_id}"
            ))
        })?;
    let stored = store
        .transcript(tid, nomenclature)
        .ok_or_else(|| {
            Error::Validation(format!(
                "transcript {tid} has no sequence named under '{nomenclature}'"
            ))
        })?;
    let xref = store
        .cross_reference(tid, sva.sva_id, transcript_id)
        .ok_or_else(|| {
            Error::Validation(format!(
                "no cross-reference for transcript {tid} as '{transcript_id}' in {sva_id}"
            ))
        })?;

    let chain = build_chain(stored.span, &stored.introns)?;
    let exons = cut(&chain, xref.span.0, xref.span.1);
    let cds = xref
        .cds
        .map(|(start, end)| cut(&chain, start, end))
        .unwrap_or_default();

    let genome = store
        .genome_file(assembly_id, nomenclature)
        .ok_or_else(|| {
            Error::SequenceSourceUnavailable(format!(
                "no genome file for assembly {assembly_id} under '{nomenclature}'"
            ))
        })?;
    let fasta = IndexedFasta::open(&genome.path)?;
    let nucleotides = extract(&exons, stored.strand, &fasta, &stored.seqid)?;
    let cds_nucleotides = extract(&cds, stored.strand, &fasta, &stored.seqid)?;
    let protein = codon::translate(&cds_nucleotides);

    let attributes = store
        .attributes(tid, sva_id, transcript_id)
        .into_iter()
        .map(|a| {
            let value = a.value().to_string();
            (a.key, value)
        })
        .collect();

    Ok(TranscriptView {
        tid,
        sva_id,
        transcript_id: transcript_id.to_string(),
        seqid: stored.seqid,
        strand: stored.strand,
        exons,
        cds,
        nucleotides: String::from_utf8_lossy(&nucleotides).into_owned(),
        cds_nucleotides: String::from_utf8_lossy(&cds_nucleotides).into_owned(),
        protein: protein.map(|p| String::from_utf8_lossy(&p).into_owned()),
        transcript_type: (xref.type_key, xref.type_value),
        attributes,
    })
}

/// One transcript of a gene, cut to the span its submission gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneTranscript {
    pub tid: u64,
    pub transcript_id: String,
    pub seqid: String,
    pub strand: Strand,
    pub span: Interval,
    pub exons: Vec<Interval>,
    pub cds: Vec<Interval>,
    pub transcript_type: (String, String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneView {
    pub gid: u64,
    pub sva_id: u64,
    pub gene_id: String,
    pub name: String,
    pub gene_type: (String, String),
    /// Ordered by transcript id.
    pub transcripts: Vec<GeneTranscript>,
}

/// Assemble gene `gid` with every transcript its submission bound to it,
/// sequence names under `nomenclature`. No sequence is read.
pub fn gene_view<S: Store + ?Sized>(store: &S, gid: u64, nomenclature: &str) -> Result<GeneView, Error> {
    let gene = store
        .gene(gid)
        .ok_or_else(|| Error::Validation(format!("unknown gene {gid}")))?;

    let mut transcripts = Vec::new();
    for xref in store.gene_cross_references(gid) {
        let stored = store.transcript(xref.tid, nomenclature).ok_or_else(|| {
            Error::Validation(format!(
                "transcript {} has no sequence named under '{nomenclature}'",
                xref.tid
            ))
        })?;
        let chain = build_chain(stored.span, &stored.introns)?;
        let cds = xref
            .cds
            .map(|(start, end)| cut(&chain, start, end))
            .unwrap_or_default();
        transcripts.push(GeneTranscript {
            tid: xref.tid,
            exons: cut(&chain, xref.span.0, xref.span.1),
            cds,
            transcript_id: xref.transcript_id,
            seqid: stored.seqid,
            strand: stored.strand,
            span: xref.span,
            transcript_type: (xref.type_key, xref.type_value),
        });
    }

    Ok(GeneView {
        gid,
        sva_id: gene.sva_id,
        gene_id: gene.gene_id,
        name: gene.name,
        gene_type: (gene.type_key, gene.type_value),
        transcripts,
    })
}
