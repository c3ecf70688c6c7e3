use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::Error;
use crate::gtf;
use crate::gtf::entry::{GENE_ID_KEY, TRANSCRIPT_ID_KEY};
use crate::nomenclature::NomenclatureTable;
use crate::store::{
    AttributeValue, AttributeWrite, CrossReference, IntronKey, NewGene, NewTranscript, Store,
};
use crate::tracking::TrackingCorrespondence;
use crate::transcript::{AttributeKind, SemanticKeys, TranscriptRecord};

/// Scope and caller choices of one merge.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    pub assembly_id: u64,
    pub sva_id: u64,
    pub nomenclature: &'a str,
    pub keys: &'a SemanticKeys,
    pub attribute_types: &'a BTreeMap<String, AttributeKind>,
}

/// Row counts written by a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    pub transcripts_read: usize,
    pub genes: usize,
    pub new_transcripts: usize,
    pub matched_transcripts: usize,
    pub intron_links: usize,
    pub cross_references: usize,
    pub attributes_inserted: usize,
    pub attributes_concatenated: usize,
}

/// Merge every transcript of `cleaned`, in file order, into the store.
///
/// Transcripts the tracking file matches reuse the stored id; all others get a
/// new transcript row and links to (deduplicated) intron rows. Cross-references
/// are always new.
pub fn merge_annotation<S: Store + ?Sized>(
    store: &mut S,
    table: &NomenclatureTable,
    ctx: MergeContext<'_>,
    cleaned: &Path,
    tracking: &TrackingCorrespondence,
) -> Result<MergeCounts, Error> {
    let mut counts = MergeCounts::default();
    let mut genes: HashMap<String, u64> = HashMap::new();

    for block in gtf::read_blocks(cleaned)? {
        let record = TranscriptRecord::from_block(&block?, ctx.keys)?;
        counts.transcripts_read += 1;
        let sequence_id = table
            .sequence_id(ctx.nomenclature, &record.seqid)
            .ok_or_else(|| Error::unmapped([record.seqid.as_str()]))?;

        let gene = match genes.get(&record.gene_id) {
            Some(&gene) => gene,
            None => {
                let gene = store.insert_gene(NewGene {
                    sva_id: ctx.sva_id,
                    gene_id: record.gene_id.clone(),
                    name: record.gene_name(ctx.keys).unwrap_or_default().to_string(),
                    type_key: ctx.keys.gene_type.clone(),
                    type_value: record.gene_type(ctx.keys).unwrap_or_default().to_string(),
                })?;
                genes.insert(record.gene_id.clone(), gene);
                counts.genes += 1;
                gene
            }
        };

        let tid = match tracking.matched(&record.transcript_id) {
            Some(tid) => {
                trace!(transcript_id = %record.transcript_id, tid, "structural match");
                counts.matched_transcripts += 1;
                tid
            }
            None => {
                let tid = insert_structure(store, ctx.assembly_id, sequence_id, &record)?;
                counts.new_transcripts += 1;
                counts.intron_links += record.introns.len();
                tid
            }
        };

        store.insert_cross_reference(CrossReference {
            tid,
            sva_id: ctx.sva_id,
            transcript_id: record.transcript_id.clone(),
            gene,
            span: record.span,
            cds: record.cds,
            type_key: ctx.keys.transcript_type.clone(),
            type_value: record
                .transcript_type(ctx.keys)
                .unwrap_or_default()
                .to_string(),
            score: record.score,
        })?;
        counts.cross_references += 1;

        for (key, value) in &record.attributes {
            if key == TRANSCRIPT_ID_KEY || key == GENE_ID_KEY {
                continue;
            }
            let Some(&kind) = ctx.attribute_types.get(key) else {
                continue;
            };
            let row = AttributeValue::new(tid, ctx.sva_id, &record.transcript_id, key, kind, value);
            match store.upsert_attribute(row)? {
                AttributeWrite::Inserted => counts.attributes_inserted += 1,
                AttributeWrite::Concatenated => counts.attributes_concatenated += 1,
            }
        }
    }

    debug!(?counts, "annotation merged");
    Ok(counts)
}

fn insert_structure<S: Store + ?Sized>(
    store: &mut S,
    assembly_id: u64,
    sequence_id: u64,
    record: &TranscriptRecord,
) -> Result<u64, Error> {
    let tid = store.insert_transcript(NewTranscript {
        assembly_id,
        sequence_id,
        strand: record.strand,
        span: record.span,
    })?;
    for &junction in &record.introns {
        let intron = store.insert_intron(IntronKey {
            sequence_id,
            strand: record.strand,
            junction,
        })?;
        store.link_intron(tid, intron)?;
    }
    Ok(tid)
}
