use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::chain::build_chain;
use crate::error::Error;
use crate::gtf::writer::{TranscriptBlock, write_placeholder};
use crate::store::StoredTranscript;

/// Source column of exported store-state records.
pub const EXPORT_SOURCE: &str = "db";

/// Write stored transcripts in comparison layout, identified by internal id.
/// Single-exon transcripts are written as one exon spanning the transcript.
/// Nothing stored still yields a single placeholder record. Returns the
/// number of exported transcripts.
pub fn write_store_state(stored: &[StoredTranscript], path: &Path) -> Result<usize, Error> {
    let mut out = BufWriter::new(File::create(path)?);
    if stored.is_empty() {
        write_placeholder(&mut out)?;
    }
    for transcript in stored {
        let exons = build_chain(transcript.span, &transcript.introns)?;
        let id = transcript.tid.to_string();
        TranscriptBlock {
            seqid: &transcript.seqid,
            source: EXPORT_SOURCE,
            strand: transcript.strand,
            span: transcript.span,
            exons: &exons,
            transcript_id: &id,
            gene_id: Some(&id),
        }
        .write(&mut out)?;
    }
    out.flush()?;
    Ok(stored.len())
}
