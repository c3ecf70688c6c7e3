//! Transcript construction: span, exon chain, introns and coding span from a block.

use crate::chain::{self, Interval};
use crate::error::Error;
use crate::gtf::block_attributes;
use crate::gtf::entry::{GENE_ID_KEY, GtfFeature};

use super::types::{SemanticKeys, TranscriptRecord};

impl TranscriptRecord {
    /// Build a record from the feature lines of one transcript block.
    ///
    /// Exon lines must be listed in ascending, non-overlapping order and lie
    /// inside the transcript span. A block without exon lines is a single-exon
    /// transcript covering its span.
    pub fn from_block(block: &[GtfFeature], keys: &SemanticKeys) -> Result<Self, Error> {
        let first = block
            .first()
            .ok_or_else(|| Error::MalformedRecord("empty transcript block".to_string()))?;
        let transcript_id = first.transcript_id().unwrap_or_default().to_string();
        let context = |msg: String| {
            Error::MalformedRecord(format!(
                "transcript {transcript_id} on {} (line {}): {msg}",
                first.seqid, first.line_number
            ))
        };

        let header = block.iter().find(|f| f.is_transcript());
        let exon_lines: Vec<&GtfFeature> = block.iter().filter(|f| f.is_exon()).collect();

        for feature in block {
            if feature.seqid != first.seqid || feature.strand != first.strand {
                return Err(context(format!(
                    "line {} disagrees on sequence or strand",
                    feature.line_number
                )));
            }
        }

        let mut exons: Vec<Interval> = exon_lines.iter().map(|f| (f.start, f.end)).collect();
        for pair in exons.windows(2) {
            if pair[1].0 <= pair[0].1 {
                return Err(context(format!(
                    "exons {}-{} and {}-{} are not ascending and disjoint",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }

        let span = match header {
            Some(h) => (h.start, h.end),
            None => match (exons.first(), exons.last()) {
                (Some(&(start, _)), Some(&(_, end))) => (start, end),
                _ => return Err(context("no transcript or exon line".to_string())),
            },
        };
        if let (Some(&(first_start, _)), Some(&(_, last_end))) = (exons.first(), exons.last()) {
            if first_start < span.0 || last_end > span.1 {
                return Err(context(format!(
                    "span {}-{} does not cover exons {first_start}-{last_end}",
                    span.0, span.1
                )));
            }
        }
        if exons.is_empty() {
            exons.push(span);
        }

        let cds = block
            .iter()
            .filter(|f| f.is_cds())
            .fold(None, |acc: Option<Interval>, f| match acc {
                Some((s, e)) => Some((s.min(f.start), e.max(f.end))),
                None => Some((f.start, f.end)),
            });
        if let Some((cds_start, cds_end)) = cds {
            if cds_start < span.0 || cds_end > span.1 {
                return Err(context(format!(
                    "CDS {cds_start}-{cds_end} lies outside span {}-{}",
                    span.0, span.1
                )));
            }
        }

        let attributes = block_attributes(block);
        for key in std::iter::once(GENE_ID_KEY).chain(keys.iter()) {
            if !attributes.contains_key(key) {
                return Err(context(format!("missing required attribute '{key}'")));
            }
        }
        let gene_id = attributes
            .get(GENE_ID_KEY)
            .cloned()
            .unwrap_or_default();

        let introns = chain::introns_from_exons(&exons);
        let line = header.unwrap_or(first);

        Ok(Self {
            line_number: line.line_number,
            seqid: line.seqid.clone(),
            source: line.source.clone(),
            strand: line.strand,
            span,
            cds,
            exons,
            introns,
            gene_id,
            transcript_id,
            score: header.and_then(|h| h.score),
            attributes,
        })
    }
}
