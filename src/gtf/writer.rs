//! Canonical transcript block serializer.

use std::io::Write;

use crate::chain::Interval;
use crate::error::Error;
use crate::strand::Strand;

/// Transcript id written for the placeholder record of an empty export.
pub const PLACEHOLDER_TRANSCRIPT_ID: &str = "nan";

/// One transcript rendered as a transcript line followed by exon lines.
#[derive(Debug, Clone)]
pub struct TranscriptBlock<'a> {
    pub seqid: &'a str,
    pub source: &'a str,
    pub strand: Strand,
    pub span: Interval,
    pub exons: &'a [Interval],
    pub transcript_id: &'a str,
    pub gene_id: Option<&'a str>,
}

impl TranscriptBlock<'_> {
    /// Write the block. A block without exons gets a single `(0,0)` exon line
    /// so the comparison tool still sees a complete record.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        let attributes = match self.gene_id {
            Some(gene_id) => format!(
                "transcript_id \"{}\"; gene_id \"{gene_id}\";",
                self.transcript_id
            ),
            None => format!("transcript_id \"{}\";", self.transcript_id),
        };

        self.write_line(out, "transcript", self.span, &attributes)?;
        if self.exons.is_empty() {
            self.write_line(out, "exon", (0, 0), &attributes)?;
        }
        for &exon in self.exons {
            self.write_line(out, "exon", exon, &attributes)?;
        }
        Ok(())
    }

    fn write_line<W: Write>(
        &self,
        out: &mut W,
        feature: &str,
        (start, end): Interval,
        attributes: &str,
    ) -> Result<(), Error> {
        writeln!(
            out,
            "{}\t{}\t{feature}\t{start}\t{end}\t.\t{}\t.\t{attributes}",
            self.seqid, self.source, self.strand
        )?;
        Ok(())
    }
}

/// Write the stand-in record used when there is nothing to export.
pub fn write_placeholder<W: Write>(out: &mut W) -> Result<(), Error> {
    TranscriptBlock {
        seqid: ".",
        source: ".",
        strand: Strand::Forward,
        span: (0, 0),
        exons: &[],
        transcript_id: PLACEHOLDER_TRANSCRIPT_ID,
        gene_id: None,
    }
    .write(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_layout() {
        let mut out = Vec::new();
        TranscriptBlock {
            seqid: "chr1",
            source: "store",
            strand: Strand::Reverse,
            span: (100, 500),
            exons: &[(100, 200), (300, 500)],
            transcript_id: "7",
            gene_id: Some("7"),
        }
        .write(&mut out)
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "chr1\tstore\ttranscript\t100\t500\t.\t-\t.\ttranscript_id \"7\"; gene_id \"7\";"
        );
        assert!(lines[1].starts_with("chr1\tstore\texon\t100\t200\t"));
        assert!(lines[2].starts_with("chr1\tstore\texon\t300\t500\t"));
    }

    #[test]
    fn placeholder_has_transcript_and_exon() {
        let mut out = Vec::new();
        write_placeholder(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\ttranscript\t0\t0\t"));
        assert!(lines[1].contains("\texon\t0\t0\t"));
        assert!(lines[1].ends_with("transcript_id \"nan\";"));
    }
}
