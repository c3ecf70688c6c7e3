//! GFF3 renditions of stored annotation files.
//!
//! Every transcript block becomes a transcript line carrying `ID`, followed
//! by its child lines pointing back at it through `Parent`.

pub mod indexed;

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Error;
use crate::gtf::{self, entry::GtfFeature};

pub const VERSION_LINE: &str = "##gff-version 3";

/// Percent-encode the characters GFF3 reserves in attribute values.
#[must_use]
pub fn escape(value: &str) -> Cow<'_, str> {
    let reserved = |c: char| matches!(c, ';' | '=' | '&' | ',' | '%') || c.is_control();
    if !value.contains(reserved) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if reserved(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn score_column(score: Option<f64>) -> String {
    score.map_or_else(|| ".".to_string(), |s| s.to_string())
}

fn write_feature<W: Write>(
    out: &mut W,
    feature: &GtfFeature,
    phase: &str,
    attributes: &str,
) -> Result<(), Error> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{phase}\t{attributes}",
        feature.seqid,
        feature.source,
        feature.feature,
        feature.start,
        feature.end,
        score_column(feature.score),
        feature.strand
    )?;
    Ok(())
}

/// Write one transcript block. A block without a transcript line gets one
/// spanning its children.
pub fn write_block<W: Write>(out: &mut W, block: &[GtfFeature]) -> Result<(), Error> {
    let Some(first) = block.first() else {
        return Ok(());
    };
    let transcript_id = first.transcript_id().unwrap_or_default();
    let parent = match block.iter().find(|f| f.is_transcript()) {
        Some(line) => line.clone(),
        None => GtfFeature {
            feature: "transcript".to_string(),
            start: block.iter().map(|f| f.start).min().unwrap_or(first.start),
            end: block.iter().map(|f| f.end).max().unwrap_or(first.end),
            score: None,
            frame: ".".to_string(),
            ..first.clone()
        },
    };

    let mut attributes = format!("ID={}", escape(transcript_id));
    for (key, value) in gtf::block_attributes(block) {
        match key.as_str() {
            gtf::entry::TRANSCRIPT_ID_KEY => {}
            gtf::entry::GENE_ID_KEY => {
                attributes.push_str(&format!(";geneID={}", escape(&value)));
            }
            _ => attributes.push_str(&format!(";{}={}", escape(&key), escape(&value))),
        }
    }
    write_feature(out, &parent, ".", &attributes)?;

    let child_attributes = format!("Parent={}", escape(transcript_id));
    for feature in block.iter().filter(|f| !f.is_transcript()) {
        let phase = if feature.is_cds() { feature.frame.as_str() } else { "." };
        write_feature(out, feature, phase, &child_attributes)?;
    }
    Ok(())
}

/// Convert a GTF annotation (plain or gzip) to GFF3. Returns the number of
/// transcripts written.
pub fn write_gff3(input: &Path, output: &Path) -> Result<usize, Error> {
    let mut out = BufWriter::new(File::create(output)?);
    writeln!(out, "{VERSION_LINE}")?;
    let mut transcripts = 0;
    for block in gtf::read_blocks(input)? {
        write_block(&mut out, &block?)?;
        transcripts += 1;
    }
    out.flush()?;
    Ok(transcripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reserved_characters_encoded() {
        assert!(matches!(escape("ENST0001.4"), Cow::Borrowed(_)));
        assert_eq!(escape("a;b=c"), "a%3Bb%3Dc");
        assert_eq!(escape("50%,x&y"), "50%25%2Cx%26y");
        assert_eq!(escape("tab\there"), "tab%09here");
    }

    #[test]
    fn blocks_become_parent_and_children() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.gtf");
        fs::write(
            &input,
            "\
chr1\tHAVANA\ttranscript\t100\t500\t.\t+\t.\ttranscript_id \"t1\"; gene_id \"g1\"; tag \"basic; CCDS\";
chr1\tHAVANA\texon\t100\t200\t.\t+\t.\ttranscript_id \"t1\"; gene_id \"g1\";
chr1\tHAVANA\tCDS\t150\t200\t.\t+\t2\ttranscript_id \"t1\"; gene_id \"g1\";
chr2\tRefSeq\texon\t10\t20\t0.5\t-\t.\ttranscript_id \"t2\"; gene_id \"g2\";
chr2\tRefSeq\texon\t40\t60\t.\t-\t.\ttranscript_id \"t2\"; gene_id \"g2\";
",
        )
        .unwrap();
        let output = dir.path().join("a.gff3");

        assert_eq!(write_gff3(&input, &output).unwrap(), 2);
        let text = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], VERSION_LINE);
        assert_eq!(
            lines[1],
            "chr1\tHAVANA\ttranscript\t100\t500\t.\t+\t.\tID=t1;geneID=g1;tag=basic%3B CCDS"
        );
        assert_eq!(lines[2], "chr1\tHAVANA\texon\t100\t200\t.\t+\t.\tParent=t1");
        assert_eq!(lines[3], "chr1\tHAVANA\tCDS\t150\t200\t.\t+\t2\tParent=t1");
        assert_eq!(
            lines[4],
            "chr2\tRefSeq\ttranscript\t10\t60\t.\t-\t.\tID=t2;geneID=g2"
        );
        assert_eq!(lines[5], "chr2\tRefSeq\texon\t10\t20\t0.5\t-\t.\tParent=t2");
        assert_eq!(lines.len(), 7);
    }
}
