//! Annotation (GTF) file reader and writer: feature lines grouped into transcript blocks.

pub mod entry;
pub mod parser;
pub mod writer;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufWriter, Lines, Write};
use std::path::Path;

use crate::compression;
use crate::error::Error;

use entry::{AttributeSummary, GENE_ID_KEY, GtfFeature, TRANSCRIPT_ID_KEY};
use parser::ParsedLine;

/// Iterator over transcript blocks: consecutive feature lines sharing a `transcript_id`.
///
/// A transcript feature line always opens a new block.
pub struct TranscriptBlocks<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
    pending: Option<GtfFeature>,
    done: bool,
}

impl<R: BufRead> TranscriptBlocks<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            pending: None,
            done: false,
        }
    }

    fn next_feature(&mut self) -> Result<Option<GtfFeature>, Error> {
        for line in self.lines.by_ref() {
            self.line_number += 1;
            let line = line?;
            let line_number = self.line_number;
            match parser::parse_line(&line, line_number)
                .map_err(|e| Error::Parse(format!("{e} (line {line_number}: {line})")))?
            {
                ParsedLine::Feature(feature) => {
                    if feature.transcript_id().is_none() {
                        return Err(Error::MalformedRecord(format!(
                            "feature has no {TRANSCRIPT_ID_KEY} (line {line_number}: {line})"
                        )));
                    }
                    return Ok(Some(*feature));
                }
                ParsedLine::Comment | ParsedLine::Blank => continue,
            }
        }
        Ok(None)
    }

    fn next_block(&mut self) -> Result<Option<Vec<GtfFeature>>, Error> {
        let mut block: Vec<GtfFeature> = match self.pending.take() {
            Some(feature) => vec![feature],
            None => match self.next_feature()? {
                Some(feature) => vec![feature],
                None => return Ok(None),
            },
        };

        while let Some(feature) = self.next_feature()? {
            let same_transcript = feature.transcript_id() == block[0].transcript_id();
            if same_transcript && !feature.is_transcript() {
                block.push(feature);
            } else {
                self.pending = Some(feature);
                break;
            }
        }

        Ok(Some(block))
    }
}

impl<R: BufRead> Iterator for TranscriptBlocks<R> {
    type Item = Result<Vec<GtfFeature>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Open an annotation file (plain or gzip) as transcript blocks.
pub fn read_blocks(path: &Path) -> Result<TranscriptBlocks<Box<dyn BufRead>>, Error> {
    Ok(TranscriptBlocks::new(compression::open_text(path)?))
}

/// Record-level attributes of a block: the transcript line's attributes, with
/// keys only present on child lines filled in from the first line carrying them.
#[must_use]
pub fn block_attributes(block: &[GtfFeature]) -> BTreeMap<String, String> {
    let mut attrs: BTreeMap<String, String> = block
        .iter()
        .find(|f| f.is_transcript())
        .map(|f| f.attributes.clone())
        .unwrap_or_default();
    for feature in block {
        for (key, value) in &feature.attributes {
            attrs.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    attrs
}

/// Distinct sequence ids referenced by an annotation file, in order of first use.
pub fn sequence_ids(path: &Path) -> Result<Vec<String>, Error> {
    let reader = compression::open_text(path)?;
    let mut seen: HashSet<String> = HashSet::new();
    let mut ordered = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(seqid) = parser::seqid_of(&line) {
            if !seen.contains(seqid) {
                seen.insert(seqid.to_string());
                ordered.push(seqid.to_string());
            }
        }
    }
    Ok(ordered)
}

/// Summarize record-level attribute keys. A key with more than `cap` distinct
/// values is reported as `Variable`. Identifier keys are not summarized.
pub fn attribute_summary(
    path: &Path,
    cap: usize,
) -> Result<BTreeMap<String, AttributeSummary>, Error> {
    let mut values: BTreeMap<String, Option<BTreeSet<String>>> = BTreeMap::new();

    for block in read_blocks(path)? {
        for (key, value) in block_attributes(&block?) {
            if key == TRANSCRIPT_ID_KEY || key == GENE_ID_KEY {
                continue;
            }
            let slot = values.entry(key).or_insert_with(|| Some(BTreeSet::new()));
            if let Some(set) = slot {
                set.insert(value);
                if set.len() > cap {
                    *slot = None;
                }
            }
        }
    }

    Ok(values
        .into_iter()
        .map(|(key, set)| {
            let summary = match set {
                Some(set) => AttributeSummary::Categorical(set),
                None => AttributeSummary::Variable,
            };
            (key, summary)
        })
        .collect())
}

/// Copy feature lines whose sequence id is in `keep`; comments and other
/// sequences are dropped. Returns the number of dropped feature lines.
pub fn filter_by_sequence(
    input: &Path,
    output: &Path,
    keep: &HashSet<String>,
) -> Result<usize, Error> {
    let reader = compression::open_text(input)?;
    let mut out = BufWriter::new(File::create(output)?);
    let mut dropped = 0;

    for line in reader.lines() {
        let line = line?;
        match parser::seqid_of(&line) {
            Some(seqid) if keep.contains(seqid) => writeln!(out, "{line}")?,
            Some(_) => dropped += 1,
            None => {}
        }
    }

    out.flush()?;
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
# gffread v0.12.7
chr1\tsrc\ttranscript\t100\t500\t.\t+\t.\ttranscript_id \"t1\"; gene_id \"g1\"; gene_name \"ABC\"; gene_type \"protein_coding\";
chr1\tsrc\texon\t100\t200\t.\t+\t.\ttranscript_id \"t1\"; gene_id \"g1\";
chr1\tsrc\texon\t300\t500\t.\t+\t.\ttranscript_id \"t1\"; gene_id \"g1\";
chr1\tsrc\tCDS\t150\t200\t.\t+\t0\ttranscript_id \"t1\"; gene_id \"g1\";
chr2\tsrc\ttranscript\t10\t90\t.\t-\t.\ttranscript_id \"t2\"; gene_id \"g2\"; gene_name \"XYZ\"; gene_type \"lncRNA\";
chr2\tsrc\texon\t10\t90\t.\t-\t.\ttranscript_id \"t2\"; gene_id \"g2\"; exon_number \"1\";
";

    fn write_sample(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("sample.gtf");
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn groups_blocks_by_transcript() {
        let blocks: Vec<Vec<GtfFeature>> = TranscriptBlocks::new(Cursor::new(SAMPLE))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 4);
        assert_eq!(blocks[1].len(), 2);
        assert_eq!(blocks[1][0].transcript_id(), Some("t2"));
    }

    #[test]
    fn transcript_line_opens_new_block_even_with_same_id() {
        let text = "\
c\ts\ttranscript\t1\t9\t.\t+\t.\ttranscript_id \"t\";
c\ts\texon\t1\t9\t.\t+\t.\ttranscript_id \"t\";
c\ts\ttranscript\t20\t29\t.\t+\t.\ttranscript_id \"t\";
";
        let blocks: Vec<_> = TranscriptBlocks::new(Cursor::new(text)).collect();
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn missing_transcript_id_is_malformed() {
        let text = "c\ts\texon\t1\t9\t.\t+\t.\tgene_id \"g\";\n";
        let first = TranscriptBlocks::new(Cursor::new(text)).next().unwrap();
        assert!(matches!(first, Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn parse_error_carries_line_context() {
        let text = "c\ts\texon\tone\t9\t.\t+\t.\ttranscript_id \"t\";\n";
        let err = TranscriptBlocks::new(Cursor::new(text))
            .next()
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn block_attributes_merge_child_keys() {
        let blocks: Vec<Vec<GtfFeature>> = TranscriptBlocks::new(Cursor::new(SAMPLE))
            .collect::<Result<_, _>>()
            .unwrap();
        let attrs = block_attributes(&blocks[1]);
        assert_eq!(attrs["gene_name"], "XYZ");
        assert_eq!(attrs["exon_number"], "1");
    }

    #[test]
    fn sequence_ids_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);
        assert_eq!(sequence_ids(&path).unwrap(), vec!["chr1", "chr2"]);
    }

    #[test]
    fn attribute_summary_caps_values() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);

        let summary = attribute_summary(&path, 5).unwrap();
        assert!(!summary.contains_key("transcript_id"));
        assert!(!summary.contains_key("gene_id"));
        match &summary["gene_type"] {
            AttributeSummary::Categorical(values) => {
                assert_eq!(values.len(), 2);
                assert!(values.contains("lncRNA"));
            }
            AttributeSummary::Variable => panic!("expected categorical"),
        }

        let capped = attribute_summary(&path, 1).unwrap();
        assert!(capped["gene_name"].is_variable());
        assert!(!capped["exon_number"].is_variable());
    }

    #[test]
    fn filter_drops_unknown_sequences_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);
        let out = dir.path().join("clean.gtf");
        let keep: HashSet<String> = ["chr1".to_string()].into_iter().collect();

        let dropped = filter_by_sequence(&path, &out, &keep).unwrap();
        assert_eq!(dropped, 2);
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(!text.contains('#'));
        assert!(!text.contains("chr2"));
    }
}
