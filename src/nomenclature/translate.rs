//! Rewriting annotation and genome files into another nomenclature.
//!
//! Every translation checks the mapping against all names in the input before
//! writing anything, so output is either complete or not produced.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::compression;
use crate::error::Error;
use crate::fasta;
use crate::gtf;
use crate::gtf::parser::seqid_of;
use crate::transcript::TranscriptRecord;

use super::NameMapping;

/// Rewrite the sequence id of every feature line of an annotation file.
/// Comment lines are copied unchanged. Returns the number of feature lines.
pub fn translate_annotation(
    input: &Path,
    output: &Path,
    mapping: &NameMapping,
) -> Result<usize, Error> {
    let seqids = gtf::sequence_ids(input)?;
    mapping.check_total(seqids.iter().map(String::as_str))?;

    let reader = compression::open_text(input)?;
    let mut out = BufWriter::new(File::create(output)?);
    let mut features = 0;
    for line in reader.lines() {
        let line = line?;
        match seqid_of(&line).and_then(|id| Some((id, mapping.get(id)?))) {
            Some((seqid, name)) => {
                writeln!(out, "{name}{}", &line[seqid.len()..])?;
                features += 1;
            }
            None => writeln!(out, "{line}")?,
        }
    }
    out.flush()?;
    debug!(input = %input.display(), features, "annotation translated");
    Ok(features)
}

/// Rewrite the sequence id of parsed records.
pub fn translate_records(
    records: &[TranscriptRecord],
    mapping: &NameMapping,
) -> Result<Vec<TranscriptRecord>, Error> {
    mapping.check_total(records.iter().map(|r| r.seqid.as_str()))?;
    Ok(records
        .iter()
        .map(|r| TranscriptRecord {
            seqid: mapping.get(&r.seqid).unwrap_or_default().to_string(),
            ..r.clone()
        })
        .collect())
}

/// Rewrite the name of every FASTA header, keeping any description and
/// copying sequence lines byte for byte. Returns the number of records.
pub fn translate_sequence_file(
    input: &Path,
    output: &Path,
    mapping: &NameMapping,
) -> Result<usize, Error> {
    let mut names = Vec::new();
    for line in compression::open_text(input)?.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            names.push(fasta::header_name(header)?.to_string());
        }
    }
    mapping.check_total(names.iter().map(String::as_str))?;

    let mut reader = compression::open_text(input)?;
    let mut out = BufWriter::new(File::create(output)?);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        match line.strip_prefix('>') {
            Some(header) => {
                let name = fasta::header_name(header)?;
                let rest = &header[header.find(name).unwrap_or(0) + name.len()..];
                write!(out, ">{}{rest}", mapping.get(name).unwrap_or(name))?;
            }
            None => out.write_all(line.as_bytes())?,
        }
    }
    out.flush()?;
    Ok(names.len())
}

/// Load a two-column, tab-separated source-name to target-name table.
/// Blank lines and `#` comments are skipped; a source name may not map to two
/// different targets.
pub fn load_mapping_tsv(path: &Path) -> Result<Vec<(String, String)>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut columns = trimmed.split('\t').map(str::trim);
        let (Some(source), Some(target)) = (columns.next(), columns.next()) else {
            return Err(Error::Parse(format!(
                "expected two tab-separated columns (line {}: {line})",
                line_num + 1
            )));
        };
        if source.is_empty() || target.is_empty() {
            return Err(Error::Parse(format!(
                "empty name in mapping (line {}: {line})",
                line_num + 1
            )));
        }
        if !seen.insert(source.to_string()) {
            match pairs.iter().find(|(s, _)| s == source) {
                Some((_, existing)) if existing == target => continue,
                _ => {
                    return Err(Error::Validation(format!(
                        "'{source}' is mapped to more than one name (line {})",
                        line_num + 1
                    )));
                }
            }
        }
        pairs.push((source.to_string(), target.to_string()));
    }

    Ok(pairs)
}
