//! FASTA reading, `.fai` index building, and random-access region fetch.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::compression;
use crate::error::Error;

/// Reads FASTA (plain or gzip) and yields (name, sequence) pairs.
///
/// The name is the first whitespace-delimited token after `>`. Sequence bases
/// are uppercased.
pub fn read_fasta(path: &Path) -> Result<Vec<(String, Vec<u8>)>, Error> {
    parse_fasta(compression::open_text(path)?)
}

/// Reads FASTA from a buffered reader and yields (name, sequence) pairs.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let mut results: Vec<(String, Vec<u8>)> = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_sequence: Vec<u8> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            if let Some(name) = current_name.take() {
                results.push((name, std::mem::take(&mut current_sequence)));
            }
            current_name = Some(header_name(header)?.to_string());
        } else if current_name.is_some() {
            let start = current_sequence.len();
            current_sequence.extend_from_slice(line.trim().as_bytes());
            current_sequence[start..].make_ascii_uppercase();
        }
    }

    if let Some(name) = current_name {
        results.push((name, current_sequence));
    }

    Ok(results)
}

/// Sequence name of a header line body (the text after `>`).
pub fn header_name(header: &str) -> Result<&str, Error> {
    header
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::Parse(format!("empty FASTA header: >{header}")))
}

/// One `.fai` line: name, length, byte offset of the first base, bases per
/// line, bytes per line (bases plus line terminator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaiEntry {
    pub name: String,
    pub length: u64,
    pub offset: u64,
    pub line_bases: u64,
    pub line_bytes: u64,
}

/// Path of the companion index: `<fasta>.fai`.
#[must_use]
pub fn index_path(fasta: &Path) -> PathBuf {
    let mut name = fasta.as_os_str().to_owned();
    name.push(".fai");
    PathBuf::from(name)
}

/// Scan an uncompressed FASTA and compute its index entries, in file order.
///
/// Every sequence line of a record but the last must have the same width.
pub fn build_index(path: &Path) -> Result<Vec<FaiEntry>, Error> {
    if compression::is_gzip(path)? {
        return Err(Error::Validation(format!(
            "cannot index compressed FASTA: {}",
            path.display()
        )));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut entries: Vec<FaiEntry> = Vec::new();
    let mut current: Option<FaiEntry> = None;
    // Set once a record has a line shorter than its width; no further lines may follow.
    let mut short_line_seen = false;
    let mut position = 0u64;
    let mut line = String::new();
    let mut line_number = 0usize;

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)? as u64;
        if bytes_read == 0 {
            break;
        }
        line_number += 1;
        let line_start = position;
        position += bytes_read;

        if let Some(header) = line.strip_prefix('>') {
            entries.extend(current.take());
            current = Some(FaiEntry {
                name: header_name(header.trim_end())?.to_string(),
                length: 0,
                offset: position,
                line_bases: 0,
                line_bytes: 0,
            });
            short_line_seen = false;
            continue;
        }

        let Some(entry) = current.as_mut() else {
            if line.trim().is_empty() {
                continue;
            }
            return Err(Error::Parse(format!(
                "sequence data before first header (line {line_number})"
            )));
        };

        let bases = line.trim_end_matches(['\n', '\r']).len() as u64;
        if bases == 0 {
            short_line_seen = true;
            continue;
        }
        if short_line_seen {
            return Err(Error::Validation(format!(
                "inconsistent line width in record '{}' (line {line_number})",
                entry.name
            )));
        }
        if entry.line_bases == 0 {
            entry.offset = line_start;
            entry.line_bases = bases;
            entry.line_bytes = bytes_read;
        } else if bases > entry.line_bases
            || (line.ends_with('\n') && bytes_read - bases != entry.line_bytes - entry.line_bases)
        {
            return Err(Error::Validation(format!(
                "inconsistent line width in record '{}' (line {line_number})",
                entry.name
            )));
        } else if bases < entry.line_bases {
            short_line_seen = true;
        }
        entry.length += bases;
    }
    entries.extend(current);

    Ok(entries)
}

/// Write entries in samtools `.fai` layout.
pub fn write_index(path: &Path, entries: &[FaiEntry]) -> Result<(), Error> {
    let mut out = BufWriter::new(File::create(path)?);
    for e in entries {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            e.name, e.length, e.offset, e.line_bases, e.line_bytes
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Build and write `<fasta>.fai`; returns the indexed entries.
pub fn index_fasta(fasta: &Path) -> Result<Vec<FaiEntry>, Error> {
    let entries = build_index(fasta)?;
    write_index(&index_path(fasta), &entries)?;
    Ok(entries)
}

/// Read a `.fai` file.
pub fn read_index(path: &Path) -> Result<Vec<FaiEntry>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            return Err(Error::Parse(format!(
                "expected 5 index columns (line {}: {line})",
                line_num + 1
            )));
        }
        let number = |i: usize| -> Result<u64, Error> {
            fields[i].parse().map_err(|e| {
                Error::Parse(format!(
                    "invalid index field '{}': {e} (line {})",
                    fields[i],
                    line_num + 1
                ))
            })
        };
        entries.push(FaiEntry {
            name: fields[0].to_string(),
            length: number(1)?,
            offset: number(2)?,
            line_bases: number(3)?,
            line_bytes: number(4)?,
        });
    }
    Ok(entries)
}

/// A FASTA file with its `.fai` index, for random-access fetches.
#[derive(Debug)]
pub struct IndexedFasta {
    path: PathBuf,
    index: HashMap<String, FaiEntry>,
}

impl IndexedFasta {
    /// Open a FASTA file; both it and `<path>.fai` must exist.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let fai = index_path(path);
        for required in [path, fai.as_path()] {
            if !required.is_file() {
                return Err(Error::SequenceSourceUnavailable(format!(
                    "missing {}",
                    required.display()
                )));
            }
        }
        let index = read_index(&fai)
            .map_err(|e| Error::SequenceSourceUnavailable(format!("{}: {e}", fai.display())))?
            .into_iter()
            .map(|e| (e.name.clone(), e))
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            index,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn length(&self, name: &str) -> Option<u64> {
        self.index.get(name).map(|e| e.length)
    }

    /// Fetch bases `start..=end` (1-based inclusive) of `name`, uppercased.
    pub fn fetch(&self, name: &str, start: u64, end: u64) -> Result<Vec<u8>, Error> {
        let entry = self.index.get(name).ok_or_else(|| {
            Error::SequenceSourceUnavailable(format!(
                "sequence '{name}' not in {}",
                self.path.display()
            ))
        })?;
        if start == 0 || start > end || end > entry.length {
            return Err(Error::SequenceSourceUnavailable(format!(
                "region {name}:{start}-{end} outside sequence of length {}",
                entry.length
            )));
        }
        if entry.line_bases == 0 || entry.line_bytes < entry.line_bases {
            return Err(Error::SequenceSourceUnavailable(format!(
                "invalid index entry for '{name}': line_bases={}, line_bytes={}",
                entry.line_bases, entry.line_bytes
            )));
        }

        let zero_start = start - 1;
        let seq_len = end - zero_start;
        let line_start = zero_start / entry.line_bases;
        let column = zero_start % entry.line_bases;
        let file_offset = entry.offset + line_start * entry.line_bytes + column;
        let num_lines = (seq_len + column).div_ceil(entry.line_bases);
        let terminator = entry.line_bytes - entry.line_bases;
        let bytes_to_read = seq_len + num_lines * terminator;

        let mut file = File::open(&self.path)
            .map_err(|e| Error::SequenceSourceUnavailable(format!("{}: {e}", self.path.display())))?;
        file.seek(SeekFrom::Start(file_offset))?;
        let mut buffer = Vec::with_capacity(bytes_to_read as usize);
        file.take(bytes_to_read).read_to_end(&mut buffer)?;

        let sequence: Vec<u8> = buffer
            .into_iter()
            .filter(|&b| b != b'\n' && b != b'\r')
            .take(seq_len as usize)
            .map(|b| b.to_ascii_uppercase())
            .collect();
        if sequence.len() as u64 != seq_len {
            return Err(Error::SequenceSourceUnavailable(format!(
                "index for {} is inconsistent with its sequence file",
                self.path.display()
            )));
        }
        Ok(sequence)
    }
}
